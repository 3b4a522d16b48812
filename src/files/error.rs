use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::dto::MessageResponse;

/// Failures of the file endpoints. Everything except `Internal` is the client's fault
/// and rejects the request as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body is not a readable `multipart/form-data` form.
    #[error("{0}")]
    InvalidForm(String),
    #[error("No file uploaded")]
    NoFile,
    #[error("upload_users_id is required")]
    MissingUploader,
    #[error("upload_users_id header is required")]
    MissingUploaderHeader,
    #[error("The file is empty")]
    EmptyFile,
    #[error("Please enter email for all rows.")]
    MissingEmail { line: usize },
    #[error("The email {email} appears more than once in the file.")]
    RepeatedEmail { email: String, line: usize },
    #[error("The email {email} already exists in the database.")]
    DuplicateEmail { email: String, line: usize },
    #[error("Please enter your contact no for all rows.")]
    MissingContact { line: usize },
    #[error("Data not available")]
    NoData,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoData => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = ?e, "request failed");
                "server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(MessageResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_request() {
        assert_eq!(ApiError::NoFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidForm("bad boundary".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::EmptyFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::MissingContact { line: 3 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NoData.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_message_names_email() {
        let err = ApiError::DuplicateEmail {
            email: "a@x.com".into(),
            line: 2,
        };
        assert_eq!(
            err.to_string(),
            "The email a@x.com already exists in the database."
        );
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err = ApiError::from(anyhow::anyhow!("pool timed out"));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
