use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::error::ApiError;

pub const UPLOADER_HEADER: &str = "upload_users_id";

/// Reads the uploader identifier from the `upload_users_id` header.
pub struct UploaderId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UploaderId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(UPLOADER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UploaderId(v.to_string()))
            .ok_or(ApiError::MissingUploaderHeader)
    }
}
