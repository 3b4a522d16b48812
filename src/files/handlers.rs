use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{ExportQuery, MessageResponse};
use super::error::ApiError;
use super::extractors::UploaderId;
use super::repo_types::UploadRecord;
use super::services::import_workbook;
use super::staging::StagedUpload;
use crate::export;
use crate::state::AppState;

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/files/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/files/data", get(list_data))
        .route("/files/export/xlsx", get(export_xlsx))
        .route("/files/export/pdf", get(export_pdf))
}

struct UploadForm {
    file_name: Option<String>,
    body: Vec<u8>,
}

/// POST /files/upload (multipart)
/// Fields: `file` (workbook), `upload_users_id`.
#[instrument(skip(state, mp))]
pub async fn upload_file(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut mp = mp.map_err(|e| ApiError::InvalidForm(e.body_text()))?;
    let mut file: Option<UploadForm> = None;
    let mut uploader: Option<String> = None;
    while let Some(field) = mp.next_field().await.map_err(invalid_form)? {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(|s| s.to_string());
                let body = field.bytes().await.map_err(invalid_form)?;
                let blank = file_name.as_deref().map_or(true, str::is_empty) && body.is_empty();
                if !blank {
                    file = Some(UploadForm {
                        file_name,
                        body: body.to_vec(),
                    });
                }
            }
            Some("upload_users_id") => {
                let text = field.text().await.map_err(invalid_form)?;
                uploader = Some(text.trim().to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    let file = file.ok_or(ApiError::NoFile)?;
    let uploader = uploader.ok_or(ApiError::MissingUploader)?;
    info!(%uploader, bytes = file.body.len(), "received upload");

    let staged = StagedUpload::stage(
        &state.config.upload_dir,
        file.file_name.as_deref(),
        &file.body,
    )
    .map_err(anyhow::Error::from)?;

    let result = import_workbook(
        state.records.as_ref(),
        &uploader,
        staged.path().to_path_buf(),
    )
    .await;
    staged.discard();
    result?;

    Ok(Json(MessageResponse {
        message: "File data successfully uploaded".into(),
    }))
}

fn invalid_form(e: MultipartError) -> ApiError {
    ApiError::InvalidForm(e.body_text())
}

/// GET /files/data with header `upload_users_id`
#[instrument(skip(state))]
pub async fn list_data(
    State(state): State<AppState>,
    UploaderId(uploader): UploaderId,
) -> Result<Json<Vec<UploadRecord>>, ApiError> {
    let records = state.records.list_by_uploader(&uploader).await?;
    Ok(Json(records))
}

#[instrument(skip(state))]
pub async fn export_xlsx(
    State(state): State<AppState>,
    UploaderId(uploader): UploaderId,
    Query(q): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = filtered(&state, &uploader, &q.q).await?;
    let body = export::records_to_xlsx(&records).map_err(anyhow::Error::from)?;
    Ok(attachment(export::XLSX_CONTENT_TYPE, export::XLSX_FILE_NAME, body))
}

#[instrument(skip(state))]
pub async fn export_pdf(
    State(state): State<AppState>,
    UploaderId(uploader): UploaderId,
    Query(q): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = filtered(&state, &uploader, &q.q).await?;
    let body = export::records_to_pdf(&records).map_err(anyhow::Error::from)?;
    Ok(attachment(export::PDF_CONTENT_TYPE, export::PDF_FILE_NAME, body))
}

async fn filtered(
    state: &AppState,
    uploader: &str,
    query: &str,
) -> Result<Vec<UploadRecord>, ApiError> {
    let records: Vec<UploadRecord> = state
        .records
        .list_by_uploader(uploader)
        .await?
        .into_iter()
        .filter(|r| r.matches(query))
        .collect();
    if records.is_empty() {
        return Err(ApiError::NoData);
    }
    Ok(records)
}

fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use rust_xlsxwriter::Workbook;
    use tower::ServiceExt;

    use crate::app::build_app;
    use crate::config::AppConfig;
    use crate::files::repo::memory::MemoryRecordStore;
    use crate::files::repo_types::UploadRecord;
    use crate::state::AppState;

    const BOUNDARY: &str = "contactsheet-test-boundary";

    struct Harness {
        store: Arc<MemoryRecordStore>,
        upload_dir: tempfile::TempDir,
        app: axum::Router,
    }

    fn harness(store: MemoryRecordStore) -> Harness {
        let upload_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store);
        let config = Arc::new(AppConfig {
            database_url: "postgres://unused".into(),
            upload_dir: upload_dir.path().to_path_buf(),
            bind_addr: ([127, 0, 0, 1], 0).into(),
        });
        let app = build_app(AppState::from_parts(config, store.clone()));
        Harness {
            store,
            upload_dir,
            app,
        }
    }

    fn stored(id: i64, email: &str, uploader: &str) -> UploadRecord {
        UploadRecord {
            id,
            name: Some(format!("Name {id}")),
            email: email.into(),
            contact_no: format!("{id}00"),
            gender: None,
            address: Some("Ring Road".into()),
            upload_users_id: uploader.into(),
        }
    }

    fn workbook(rows: &[[&str; 3]]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        for (c, h) in ["name", "email", "contact_no"].iter().enumerate() {
            ws.write_string(0, c as u16, *h).unwrap();
        }
        for (r, cells) in rows.iter().enumerate() {
            for (c, v) in cells.iter().enumerate() {
                if !v.is_empty() {
                    ws.write_string(r as u32 + 1, c as u16, *v).unwrap();
                }
            }
        }
        wb.save_to_buffer().unwrap()
    }

    fn multipart(file: Option<(&str, &[u8])>, uploader: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(id) = uploader {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"upload_users_id\"\r\n\r\n{id}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn message(body: &[u8]) -> String {
        let v: serde_json::Value = serde_json::from_slice(body).unwrap();
        v["message"].as_str().unwrap().to_string()
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let h = harness(MemoryRecordStore::default());
        let (status, body) = send(&h.app, multipart(None, Some("u-1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "No file uploaded");
    }

    #[tokio::test]
    async fn non_multipart_upload_is_a_json_bad_request() {
        let h = harness(MemoryRecordStore::default());
        let req = Request::builder()
            .method("POST")
            .uri("/api/files/upload")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"upload_users_id":"u-1"}"#))
            .unwrap();
        let (status, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!message(&body).is_empty());
        assert!(h.store.all().is_empty());
    }

    #[tokio::test]
    async fn upload_without_uploader_is_rejected() {
        let h = harness(MemoryRecordStore::default());
        let book = workbook(&[["Ann", "a@x.com", "1"]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "upload_users_id is required");
        assert!(h.store.all().is_empty());
    }

    #[tokio::test]
    async fn empty_sheet_is_rejected_and_cleaned_up() {
        let h = harness(MemoryRecordStore::default());
        let book = workbook(&[]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "The file is empty");
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn valid_batch_is_stored_for_uploader() {
        let h = harness(MemoryRecordStore::with_records(vec![stored(1, "old@x.com", "u-0")]));
        let book = workbook(&[["Ann", "a@x.com", "1"], ["Bo", "b@x.com", "2"], ["", "c@x.com", "3"]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&body), "File data successfully uploaded");

        let all = h.store.all();
        assert_eq!(all.len(), 4);
        let mine: Vec<_> = all.iter().filter(|r| r.upload_users_id == "u-1").collect();
        assert_eq!(mine.len(), 3);
        assert_eq!(mine[2].name, None);
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn csv_upload_is_stored() {
        let h = harness(MemoryRecordStore::default());
        let csv = b"name,email,contact_no\nAnn,a@x.com,1\n";
        let (status, body) = send(
            &h.app,
            multipart(Some(("contacts.csv", &csv[..])), Some("u-1")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(message(&body), "File data successfully uploaded");

        let all = h.store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email, "a@x.com");
        assert_eq!(all[0].contact_no, "1");
        assert_eq!(all[0].upload_users_id, "u-1");
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn missing_email_persists_nothing() {
        let h = harness(MemoryRecordStore::default());
        let book = workbook(&[["Ann", "a@x.com", "1"], ["Bo", "", "2"]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "Please enter email for all rows.");
        assert!(h.store.all().is_empty());
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn stored_email_persists_nothing_and_is_named() {
        let h = harness(MemoryRecordStore::with_records(vec![stored(1, "b@x.com", "u-0")]));
        let book = workbook(&[["Ann", "a@x.com", "1"], ["Bo", "b@x.com", "2"]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            message(&body),
            "The email b@x.com already exists in the database."
        );
        assert_eq!(h.store.all().len(), 1);
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn repeated_email_in_file_persists_nothing() {
        let h = harness(MemoryRecordStore::default());
        let book = workbook(&[["Ann", "a@x.com", "1"], ["Ann", "a@x.com", "2"]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message(&body).contains("a@x.com"));
        assert!(h.store.all().is_empty());
    }

    #[tokio::test]
    async fn missing_contact_persists_nothing() {
        let h = harness(MemoryRecordStore::default());
        let book = workbook(&[["Ann", "a@x.com", ""]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "Please enter your contact no for all rows.");
        assert!(h.store.all().is_empty());
    }

    #[tokio::test]
    async fn unreadable_file_is_server_error_and_cleaned_up() {
        let h = harness(MemoryRecordStore::default());
        let (status, body) = send(
            &h.app,
            multipart(Some(("c.xlsx", &b"not a workbook"[..])), Some("u-1")),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message(&body), "server error");
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    #[tokio::test]
    async fn storage_failure_is_server_error() {
        let h = harness(MemoryRecordStore::failing_inserts());
        let book = workbook(&[["Ann", "a@x.com", "1"]]);
        let (status, body) = send(&h.app, multipart(Some(("c.xlsx", &book[..])), Some("u-1"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message(&body), "server error");
        assert_eq!(staged_files(h.upload_dir.path()), 0);
    }

    fn get(uri: &str, uploader: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(id) = uploader {
            req = req.header("upload_users_id", id);
        }
        req.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn data_requires_uploader_header() {
        let h = harness(MemoryRecordStore::default());
        let (status, body) = send(&h.app, get("/api/files/data", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "upload_users_id header is required");
    }

    #[tokio::test]
    async fn data_returns_only_uploaders_records() {
        let h = harness(MemoryRecordStore::with_records(vec![
            stored(1, "a@x.com", "u-1"),
            stored(2, "b@x.com", "u-2"),
            stored(3, "c@x.com", "u-1"),
        ]));
        let (status, body) = send(&h.app, get("/api/files/data", Some("u-1"))).await;
        assert_eq!(status, StatusCode::OK);
        let records: Vec<UploadRecord> = serde_json::from_slice(&body).unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn export_xlsx_is_an_attachment() {
        let h = harness(MemoryRecordStore::with_records(vec![stored(1, "a@x.com", "u-1")]));
        let res = h
            .app
            .clone()
            .oneshot(get("/api/files/export/xlsx", Some("u-1")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()["content-disposition"],
            "attachment; filename=\"UserData.xlsx\""
        );
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn export_pdf_filters_by_query() {
        let h = harness(MemoryRecordStore::with_records(vec![
            stored(1, "a@x.com", "u-1"),
            stored(2, "b@x.com", "u-1"),
        ]));
        let (status, body) = send(&h.app, get("/api/files/export/pdf?q=B%40X", Some("u-1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with(b"%PDF"));

        let (status, body) = send(&h.app, get("/api/files/export/pdf?q=nobody", Some("u-1"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message(&body), "Data not available");
    }
}
