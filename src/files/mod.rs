mod dto;
mod error;
mod extractors;
pub mod handlers;
pub mod repo;
mod repo_types;
mod services;
mod staging;
mod validate;

use crate::state::AppState;
use axum::Router;

pub use dto::MessageResponse;
pub use error::ApiError;
pub use extractors::UPLOADER_HEADER;
pub use repo::{PgRecordStore, RecordStore};
pub use repo_types::{NewRecord, UploadRecord};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::upload_routes())
        .merge(handlers::read_routes())
}
