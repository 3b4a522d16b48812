use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use super::error::ApiError;
use super::repo::RecordStore;
use super::validate::validate_batch;
use crate::sheet;

/// Parses a staged workbook, validates every row, then inserts the batch for `uploader`.
/// Returns the number of inserted records.
pub async fn import_workbook(
    store: &dyn RecordStore,
    uploader: &str,
    path: PathBuf,
) -> Result<u64, ApiError> {
    let rows = tokio::task::spawn_blocking(move || sheet::read_first_sheet(&path))
        .await
        .context("join sheet parser")?
        .context("parse workbook")?;

    if rows.is_empty() {
        return Err(ApiError::EmptyFile);
    }

    let records = validate_batch(&rows, store).await?;
    let inserted = store
        .insert_batch(uploader, &records)
        .await
        .context("insert batch")?;

    info!(uploader, inserted, "batch imported");
    Ok(inserted)
}
