use std::collections::HashSet;

use tracing::warn;

use super::error::ApiError;
use super::repo::RecordStore;
use super::repo_types::NewRecord;
use crate::sheet::SheetRow;

/// Checks every row of a batch before anything is written.
///
/// Rows are checked in sheet order; for each row the email must be present, unique
/// within the batch and not yet stored, then the contact number must be present.
/// The first failing check rejects the whole batch.
pub async fn validate_batch(
    rows: &[SheetRow],
    store: &dyn RecordStore,
) -> Result<Vec<NewRecord>, ApiError> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut valid = Vec::with_capacity(rows.len());

    for row in rows {
        let line = row.line;
        let Some(email) = row.get("email") else {
            warn!(line, "row without email");
            return Err(ApiError::MissingEmail { line });
        };
        if !seen.insert(email) {
            warn!(line, email, "email repeated within batch");
            return Err(ApiError::RepeatedEmail {
                email: email.to_string(),
                line,
            });
        }
        if store.email_exists(email).await? {
            warn!(line, email, "email already stored");
            return Err(ApiError::DuplicateEmail {
                email: email.to_string(),
                line,
            });
        }
        let Some(contact_no) = row.get("contact_no") else {
            warn!(line, "row without contact no");
            return Err(ApiError::MissingContact { line });
        };

        valid.push(NewRecord {
            name: row.get("name").map(str::to_string),
            email: email.to_string(),
            contact_no: contact_no.to_string(),
            gender: row.get("gender").map(str::to_string),
            address: row.get("address").map(str::to_string),
        });
    }

    Ok(valid)
}
