use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored contact row. Field order is also the column order of spreadsheet exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UploadRecord {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub contact_no: String,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub upload_users_id: String,
}

impl UploadRecord {
    /// Case-insensitive substring match over name, email, contact no, gender and address.
    /// Missing fields never match.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [
            self.name.as_deref(),
            Some(self.email.as_str()),
            Some(self.contact_no.as_str()),
            self.gender.as_deref(),
            self.address.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// A row that passed validation and is ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: Option<String>,
    pub email: String,
    pub contact_no: String,
    pub gender: Option<String>,
    pub address: Option<String>,
}
