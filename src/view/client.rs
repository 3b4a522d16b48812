use anyhow::Context;
use axum::async_trait;

use crate::files::{MessageResponse, UploadRecord};

/// Source of the records shown by the table view.
#[async_trait]
pub trait RecordsClient: Send + Sync {
    async fn fetch_records(&self, upload_users_id: &str) -> anyhow::Result<Vec<UploadRecord>>;
}

/// Talks to `GET /api/files/data`.
#[derive(Clone)]
pub struct HttpRecordsClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRecordsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RecordsClient for HttpRecordsClient {
    async fn fetch_records(&self, upload_users_id: &str) -> anyhow::Result<Vec<UploadRecord>> {
        let url = format!("{}/api/files/data", self.base_url);
        let res = self
            .http
            .get(&url)
            .header("upload_users_id", upload_users_id)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        if !res.status().is_success() {
            let status = res.status();
            let message = res
                .json::<MessageResponse>()
                .await
                .map(|m| m.message)
                .unwrap_or_else(|_| "An error occurred".into());
            anyhow::bail!("{message} ({status})");
        }

        res.json::<Vec<UploadRecord>>()
            .await
            .context("decode records")
    }
}
