use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Directory where uploaded workbooks are staged while a request is processed.
    pub upload_dir: PathBuf,
    /// `APP_HOST:APP_PORT`, defaulting to `0.0.0.0:8080`.
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into());
        let bind_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("invalid APP_HOST/APP_PORT: {host}:{port}"))?;
        Ok(Self {
            database_url,
            upload_dir,
            bind_addr,
        })
    }
}

/// Settings for the table view client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Locally stored uploader identifier; `None` means nobody is logged in.
    pub upload_users_id: Option<String>,
    pub export_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            upload_users_id: std::env::var("UPLOAD_USERS_ID")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            export_dir: std::env::var("EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}
