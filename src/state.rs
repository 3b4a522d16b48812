use crate::config::AppConfig;
use crate::files::{PgRecordStore, RecordStore};
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        std::fs::create_dir_all(&config.upload_dir).with_context(|| {
            format!("create upload dir {}", config.upload_dir.display())
        })?;

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        // Run migrations if present
        if let Err(e) = sqlx::migrate!("./migrations").run(&db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let records = Arc::new(PgRecordStore::new(db)) as Arc<dyn RecordStore>;
        Ok(Self::from_parts(config, records))
    }

    pub fn from_parts(config: Arc<AppConfig>, records: Arc<dyn RecordStore>) -> Self {
        Self { config, records }
    }
}
