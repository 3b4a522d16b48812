use anyhow::Context;
use axum::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewRecord, UploadRecord};

/// Persistence seam for uploaded contact rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool>;
    /// Inserts the whole batch or nothing.
    async fn insert_batch(&self, upload_users_id: &str, rows: &[NewRecord]) -> anyhow::Result<u64>;
    async fn list_by_uploader(&self, upload_users_id: &str) -> anyhow::Result<Vec<UploadRecord>>;
}

#[derive(Clone)]
pub struct PgRecordStore {
    db: PgPool,
}

impl PgRecordStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn email_exists(&self, email: &str) -> anyhow::Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
              FROM upload_records
             WHERE email = $1
             LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("lookup record by email")?;
        Ok(found.is_some())
    }

    async fn insert_batch(&self, upload_users_id: &str, rows: &[NewRecord]) -> anyhow::Result<u64> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut inserted = 0;
        for row in rows {
            let res = sqlx::query(
                r#"
                INSERT INTO upload_records
                    (name, email, contact_no, gender, address, upload_users_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.name.as_deref())
            .bind(&row.email)
            .bind(&row.contact_no)
            .bind(row.gender.as_deref())
            .bind(row.address.as_deref())
            .bind(upload_users_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("insert record {}", row.email))?;
            inserted += res.rows_affected();
        }
        tx.commit().await.context("commit tx")?;
        Ok(inserted)
    }

    async fn list_by_uploader(&self, upload_users_id: &str) -> anyhow::Result<Vec<UploadRecord>> {
        let rows = sqlx::query_as::<_, UploadRecord>(
            r#"
            SELECT id, name, email, contact_no, gender, address, upload_users_id
              FROM upload_records
             WHERE upload_users_id = $1
             ORDER BY id ASC
            "#,
        )
        .bind(upload_users_id)
        .fetch_all(&self.db)
        .await
        .context("list records by uploader")?;
        Ok(rows)
    }
}
