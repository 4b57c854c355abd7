// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, types::Json};

use super::{DocumentStore, StoreResult, Versioned};
use crate::models::progress::ProgressRecord;

/// Stores each progress record as a JSONB document in `progress_records`,
/// guarded by a version column for compare-and-swap updates.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, user_id: i64) -> StoreResult<Option<Versioned<ProgressRecord>>> {
        let row: Option<(i64, Json<ProgressRecord>)> =
            sqlx::query_as("SELECT version, document FROM progress_records WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to load progress record: {:?}", e);
                    e
                })?;

        Ok(row.map(|(version, Json(value))| Versioned { version, value }))
    }

    async fn put_if(
        &self,
        user_id: i64,
        expected: Option<i64>,
        record: &ProgressRecord,
    ) -> StoreResult<Option<i64>> {
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO progress_records (user_id, version, document)
                    VALUES ($1, 1, $2)
                    ON CONFLICT (user_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(Json(record))
                .execute(&self.pool)
                .await
            }
            Some(version) => {
                sqlx::query(
                    r#"
                    UPDATE progress_records
                    SET version = version + 1, document = $3, updated_at = CURRENT_TIMESTAMP
                    WHERE user_id = $1 AND version = $2
                    "#,
                )
                .bind(user_id)
                .bind(version)
                .bind(Json(record))
                .execute(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            tracing::error!("Failed to save progress record: {:?}", e);
            e
        })?;

        if result.rows_affected() == 1 {
            Ok(Some(expected.unwrap_or(0) + 1))
        } else {
            Ok(None)
        }
    }
}
