// src/store/mod.rs

//! Document store collaborator for progress records.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::progress::ProgressRecord;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Upper bound on read-modify-write attempts before giving up on a contended record.
pub const MAX_APPLY_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The record kept changing underneath us.
    #[error("Too many concurrent updates for user {user_id}")]
    Contention { user_id: i64 },
}

/// A stored value together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: i64,
    pub value: T,
}

/// Durable keyed storage for one progress record per user.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads the record for `user_id`, if any.
    async fn get(&self, user_id: i64) -> StoreResult<Option<Versioned<ProgressRecord>>>;

    /// Compare-and-swap write.
    ///
    /// Stores `record` only if the current version equals `expected`
    /// (`None` meaning "no record yet"). Returns the new version, or `None`
    /// when another writer got there first.
    async fn put_if(
        &self,
        user_id: i64,
        expected: Option<i64>,
        record: &ProgressRecord,
    ) -> StoreResult<Option<i64>>;
}

/// Applies `transform` to the current record atomically.
///
/// Reads the record, computes the new value and writes it back with a
/// version check. Only version conflicts are retried; store failures and
/// errors returned by `transform` propagate immediately.
pub async fn apply<F, E>(store: &dyn DocumentStore, user_id: i64, mut transform: F) -> Result<ProgressRecord, E>
where
    F: FnMut(Option<ProgressRecord>) -> Result<ProgressRecord, E> + Send,
    E: From<StoreError>,
{
    for attempt in 1..=MAX_APPLY_ATTEMPTS {
        let (expected, current) = match store.get(user_id).await? {
            Some(stored) => (Some(stored.version), Some(stored.value)),
            None => (None, None),
        };

        let next = transform(current)?;

        if store.put_if(user_id, expected, &next).await?.is_some() {
            return Ok(next);
        }

        tracing::debug!(user_id, attempt, "Progress record changed concurrently, retrying");
    }

    tracing::warn!(user_id, "Giving up on contended progress record");
    Err(StoreError::Contention { user_id }.into())
}
