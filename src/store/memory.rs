// src/store/memory.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, StoreResult, Versioned};
use crate::models::progress::ProgressRecord;

/// Process-local store. Used when no database is configured, and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<i64, Versioned<ProgressRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, user_id: i64) -> StoreResult<Option<Versioned<ProgressRecord>>> {
        Ok(self.documents.read().await.get(&user_id).cloned())
    }

    async fn put_if(
        &self,
        user_id: i64,
        expected: Option<i64>,
        record: &ProgressRecord,
    ) -> StoreResult<Option<i64>> {
        let mut documents = self.documents.write().await;

        let current = documents.get(&user_id).map(|d| d.version);
        if current != expected {
            return Ok(None);
        }

        let version = current.unwrap_or(0) + 1;
        documents.insert(
            user_id,
            Versioned {
                version,
                value: record.clone(),
            },
        );

        Ok(Some(version))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_put_if_checks_version() {
        let store = MemoryStore::new();
        let record = ProgressRecord::new(1, Utc::now());

        assert_eq!(store.put_if(1, None, &record).await.unwrap(), Some(1));
        // Already exists: an insert must not overwrite it.
        assert_eq!(store.put_if(1, None, &record).await.unwrap(), None);
        // Stale version.
        assert_eq!(store.put_if(1, Some(0), &record).await.unwrap(), None);
        assert_eq!(store.put_if(1, Some(1), &record).await.unwrap(), Some(2));

        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.value, record);
    }

    #[tokio::test]
    async fn test_records_are_per_user() {
        let store = MemoryStore::new();
        store.put_if(1, None, &ProgressRecord::new(1, Utc::now())).await.unwrap();

        assert!(store.get(2).await.unwrap().is_none());
        assert_eq!(store.put_if(2, Some(1), &ProgressRecord::new(2, Utc::now())).await.unwrap(), None);
    }
}
