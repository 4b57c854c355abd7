// src/services/tracker.rs

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::{
    models::progress::{
        Achievement, ConsumptionEvent, ContentKind, HistoryEntry, ProgressRecord, ProgressStats,
        ProgressSummary,
    },
    store::{self, DocumentStore, StoreError},
};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// Rejected input. Raised before the store is touched.
    #[error("{0}")]
    Validation(String),

    #[error("No progress found for user {0}")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-user reading progress: consumption events, streaks and projections.
///
/// Every mutation goes through [`store::apply`], so concurrent events for the
/// same user never overwrite each other.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn DocumentStore>,
    /// Timezone in which calendar days are counted for streaks.
    offset: FixedOffset,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn DocumentStore>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    /// Returns the user's record, creating and persisting an empty one if needed.
    pub async fn ensure_record(&self, user_id: i64, now: DateTime<Utc>) -> Result<ProgressRecord, TrackerError> {
        if let Some(existing) = self.store.get(user_id).await? {
            return Ok(existing.value);
        }

        let record = ProgressRecord::new(user_id, now);
        if self.store.put_if(user_id, None, &record).await?.is_some() {
            tracing::info!(user_id, "Created progress record");
            return Ok(record);
        }

        // Lost the creation race; the winner's record is authoritative.
        self.store
            .get(user_id)
            .await?
            .map(|stored| stored.value)
            .ok_or(TrackerError::NotFound(user_id))
    }

    /// Marks one piece of content as consumed and returns the updated summary.
    pub async fn record_consumption(
        &self,
        user_id: i64,
        kind: ContentKind,
        content_id: &str,
        display_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressSummary, TrackerError> {
        // Stored as given; escaping is up to whoever renders it.
        let content_id = content_id.trim();
        let display_reference = display_reference.trim();

        if content_id.is_empty() || display_reference.is_empty() {
            return Err(TrackerError::Validation(format!(
                "{} ID and reference are required",
                capitalize(kind.as_str())
            )));
        }

        let event = ConsumptionEvent {
            kind,
            content_id: content_id.to_string(),
            display_reference: display_reference.to_string(),
            at: now,
        };
        let offset = self.offset;

        let record = store::apply(self.store.as_ref(), user_id, |current| {
            let record = current.unwrap_or_else(|| ProgressRecord::new(user_id, now));
            Ok::<_, TrackerError>(record.apply(&event, offset))
        })
        .await?;

        tracing::debug!(
            user_id,
            kind = %kind,
            content_id = %event.content_id,
            streak = record.streak.current_streak,
            "Recorded consumption"
        );

        Ok(record.summary())
    }

    /// Summary of an existing record.
    pub async fn get_summary(&self, user_id: i64) -> Result<ProgressSummary, TrackerError> {
        self.store
            .get(user_id)
            .await?
            .map(|stored| stored.value.summary())
            .ok_or(TrackerError::NotFound(user_id))
    }

    /// Summary, creating an empty record first when the user has none.
    pub async fn ensure_summary(&self, user_id: i64, now: DateTime<Utc>) -> Result<ProgressSummary, TrackerError> {
        Ok(self.ensure_record(user_id, now).await?.summary())
    }

    /// Totals and streak. Users without a record get zeros; nothing is created.
    pub async fn get_stats(&self, user_id: i64) -> Result<ProgressStats, TrackerError> {
        Ok(self
            .store
            .get(user_id)
            .await?
            .map(|stored| stored.value.stats())
            .unwrap_or_else(ProgressStats::empty))
    }

    pub async fn get_history(
        &self,
        user_id: i64,
        kind: Option<ContentKind>,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryEntry>, TrackerError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        Ok(self
            .store
            .get(user_id)
            .await?
            .map(|stored| stored.value.history(kind, limit))
            .unwrap_or_default())
    }

    pub async fn reset_progress(&self, user_id: i64, now: DateTime<Utc>) -> Result<ProgressSummary, TrackerError> {
        let record = store::apply(self.store.as_ref(), user_id, |current| {
            current
                .map(|record| record.reset(now))
                .ok_or(TrackerError::NotFound(user_id))
        })
        .await?;

        tracing::info!(user_id, "Progress reset");
        Ok(record.summary())
    }

    /// Appends an achievement. Awarding rules live outside the tracker.
    pub async fn award_achievement(
        &self,
        user_id: i64,
        name: &str,
        description: &str,
        icon: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressSummary, TrackerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Validation("Achievement name is required".to_string()));
        }

        let achievement = Achievement {
            name: name.to_string(),
            description: description.trim().to_string(),
            earned_at: now,
            icon: icon.trim().to_string(),
        };

        let record = store::apply(self.store.as_ref(), user_id, |current| {
            let record = current.unwrap_or_else(|| ProgressRecord::new(user_id, now));
            Ok::<_, TrackerError>(record.award(achievement.clone()))
        })
        .await?;

        tracing::info!(user_id, achievement = %achievement.name, "Achievement awarded");
        Ok(record.summary())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
