// src/models/progress.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Entries per collection shown in a summary's recent activity.
pub const RECENT_ACTIVITY_LEN: usize = 5;

/// Category of devotional material being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Verse,
    Hadith,
    Lesson,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Verse, ContentKind::Hadith, ContentKind::Lesson];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Verse => "verse",
            ContentKind::Hadith => "hadith",
            ContentKind::Lesson => "lesson",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verse" => Ok(ContentKind::Verse),
            "hadith" => Ok(ContentKind::Hadith),
            "lesson" => Ok(ContentKind::Lesson),
            other => Err(format!(
                "Unknown content kind '{}'. Expected one of: verse, hadith, lesson",
                other
            )),
        }
    }
}

/// One distinct piece of content a user has consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionEntry {
    pub content_id: String,

    /// Human readable reference, e.g. "Surah Al-Fatiha 1:1-7".
    pub display_reference: String,

    pub last_consumed_at: DateTime<Utc>,

    /// Always >= 1. Grows on every repeat event for the same content id.
    pub times_consumed: u32,
}

/// Consecutive-day activity counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: DateTime<Utc>,
}

impl Streak {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            last_active_date: now,
        }
    }

    /// Returns the streak after an event at `now`.
    ///
    /// Days are calendar days in `offset`, so only midnight crossings count,
    /// not elapsed hours. An inactive streak (0) always starts at 1.
    pub fn advance(self, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        if self.current_streak == 0 {
            return self.restart(now);
        }

        let today = local_day(now, offset);
        let last_active = local_day(self.last_active_date, offset);

        match today.signed_duration_since(last_active).num_days() {
            0 => self,
            1 => {
                let current_streak = self.current_streak + 1;
                Self {
                    current_streak,
                    longest_streak: self.longest_streak.max(current_streak),
                    last_active_date: now,
                }
            }
            // Gap of two or more days, or the clock went backwards across midnight.
            _ => self.restart(now),
        }
    }

    fn restart(self, now: DateTime<Utc>) -> Self {
        Self {
            current_streak: 1,
            longest_streak: self.longest_streak.max(1),
            last_active_date: now,
        }
    }
}

/// Calendar day of `at` as seen from `offset`.
pub fn local_day(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Distinct-item counters. Repeats never increase them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_verses: u64,
    pub total_hadith: u64,
    pub total_lessons: u64,
    pub total_time_spent_minutes: u64,
}

impl Totals {
    fn increment(&mut self, kind: ContentKind) {
        match kind {
            ContentKind::Verse => self.total_verses += 1,
            ContentKind::Hadith => self.total_hadith += 1,
            ContentKind::Lesson => self.total_lessons += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    pub description: String,
    pub earned_at: DateTime<Utc>,
    #[serde(default)]
    pub icon: String,
}

/// A single "mark consumed" event.
#[derive(Debug, Clone)]
pub struct ConsumptionEvent {
    pub kind: ContentKind,
    pub content_id: String,
    pub display_reference: String,
    pub at: DateTime<Utc>,
}

/// The per-user progress document.
///
/// All transitions consume the record and return the updated value;
/// persistence is a separate step owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: i64,
    pub verses_read: Vec<ConsumptionEntry>,
    pub hadith_read: Vec<ConsumptionEntry>,
    pub lessons_completed: Vec<ConsumptionEntry>,
    pub streak: Streak,
    pub totals: Totals,
    pub achievements: Vec<Achievement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    pub fn new(user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            verses_read: Vec::new(),
            hadith_read: Vec::new(),
            lessons_completed: Vec::new(),
            streak: Streak::fresh(now),
            totals: Totals::default(),
            achievements: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Entries of one kind, in first-insertion order.
    pub fn entries(&self, kind: ContentKind) -> &[ConsumptionEntry] {
        match kind {
            ContentKind::Verse => &self.verses_read,
            ContentKind::Hadith => &self.hadith_read,
            ContentKind::Lesson => &self.lessons_completed,
        }
    }

    fn entries_mut(&mut self, kind: ContentKind) -> &mut Vec<ConsumptionEntry> {
        match kind {
            ContentKind::Verse => &mut self.verses_read,
            ContentKind::Hadith => &mut self.hadith_read,
            ContentKind::Lesson => &mut self.lessons_completed,
        }
    }

    /// Records one consumption event and advances the streak.
    pub fn apply(mut self, event: &ConsumptionEvent, offset: FixedOffset) -> Self {
        let entries = self.entries_mut(event.kind);

        match entries.iter().position(|e| e.content_id == event.content_id) {
            Some(index) => {
                let entry = &mut entries[index];
                entry.times_consumed += 1;
                entry.last_consumed_at = event.at;
            }
            None => {
                entries.push(ConsumptionEntry {
                    content_id: event.content_id.clone(),
                    display_reference: event.display_reference.clone(),
                    last_consumed_at: event.at,
                    times_consumed: 1,
                });
                self.totals.increment(event.kind);
            }
        }

        self.streak = self.streak.advance(event.at, offset);
        self.updated_at = event.at;
        self
    }

    /// Clears consumption history, totals and streak. Achievements are kept.
    pub fn reset(mut self, now: DateTime<Utc>) -> Self {
        self.verses_read.clear();
        self.hadith_read.clear();
        self.lessons_completed.clear();
        self.totals = Totals::default();
        self.streak = Streak::fresh(now);
        self.updated_at = now;
        self
    }

    pub fn award(mut self, achievement: Achievement) -> Self {
        self.updated_at = achievement.earned_at;
        self.achievements.push(achievement);
        self
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            totals: self.totals,
            streak: self.streak,
            recent_activity: RecentActivity {
                verses_read: recent(&self.verses_read, RECENT_ACTIVITY_LEN),
                hadith_read: recent(&self.hadith_read, RECENT_ACTIVITY_LEN),
                lessons_completed: recent(&self.lessons_completed, RECENT_ACTIVITY_LEN),
            },
            achievements: self.achievements.clone(),
        }
    }

    pub fn stats(&self) -> ProgressStats {
        ProgressStats {
            totals: self.totals,
            current_streak: self.streak.current_streak,
            longest_streak: self.streak.longest_streak,
            last_active_date: Some(self.streak.last_active_date),
        }
    }

    /// Most recently consumed entries across the selected kinds, newest first.
    pub fn history(&self, kind: Option<ContentKind>, limit: usize) -> Vec<HistoryEntry> {
        let mut history: Vec<HistoryEntry> = ContentKind::ALL
            .into_iter()
            .filter(|k| kind.is_none_or(|wanted| wanted == *k))
            .flat_map(|k| {
                recent(self.entries(k), limit)
                    .into_iter()
                    .map(move |entry| HistoryEntry { kind: k, entry })
            })
            .collect();

        history.sort_by(|a, b| b.entry.last_consumed_at.cmp(&a.entry.last_consumed_at));
        history.truncate(limit);
        history
    }
}

/// Last `n` entries, newest insertion first.
fn recent(entries: &[ConsumptionEntry], n: usize) -> Vec<ConsumptionEntry> {
    entries.iter().rev().take(n).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub verses_read: Vec<ConsumptionEntry>,
    pub hadith_read: Vec<ConsumptionEntry>,
    pub lessons_completed: Vec<ConsumptionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub totals: Totals,
    pub streak: Streak,
    pub recent_activity: RecentActivity,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    #[serde(flatten)]
    pub totals: Totals,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<DateTime<Utc>>,
}

impl ProgressStats {
    /// Stats reported for a user that has no record yet.
    pub fn empty() -> Self {
        Self {
            totals: Totals::default(),
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub kind: ContentKind,
    #[serde(flatten)]
    pub entry: ConsumptionEntry,
}

/// DTO for marking a verse, hadith or lesson as consumed.
///
/// Accepts the per-kind field names (`verse_id`, `title`, ...) as aliases.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordConsumptionRequest {
    #[serde(default, alias = "verse_id", alias = "hadith_id", alias = "lesson_id")]
    #[validate(length(min = 1, max = 100, message = "Content ID is required (max 100 characters)."))]
    pub content_id: String,

    #[serde(default, alias = "title")]
    #[validate(length(min = 1, max = 200, message = "Reference is required (max 200 characters)."))]
    pub reference: String,
}

/// Query parameters for the history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

/// DTO for appending an achievement.
#[derive(Debug, Deserialize, Validate)]
pub struct AwardAchievementRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub icon: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn event(kind: ContentKind, id: &str, when: DateTime<Utc>) -> ConsumptionEvent {
        ConsumptionEvent {
            kind,
            content_id: id.to_string(),
            display_reference: format!("Ref {}", id),
            at: when,
        }
    }

    fn streak(current: u32, longest: u32, last: DateTime<Utc>) -> Streak {
        Streak {
            current_streak: current,
            longest_streak: longest,
            last_active_date: last,
        }
    }

    #[test]
    fn test_streak_same_day_unchanged() {
        let s = streak(3, 5, at(10, 8));
        let next = s.advance(at(10, 22), utc());
        assert_eq!(next, s);
    }

    #[test]
    fn test_streak_next_day_increments() {
        let next = streak(3, 3, at(10, 8)).advance(at(11, 1), utc());
        assert_eq!(next.current_streak, 4);
        assert_eq!(next.longest_streak, 4);
        assert_eq!(next.last_active_date, at(11, 1));
    }

    #[test]
    fn test_streak_gap_resets_to_one() {
        let next = streak(6, 9, at(10, 8)).advance(at(13, 8), utc());
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 9);
        assert_eq!(next.last_active_date, at(13, 8));
    }

    #[test]
    fn test_streak_backwards_clock_resets() {
        let next = streak(4, 4, at(10, 8)).advance(at(9, 8), utc());
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 4);
    }

    #[test]
    fn test_streak_counts_midnights_not_hours() {
        // 30 hours apart: one midnight crossed.
        let one = streak(1, 1, at(10, 1)).advance(at(10, 1) + Duration::hours(30), utc());
        assert_eq!(one.current_streak, 2);

        // 30 hours apart: two midnights crossed.
        let two = streak(1, 1, at(10, 23)).advance(at(10, 23) + Duration::hours(30), utc());
        assert_eq!(two.current_streak, 1);
    }

    #[test]
    fn test_streak_uses_configured_offset() {
        // 23:30 and 00:30 UTC are the same day at UTC+3.
        let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
        let last = Utc.with_ymd_and_hms(2025, 3, 10, 21, 30, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 22, 30, 0).unwrap();
        assert_eq!(streak(2, 2, last).advance(now, plus_three).current_streak, 2);

        let now = Utc.with_ymd_and_hms(2025, 3, 11, 0, 30, 0).unwrap();
        assert_eq!(streak(2, 2, last).advance(now, utc()).current_streak, 3);
    }

    #[test]
    fn test_inactive_streak_starts_at_one() {
        let next = Streak::fresh(at(10, 8)).advance(at(10, 9), utc());
        assert_eq!(next.current_streak, 1);
        assert_eq!(next.longest_streak, 1);
    }

    #[test]
    fn test_first_event_on_new_record() {
        let record = ProgressRecord::new(7, at(10, 8))
            .apply(&event(ContentKind::Verse, "2:255", at(10, 9)), utc());

        assert_eq!(record.totals.total_verses, 1);
        assert_eq!(record.streak.current_streak, 1);
        assert_eq!(record.verses_read[0].times_consumed, 1);
        assert_eq!(record.verses_read[0].display_reference, "Ref 2:255");
    }

    #[test]
    fn test_repeat_next_day_counts_times_not_totals() {
        let record = ProgressRecord::new(7, at(10, 8))
            .apply(&event(ContentKind::Verse, "2:255", at(10, 9)), utc())
            .apply(&event(ContentKind::Verse, "2:255", at(11, 9)), utc());

        assert_eq!(record.verses_read.len(), 1);
        assert_eq!(record.verses_read[0].times_consumed, 2);
        assert_eq!(record.verses_read[0].last_consumed_at, at(11, 9));
        assert_eq!(record.totals.total_verses, 1);
        assert_eq!(record.streak.current_streak, 2);
    }

    #[test]
    fn test_same_day_repeats() {
        let mut record = ProgressRecord::new(1, at(10, 0));
        for hour in 1..=6 {
            record = record.apply(&event(ContentKind::Hadith, "qudsi-1", at(10, hour)), utc());
        }

        assert_eq!(record.hadith_read[0].times_consumed, 6);
        assert_eq!(record.totals.total_hadith, 1);
        assert_eq!(record.streak.current_streak, 1);
    }

    #[test]
    fn test_kinds_are_tracked_separately() {
        let record = ProgressRecord::new(1, at(10, 0))
            .apply(&event(ContentKind::Verse, "1", at(10, 1)), utc())
            .apply(&event(ContentKind::Hadith, "1", at(10, 2)), utc())
            .apply(&event(ContentKind::Lesson, "1", at(10, 3)), utc())
            .apply(&event(ContentKind::Lesson, "2", at(10, 4)), utc());

        assert_eq!(record.totals.total_verses, 1);
        assert_eq!(record.totals.total_hadith, 1);
        assert_eq!(record.totals.total_lessons, 2);
    }

    #[test]
    fn test_longest_streak_never_decreases() {
        let days = [1, 2, 3, 7, 8, 20, 21, 22, 23, 24, 26];
        let mut record = ProgressRecord::new(1, at(1, 0));
        let mut longest = 0;

        for day in days {
            record = record.apply(&event(ContentKind::Verse, "x", at(day, 12)), utc());
            assert!(record.streak.longest_streak >= longest);
            assert!(record.streak.longest_streak >= record.streak.current_streak);
            longest = record.streak.longest_streak;
        }

        assert_eq!(longest, 5);
        assert_eq!(record.streak.current_streak, 1);
    }

    #[test]
    fn test_reset_clears_everything_but_achievements() {
        let record = ProgressRecord::new(1, at(1, 0))
            .apply(&event(ContentKind::Verse, "a", at(1, 1)), utc())
            .apply(&event(ContentKind::Lesson, "b", at(2, 1)), utc())
            .award(Achievement {
                name: "First Steps".to_string(),
                description: "Read a verse".to_string(),
                earned_at: at(2, 2),
                icon: "star".to_string(),
            })
            .reset(at(3, 0));

        let summary = record.summary();
        assert_eq!(summary.totals, Totals::default());
        assert_eq!(summary.streak, Streak::fresh(at(3, 0)));
        assert!(summary.recent_activity.verses_read.is_empty());
        assert!(summary.recent_activity.lessons_completed.is_empty());
        assert_eq!(summary.achievements.len(), 1);
    }

    #[test]
    fn test_summary_recent_activity_newest_first() {
        let mut record = ProgressRecord::new(1, at(1, 0));
        for i in 0..8 {
            record = record.apply(&event(ContentKind::Verse, &i.to_string(), at(1, i + 1)), utc());
        }

        let ids: Vec<_> = record
            .summary()
            .recent_activity
            .verses_read
            .into_iter()
            .map(|e| e.content_id)
            .collect();
        assert_eq!(ids, vec!["7", "6", "5", "4", "3"]);
    }

    #[test]
    fn test_history_merges_and_limits() {
        let record = ProgressRecord::new(1, at(1, 0))
            .apply(&event(ContentKind::Verse, "v1", at(1, 1)), utc())
            .apply(&event(ContentKind::Hadith, "h1", at(1, 2)), utc())
            .apply(&event(ContentKind::Lesson, "l1", at(1, 3)), utc())
            .apply(&event(ContentKind::Verse, "v2", at(1, 4)), utc())
            // Repeat moves v1 to the front of the timeline.
            .apply(&event(ContentKind::Verse, "v1", at(1, 5)), utc());

        let all: Vec<_> = record
            .history(None, 20)
            .into_iter()
            .map(|h| h.entry.content_id)
            .collect();
        assert_eq!(all, vec!["v1", "v2", "l1", "h1"]);

        let limited = record.history(None, 2);
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].kind, ContentKind::Verse);

        let hadith = record.history(Some(ContentKind::Hadith), 20);
        assert_eq!(hadith.len(), 1);
        assert_eq!(hadith[0].kind, ContentKind::Hadith);
    }

    #[test]
    fn test_content_kind_parse() {
        assert_eq!("lesson".parse::<ContentKind>(), Ok(ContentKind::Lesson));
        assert!("surah".parse::<ContentKind>().is_err());
    }
}
