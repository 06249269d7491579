//! Data model for the reading tracker
//!
//! The root [`State`] document holds every durable slice: meta, stats,
//! books, session history, monthly archives and labels. Persisted field
//! names follow the on-disk document format (camelCase, short history
//! field names), and every slice decodes tolerantly so a stale document
//! never blocks a load.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length of a label name, in characters
pub const MAX_LABEL_NAME_LEN: usize = 20;

/// Root state document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub archived: BTreeMap<String, ArchiveBucket>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

impl State {
    /// Fresh document for a first run at the given instant
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            meta: Meta::new(now),
            stats: Stats::new(now),
            books: Vec::new(),
            history: Vec::new(),
            archived: BTreeMap::new(),
            labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

impl Meta {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            created_at: now,
            imported_at: None,
        }
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::new(DateTime::UNIX_EPOCH)
    }
}

/// Aggregate reading statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Total minutes read, all time
    pub total: u32,
    /// Minutes read on `date`; callers reset this when the day changes
    #[serde(default)]
    pub today: u32,
    /// Calendar-day label (`YYYY-MM-DD`) that `today` refers to
    #[serde(default)]
    pub date: String,
    /// Sessions recorded, including sub-threshold ones
    #[serde(default)]
    pub sessions: u32,
    /// Set once, on the first recorded session
    #[serde(default)]
    pub first_session_date: Option<DateTime<Utc>>,
}

impl Stats {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            date: Self::day_label(now),
            ..Self::default()
        }
    }

    /// Calendar-day label for an instant
    pub fn day_label(now: DateTime<Utc>) -> String {
        now.format("%Y-%m-%d").to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Wishlist,
    Unread,
    Reading,
    Completed,
    Dropped,
}

impl Default for BookStatus {
    fn default() -> Self {
        Self::Wishlist
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub status: BookStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Minutes accumulated across reading sessions
    #[serde(default)]
    pub reading_time: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_note: Option<String>,
    #[serde(default)]
    pub reflections: Vec<Reflection>,
    #[serde(default)]
    pub label_ids: Vec<i64>,
}

impl Book {
    pub fn new(id: i64, title: impl Into<String>, status: BookStatus) -> Self {
        Self {
            id,
            title: title.into(),
            status,
            link: None,
            cover_url: None,
            started_at: None,
            completed_at: None,
            reading_time: 0,
            bookmark: None,
            completion_note: None,
            reflections: Vec::new(),
            label_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub date: DateTime<Utc>,
    pub note: String,
}

/// One recorded reading session. Immutable once created; only appended,
/// bulk-replaced, or filtered out during archival. Field names match the
/// compact persisted form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// ISO timestamp of when the session ended
    pub d: String,
    /// Minutes, always > 0
    pub m: u32,
    /// Hour of day the session ended (0-23)
    pub h: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
}

impl HistoryEntry {
    pub fn new(ended_at: DateTime<Utc>, minutes: u32, book_id: Option<i64>) -> Self {
        Self {
            d: ended_at.to_rfc3339(),
            m: minutes,
            h: ended_at.hour() as u8,
            book_id,
        }
    }

    /// Month key (`YYYY-MM`) of the entry's own timestamp, if parsable
    pub fn month_key(&self) -> Option<String> {
        self.timestamp().map(|t| format!("{:04}-{:02}", t.year(), t.month()))
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.d)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Lossy monthly compaction of removed history entries. Merges are
/// additive: counters accumulate, never overwrite.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBucket {
    pub sessions: u32,
    pub total_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: i64,
    pub name: String,
}

// ===== Partial-update requests =====

/// Field-wise book update; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub status: Option<BookStatus>,
    pub link: Option<String>,
    pub cover_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reading_time: Option<u32>,
    pub bookmark: Option<String>,
    pub completion_note: Option<String>,
    pub label_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct StatsPatch {
    pub total: Option<u32>,
    pub today: Option<u32>,
    pub date: Option<String>,
    pub sessions: Option<u32>,
    /// Applied only while `first_session_date` is still unset
    pub first_session_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct MetaPatch {
    /// Ignored if lower than the current version
    pub schema_version: Option<u32>,
    pub imported_at: Option<DateTime<Utc>>,
}
