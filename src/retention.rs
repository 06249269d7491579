//! History retention and archival
//!
//! Pure partitioning of session history into recent entries (kept
//! verbatim) and aged entries (compacted into monthly aggregates), plus
//! identification of archive buckets old enough to delete. The caller
//! applies the outcome to the store and persists it; this module performs
//! no I/O and mutates nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::state::models::{ArchiveBucket, HistoryEntry};

/// How long history is kept in full detail, and how long monthly
/// aggregates are kept after that.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Entries at most this old stay in history verbatim
    pub retention_days: i64,
    /// Archive buckets older than this many months before `now` are dropped
    pub archive_months: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_days: 90,
            archive_months: 12,
        }
    }
}

/// Result of one cleanup pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupOutcome {
    /// Entries within the retention window, in original order
    pub recent_history: Vec<HistoryEntry>,
    /// Additive per-month aggregates of the aged entries, to be merged
    /// into existing buckets
    pub archive_updates: BTreeMap<String, ArchiveBucket>,
    /// Existing bucket keys stale enough to delete
    pub archive_keys_to_remove: Vec<String>,
}

impl CleanupOutcome {
    /// True when applying the outcome would change nothing
    pub fn is_clean(&self, history_len: usize) -> bool {
        self.recent_history.len() == history_len
            && self.archive_updates.is_empty()
            && self.archive_keys_to_remove.is_empty()
    }
}

/// Partition `history` by age relative to `now` and scan `archived` for
/// stale buckets.
///
/// Entries are grouped by the calendar month of their own timestamp, not
/// of `now`. Entries with an unparsable timestamp are kept verbatim rather
/// than silently dropped. Empty inputs yield empty outputs.
pub fn cleanup_history(
    history: &[HistoryEntry],
    archived: &BTreeMap<String, ArchiveBucket>,
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
) -> CleanupOutcome {
    let cutoff = now - Duration::days(policy.retention_days);
    let mut outcome = CleanupOutcome::default();

    for entry in history {
        match entry.timestamp() {
            Some(ts) if ts < cutoff => {
                let key = month_key(ts);
                let bucket = outcome.archive_updates.entry(key).or_default();
                bucket.sessions += 1;
                bucket.total_minutes += entry.m;
            }
            _ => outcome.recent_history.push(entry.clone()),
        }
    }

    // Zero-padded YYYY-MM keys compare chronologically as strings
    let stale_cutoff = shift_months_back(now, policy.archive_months);
    outcome.archive_keys_to_remove = archived
        .keys()
        .filter(|key| key.as_str() < stale_cutoff.as_str())
        .cloned()
        .collect();

    outcome
}

fn month_key(ts: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

/// Month key of the instant `months` calendar months before `now`
fn shift_months_back(now: DateTime<Utc>, months: u32) -> String {
    let total = now.year() * 12 + now.month0() as i32 - months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) + 1;
    format!("{:04}-{:02}", year, month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap()
    }

    fn entry_days_ago(days: i64, minutes: u32) -> HistoryEntry {
        HistoryEntry::new(now() - Duration::days(days), minutes, None)
    }

    #[test]
    fn test_recent_entries_kept_verbatim_in_order() {
        let history = vec![
            entry_days_ago(89, 10),
            entry_days_ago(1, 20),
            entry_days_ago(45, 30),
        ];

        let outcome = cleanup_history(
            &history,
            &BTreeMap::new(),
            now(),
            &RetentionPolicy::default(),
        );

        assert_eq!(outcome.recent_history, history);
        assert!(outcome.archive_updates.is_empty());
        assert!(outcome.archive_keys_to_remove.is_empty());
    }

    #[test]
    fn test_aged_entries_fully_accounted_in_archive_updates() {
        let history = vec![
            entry_days_ago(100, 10), // 2026-05
            entry_days_ago(120, 20), // 2026-04
            entry_days_ago(125, 30), // 2026-04
            entry_days_ago(30, 40),  // recent
        ];

        let outcome = cleanup_history(
            &history,
            &BTreeMap::new(),
            now(),
            &RetentionPolicy::default(),
        );

        assert_eq!(outcome.recent_history.len(), 1);

        let aged_sessions: u32 = outcome.archive_updates.values().map(|b| b.sessions).sum();
        let aged_minutes: u32 = outcome
            .archive_updates
            .values()
            .map(|b| b.total_minutes)
            .sum();
        assert_eq!(aged_sessions, 3);
        assert_eq!(aged_minutes, 60);

        let april = &outcome.archive_updates["2026-04"];
        assert_eq!(april.sessions, 2);
        assert_eq!(april.total_minutes, 50);
    }

    #[test]
    fn test_entries_grouped_by_their_own_month() {
        // 100 days before 2026-08-15 lands in May regardless of `now`
        let history = vec![entry_days_ago(100, 15)];

        let outcome = cleanup_history(
            &history,
            &BTreeMap::new(),
            now(),
            &RetentionPolicy::default(),
        );

        assert!(outcome.archive_updates.contains_key("2026-05"));
    }

    #[test]
    fn test_stale_buckets_listed_for_removal() {
        let mut archived = BTreeMap::new();
        archived.insert("2024-12".to_string(), ArchiveBucket::default()); // stale
        archived.insert("2025-07".to_string(), ArchiveBucket::default()); // stale
        archived.insert("2025-08".to_string(), ArchiveBucket::default()); // exactly 12 months, kept
        archived.insert("2026-02".to_string(), ArchiveBucket::default()); // kept

        let outcome = cleanup_history(&[], &archived, now(), &RetentionPolicy::default());

        assert_eq!(
            outcome.archive_keys_to_remove,
            vec!["2024-12".to_string(), "2025-07".to_string()]
        );
    }

    #[test]
    fn test_idempotent_on_clean_state() {
        let history = vec![entry_days_ago(10, 10), entry_days_ago(89, 20)];
        let mut archived = BTreeMap::new();
        archived.insert(
            "2026-01".to_string(),
            ArchiveBucket {
                sessions: 4,
                total_minutes: 80,
            },
        );

        let outcome = cleanup_history(&history, &archived, now(), &RetentionPolicy::default());

        assert!(outcome.is_clean(history.len()));
        assert_eq!(outcome.recent_history, history);
    }

    #[test]
    fn test_empty_inputs_yield_empty_outputs() {
        let outcome = cleanup_history(
            &[],
            &BTreeMap::new(),
            now(),
            &RetentionPolicy::default(),
        );

        assert_eq!(outcome, CleanupOutcome::default());
    }

    #[test]
    fn test_unparsable_timestamp_kept_verbatim() {
        let mut bad = entry_days_ago(200, 10);
        bad.d = "not a timestamp".to_string();

        let outcome = cleanup_history(
            &[bad.clone()],
            &BTreeMap::new(),
            now(),
            &RetentionPolicy::default(),
        );

        assert_eq!(outcome.recent_history, vec![bad]);
        assert!(outcome.archive_updates.is_empty());
    }

    #[test]
    fn test_year_boundary_month_arithmetic() {
        let january = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        let mut archived = BTreeMap::new();
        archived.insert("2024-12".to_string(), ArchiveBucket::default()); // stale
        archived.insert("2025-01".to_string(), ArchiveBucket::default()); // kept

        let outcome = cleanup_history(&[], &archived, january, &RetentionPolicy::default());

        assert_eq!(outcome.archive_keys_to_remove, vec!["2024-12".to_string()]);
    }
}
