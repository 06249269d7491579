//! Slice persistence
//!
//! Each top-level durable slice of the state document is written to its
//! own key and decoded independently on load, so one corrupt slice never
//! takes the others down with it: the bad slice falls back to its default
//! and the rest load normally. The load path also runs the retention
//! engine over history and persists the compacted result back.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::backend::{Result, StorageBackend, StorageError};
use crate::retention::{cleanup_history, RetentionPolicy};
use crate::state::models::State;

pub const META_KEY: &str = "meta";
pub const STATS_KEY: &str = "stats";
pub const BOOKS_KEY: &str = "books";
pub const HISTORY_KEY: &str = "history";
pub const ARCHIVED_KEY: &str = "archived";
pub const LABELS_KEY: &str = "labels";
/// Written by the timer service, outside the main save cycle
pub const ACTIVE_SESSION_KEY: &str = "active-session";

/// Every key this layer knows about, for usage metrics and full wipes
const KNOWN_KEYS: &[&str] = &[
    META_KEY,
    STATS_KEY,
    BOOKS_KEY,
    HISTORY_KEY,
    ARCHIVED_KEY,
    LABELS_KEY,
    ACTIVE_SESSION_KEY,
];

/// Advisory quota; never enforced by this layer
pub const STORAGE_LIMIT_BYTES: u64 = 5 * 1024 * 1024;

/// Write each durable slice to its own key.
///
/// A failing slice does not block the others; every slice is attempted
/// and the first error is returned afterwards so callers can surface the
/// degradation once.
pub fn save_state(backend: &dyn StorageBackend, state: &State) -> Result<()> {
    let mut first_error = None;

    write_slice(backend, META_KEY, &state.meta, &mut first_error);
    write_slice(backend, STATS_KEY, &state.stats, &mut first_error);
    write_slice(backend, BOOKS_KEY, &state.books, &mut first_error);
    write_slice(backend, HISTORY_KEY, &state.history, &mut first_error);
    write_slice(backend, ARCHIVED_KEY, &state.archived, &mut first_error);
    write_slice(backend, LABELS_KEY, &state.labels, &mut first_error);

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn write_slice<T: Serialize>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
    first_error: &mut Option<StorageError>,
) {
    let result = serde_json::to_string_pretty(value)
        .map_err(StorageError::from)
        .and_then(|json| backend.set(key, &json));
    if let Err(err) = result {
        warn!("failed to persist slice '{}': {}", key, err);
        if first_error.is_none() {
            *first_error = Some(err);
        }
    }
}

/// Reconstruct the state document from storage.
///
/// Missing or corrupt slices fall back to the fields of a freshly
/// constructed initial state. History retention runs before the result is
/// returned, and any compaction is persisted back so the next load starts
/// clean. Never fails: total storage loss just yields a fresh document.
pub fn load_state(backend: &dyn StorageBackend, now: DateTime<Utc>) -> State {
    let defaults = State::new(now);

    let mut state = State {
        meta: read_slice(backend, META_KEY).unwrap_or(defaults.meta),
        stats: read_slice(backend, STATS_KEY).unwrap_or(defaults.stats),
        books: read_slice(backend, BOOKS_KEY).unwrap_or(defaults.books),
        history: read_slice(backend, HISTORY_KEY).unwrap_or(defaults.history),
        archived: read_slice(backend, ARCHIVED_KEY).unwrap_or(defaults.archived),
        labels: read_slice(backend, LABELS_KEY).unwrap_or(defaults.labels),
    };

    let outcome = cleanup_history(
        &state.history,
        &state.archived,
        now,
        &RetentionPolicy::default(),
    );
    if !outcome.is_clean(state.history.len()) {
        debug!(
            "retention pass: {} entries archived into {} months, {} stale buckets dropped",
            state.history.len() - outcome.recent_history.len(),
            outcome.archive_updates.len(),
            outcome.archive_keys_to_remove.len()
        );

        state.history = outcome.recent_history;
        for (month_key, update) in &outcome.archive_updates {
            let bucket = state.archived.entry(month_key.clone()).or_default();
            bucket.sessions += update.sessions;
            bucket.total_minutes += update.total_minutes;
        }
        for month_key in &outcome.archive_keys_to_remove {
            state.archived.remove(month_key);
        }

        let mut write_error = None;
        write_slice(backend, HISTORY_KEY, &state.history, &mut write_error);
        write_slice(backend, ARCHIVED_KEY, &state.archived, &mut write_error);
    }

    state
}

fn read_slice<T: DeserializeOwned>(backend: &dyn StorageBackend, key: &str) -> Option<T> {
    let raw = match backend.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!("failed to read slice '{}': {}", key, err);
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            // Self-healing: the slice falls back to its default
            warn!("corrupt slice '{}' ignored: {}", key, err);
            None
        }
    }
}

/// Informational storage footprint against a fixed 5 MiB advisory limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub limit_bytes: u64,
    pub percent: f64,
    pub used_kb: f64,
    pub limit_mb: f64,
}

/// Sum the serialized byte length of all known keys currently stored
pub fn storage_usage(backend: &dyn StorageBackend) -> StorageUsage {
    let mut used_bytes = 0u64;
    for key in KNOWN_KEYS {
        if let Ok(Some(value)) = backend.get(key) {
            used_bytes += value.len() as u64;
        }
    }

    let percent = (used_bytes as f64 / STORAGE_LIMIT_BYTES as f64) * 100.0;
    StorageUsage {
        used_bytes,
        limit_bytes: STORAGE_LIMIT_BYTES,
        percent: round1(percent),
        used_kb: round1(used_bytes as f64 / 1024.0),
        limit_mb: STORAGE_LIMIT_BYTES as f64 / (1024.0 * 1024.0),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Remove every known key, including the active session record
pub fn clear_all_data(backend: &dyn StorageBackend) -> Result<()> {
    let mut first_error = None;
    for key in KNOWN_KEYS {
        if let Err(err) = backend.remove(key) {
            warn!("failed to remove key '{}': {}", key, err);
            if first_error.is_none() {
                first_error = Some(err);
            }
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
