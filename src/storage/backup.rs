//! Backup export and import
//!
//! A backup is the full state document serialized as one JSON file. Import
//! validates the structure before anything is accepted: a rejected backup
//! never mutates the store, and the caller gets a user-facing error value
//! instead of an escaping panic. Accepted backups are stamped with
//! `meta.importedAt` and round-trip every field the exporter wrote.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::backend::Result;
use crate::state::models::State;

#[derive(Error, Debug)]
pub enum BackupError {
    /// The user-facing rejection; covers unreadable files, unparsable JSON
    /// and structurally invalid documents alike
    #[error("backup data is corrupted")]
    Corrupted,
}

/// Serialize the full state document for download
pub fn export_data(state: &State) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn export_to_file(state: &State, path: &Path) -> Result<()> {
    let json = export_data(state)?;
    fs::write(path, json)?;
    Ok(())
}

/// Parse and validate a backup document.
///
/// At minimum `stats.total` must be numeric and `books` must be an array;
/// anything less is rejected before any decode into the state model. On
/// success the returned state carries `meta.importedAt = now` and is ready
/// to hand to `StateStore::initialize`.
pub fn import_data(raw: &str, now: DateTime<Utc>) -> std::result::Result<State, BackupError> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|_| BackupError::Corrupted)?;

    if !value["stats"]["total"].is_number() || !value["books"].is_array() {
        return Err(BackupError::Corrupted);
    }

    let mut state: State = serde_json::from_value(value).map_err(|_| BackupError::Corrupted)?;
    state.meta.imported_at = Some(now);
    Ok(state)
}

/// Read and import a backup file. Read failures are reported the same way
/// as validation failures.
pub fn import_from_file(
    path: &Path,
    now: DateTime<Utc>,
) -> std::result::Result<State, BackupError> {
    let raw = fs::read_to_string(path).map_err(|_| BackupError::Corrupted)?;
    import_data(&raw, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::state::models::{Book, BookStatus, HistoryEntry, Label};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_import_minimal_valid_backup() {
        let state = import_data(r#"{"stats": {"total": 120}, "books": []}"#, now()).unwrap();

        assert_eq!(state.stats.total, 120);
        assert!(state.books.is_empty());
        assert_eq!(state.meta.imported_at, Some(now()));
    }

    #[test]
    fn test_import_rejects_missing_total() {
        // `sessions` alone is not enough; `stats.total` is required
        let result = import_data(r#"{"stats": {"sessions": 1}, "books": []}"#, now());
        assert!(matches!(result, Err(BackupError::Corrupted)));
    }

    #[test]
    fn test_import_rejects_non_array_books() {
        let result = import_data(r#"{"stats": {"total": 5}, "books": {}}"#, now());
        assert!(matches!(result, Err(BackupError::Corrupted)));
    }

    #[test]
    fn test_import_rejects_unparsable_json() {
        let result = import_data("definitely not json", now());
        assert!(matches!(result, Err(BackupError::Corrupted)));
    }

    #[test]
    fn test_rejection_message_is_user_facing() {
        let err = import_data("{}", now()).unwrap_err();
        assert_eq!(err.to_string(), "backup data is corrupted");
    }

    #[test]
    fn test_export_import_round_trip_preserves_all_slices() {
        let mut state = State::new(now());
        let mut book = Book::new(1, "Dune", BookStatus::Completed);
        book.reading_time = 340;
        book.label_ids.push(9);
        state.books.push(book);
        state.history.push(HistoryEntry::new(now(), 25, Some(1)));
        state.archived.insert(
            "2025-06".to_string(),
            crate::state::models::ArchiveBucket {
                sessions: 8,
                total_minutes: 200,
            },
        );
        state.labels.push(Label {
            id: 9,
            name: "sci-fi".to_string(),
        });
        state.stats.total = 565;
        state.stats.sessions = 20;

        let exported = export_data(&state).unwrap();
        let imported = import_data(&exported, now()).unwrap();

        assert_eq!(imported.stats.total, 565);
        assert_eq!(imported.books[0].reading_time, 340);
        assert_eq!(imported.books[0].label_ids, vec![9]);
        assert_eq!(imported.history, state.history);
        assert_eq!(imported.archived, state.archived);
        assert_eq!(imported.labels, state.labels);
        assert_eq!(imported.meta.created_at, state.meta.created_at);
    }

    #[test]
    fn test_import_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");

        let state = State::new(now());
        // A fresh state has no sessions, but stats.total is present
        export_to_file(&state, &path).unwrap();

        let imported = import_from_file(&path, now()).unwrap();
        assert_eq!(imported.meta.imported_at, Some(now()));

        let missing = import_from_file(&dir.path().join("absent.json"), now());
        assert!(matches!(missing, Err(BackupError::Corrupted)));
    }
}
