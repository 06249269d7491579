//! Tome — personal reading-activity tracker core.
//!
//! The crate is the single source of truth for application data: an
//! in-memory state store with a pub/sub channel, a key-value persistence
//! layer with backup import/export, a time-based history retention engine
//! that compacts old sessions into monthly aggregates, and a crash-safe
//! reading timer.

pub mod clock;
pub mod ids;
pub mod retention;
pub mod state;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{extract_timestamp_from_id, IdGenerator};
pub use retention::{cleanup_history, CleanupOutcome, RetentionPolicy};
pub use state::{
    ArchiveBucket, Book, BookPatch, BookStatus, HistoryEntry, Label, Meta, MetaPatch, Reflection,
    State, StateStore, Stats, StatsPatch, UiState,
};
pub use storage::{
    export_data, import_data, load_state, save_state, storage_usage, BackupError, FileBackend,
    MemoryBackend, StorageBackend, StorageError, StorageUsage,
};
pub use timer::{ActiveSession, SessionOutcome, TimerService};
