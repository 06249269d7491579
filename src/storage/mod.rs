mod backend;
pub mod backup;
mod persistence;

pub use backend::{FileBackend, MemoryBackend, StorageBackend, StorageError};
pub use backup::{export_data, export_to_file, import_data, import_from_file, BackupError};
pub use persistence::{
    clear_all_data, load_state, save_state, storage_usage, StorageUsage, ACTIVE_SESSION_KEY,
    STORAGE_LIMIT_BYTES,
};
