//! # Filemeta - local file-metadata store for a cloud storage client
//!
//! Mirrors the server's file/folder tree of one account as durable local
//! records.
//!
//! Filemeta provides:
//! - A record model for files and folders addressed by normalized paths
//! - SQLite-backed persistence with atomic single-row and batched writes
//! - A rebuildable path index that amortizes path lookups
//! - A storage manager façade used by sync engines and UI adapters

pub mod path;
pub mod entity;
pub mod storage;
pub mod index;
pub mod manager;
pub mod events;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use path::RemotePath;
pub use entity::{ChildOrder, FileEntity};
pub use storage::SqliteStore;
pub use index::PathIndex;
pub use manager::{ManagerOptions, ParentPolicy, StorageManager};
pub use events::{EventSender, StoreEvent};

/// Result type alias for Filemeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Filemeta operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed path or entity, rejected before any write
    #[error("Validation error: {0}")]
    Validation(String),

    /// A unique path (or remote id) would collide with a live entity
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Missing parent folder: {0}")]
    MissingParent(String),

    #[error("Move would create a cycle: {0}")]
    Cycle(String),

    /// The underlying engine is unreachable, busy or corrupt
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures worth retrying once the engine recovers
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match &e {
            rusqlite::Error::SqliteFailure(failure, msg) => {
                let detail = msg.clone().unwrap_or_else(|| failure.to_string());
                match failure.code {
                    ErrorCode::ConstraintViolation => Error::ConstraintViolation(detail),
                    ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::NotADatabase
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::DiskFull
                    | ErrorCode::ReadOnly
                    | ErrorCode::OutOfMemory => Error::StorageUnavailable(detail),
                    _ => Error::Storage(e),
                }
            }
            _ => Error::Storage(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::ffi::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_constraint_classification() {
        let err: Error = sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).into();
        assert!(matches!(err, Error::ConstraintViolation(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unavailable_classification() {
        for code in [rusqlite::ffi::SQLITE_BUSY, rusqlite::ffi::SQLITE_CORRUPT, rusqlite::ffi::SQLITE_CANTOPEN] {
            let err: Error = sqlite_failure(code).into();
            assert!(matches!(err, Error::StorageUnavailable(_)));
            assert!(err.is_transient());
        }
    }

    #[test]
    fn test_other_errors_pass_through() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Storage(_)));
    }
}
