//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with one table:
//! - files(id, account, remote_id, path, parent_id, name, is_folder, size, modified,
//!   mime_type, etag, synced_folder_flags, last_sync, deleted)
//!
//! Rows of several accounts may share a database file; every query is
//! scoped to the account the store was opened for.

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, Inconsistency, SqliteStore, StoreOptions, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_BATCH_ROWS};
