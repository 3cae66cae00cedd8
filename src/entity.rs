//! File entity - the record model for one file or folder known locally
//!
//! Entities reference their folder by identifier only; parent/child
//! relationships are resolved through the store, never through
//! in-memory back references.

use crate::path::RemotePath;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One file or folder mirrored from the server.
///
/// Setters only change this value. Nothing is written until the entity is
/// handed to the [`StorageManager`](crate::StorageManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntity {
    /// Internal identifier, assigned on first persistence
    pub id: Option<i64>,
    /// Server-assigned identifier, unset until first sync
    pub remote_id: Option<String>,
    /// Normalized absolute path
    pub path: RemotePath,
    /// Containing folder, `None` for root (or when it should be resolved from the path)
    pub parent_id: Option<i64>,
    pub is_folder: bool,
    /// Size in bytes
    pub size: u64,
    /// Last modification on the server, milliseconds since the epoch
    pub modification_timestamp: i64,
    pub mime_type: Option<String>,
    pub etag: Option<String>,
    /// Opaque flags owned by the synced-folder feature
    pub synced_folder_flags: u32,
    /// When this record was last refreshed from the server, milliseconds since the epoch
    pub last_sync_timestamp: i64,
    /// Soft-deleted marker, only ever true on rows listed with deleted rows included
    pub deleted: bool,
}

impl FileEntity {
    /// Create an entity from a path string.
    ///
    /// A trailing separator marks a folder: `/Photos/` is a folder,
    /// `/Photos` a file. The root path is always a folder.
    pub fn new(path: &str) -> Result<Self> {
        let is_folder = path.len() > 1 && path.ends_with(crate::path::SEPARATOR);
        let path = RemotePath::parse(path)?;
        let is_folder = is_folder || path.is_root();
        Ok(Self::with_path(path, is_folder))
    }

    /// Create a file entity
    pub fn file(path: &str) -> Result<Self> {
        let path = RemotePath::parse(path)?;
        if path.is_root() {
            return Err(Error::Validation("root cannot be a file".to_string()));
        }
        Ok(Self::with_path(path, false))
    }

    /// Create a folder entity
    pub fn folder(path: &str) -> Result<Self> {
        Ok(Self::with_path(RemotePath::parse(path)?, true))
    }

    /// The root folder of an account
    pub fn root() -> Self {
        Self::with_path(RemotePath::root(), true)
    }

    pub(crate) fn with_path(path: RemotePath, is_folder: bool) -> Self {
        Self {
            id: None,
            remote_id: None,
            path,
            parent_id: None,
            is_folder,
            size: 0,
            modification_timestamp: 0,
            mime_type: None,
            etag: None,
            synced_folder_flags: 0,
            last_sync_timestamp: 0,
            deleted: false,
        }
    }

    /// Entity name, the last path segment
    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn is_root(&self) -> bool {
        self.path.is_root()
    }

    pub fn set_parent_id(&mut self, parent_id: i64) {
        self.parent_id = Some(parent_id);
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn set_etag(&mut self, etag: impl Into<String>) {
        self.etag = Some(etag.into());
    }

    pub fn set_remote_id(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
    }

    pub fn set_modification_timestamp(&mut self, timestamp: i64) {
        self.modification_timestamp = timestamp;
    }

    pub fn set_mime_type(&mut self, mime_type: impl Into<String>) {
        self.mime_type = Some(mime_type.into());
    }

    pub fn set_synced_folder_flags(&mut self, flags: u32) {
        self.synced_folder_flags = flags;
    }

    pub fn set_last_sync_timestamp(&mut self, timestamp: i64) {
        self.last_sync_timestamp = timestamp;
    }

    /// Point the entity at a new path, keeping its identity.
    ///
    /// The parent is cleared so the store resolves it from the new path.
    pub fn set_path(&mut self, path: RemotePath) {
        if self.path.parent() != path.parent() {
            self.parent_id = None;
        }
        self.path = path;
    }

    /// Set the parent folder
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the size in bytes
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the server etag
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Set the server identifier
    pub fn with_remote_id(mut self, remote_id: impl Into<String>) -> Self {
        self.remote_id = Some(remote_id.into());
        self
    }

    /// Set the MIME type
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the modification timestamp
    pub fn with_modification_timestamp(mut self, timestamp: i64) -> Self {
        self.modification_timestamp = timestamp;
        self
    }
}

/// Ordering applied to a folder listing.
///
/// Every variant breaks ties by identifier so listings are stable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildOrder {
    #[default]
    Name,
    NameDesc,
    /// Folders before files, each group by name
    FoldersFirst,
    /// Most recently modified first
    NewestFirst,
    /// Largest first
    LargestFirst,
}

impl ChildOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildOrder::Name => "name",
            ChildOrder::NameDesc => "name_desc",
            ChildOrder::FoldersFirst => "folders_first",
            ChildOrder::NewestFirst => "newest_first",
            ChildOrder::LargestFirst => "largest_first",
        }
    }

    /// SQL ordering clause for the `files` table
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            ChildOrder::Name => "name ASC, id ASC",
            ChildOrder::NameDesc => "name DESC, id ASC",
            ChildOrder::FoldersFirst => "is_folder DESC, name ASC, id ASC",
            ChildOrder::NewestFirst => "modified DESC, id ASC",
            ChildOrder::LargestFirst => "size DESC, id ASC",
        }
    }

    pub fn all() -> &'static [ChildOrder] {
        &[
            ChildOrder::Name,
            ChildOrder::NameDesc,
            ChildOrder::FoldersFirst,
            ChildOrder::NewestFirst,
            ChildOrder::LargestFirst,
        ]
    }
}

impl FromStr for ChildOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "name" | "name_asc" => Ok(ChildOrder::Name),
            "name_desc" => Ok(ChildOrder::NameDesc),
            "folders_first" | "folders" => Ok(ChildOrder::FoldersFirst),
            "newest_first" | "newest" | "modified" => Ok(ChildOrder::NewestFirst),
            "largest_first" | "largest" | "size" => Ok(ChildOrder::LargestFirst),
            _ => Err(Error::Validation(format!("Unknown ordering: {}", s))),
        }
    }
}

impl std::fmt::Display for ChildOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
