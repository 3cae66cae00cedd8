//! Database schema definitions

/// SQL to create the files table.
///
/// `AUTOINCREMENT` keeps identifiers from being reused after deletion.
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account TEXT NOT NULL,
    remote_id TEXT,
    path TEXT NOT NULL,
    parent_id INTEGER,
    name TEXT NOT NULL,
    is_folder INTEGER NOT NULL DEFAULT 0,
    size INTEGER NOT NULL DEFAULT 0,
    modified INTEGER NOT NULL DEFAULT 0,
    mime_type TEXT,
    etag TEXT,
    synced_folder_flags INTEGER NOT NULL DEFAULT 0,
    last_sync INTEGER NOT NULL DEFAULT 0,
    deleted INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create indexes.
///
/// Uniqueness of paths and remote ids only applies to live rows, so a
/// soft-deleted row never blocks its path from being reused.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_files_path ON files(account, path) WHERE deleted = 0",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_files_remote_id ON files(account, remote_id) WHERE remote_id IS NOT NULL AND deleted = 0",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_files_root ON files(account) WHERE parent_id IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_files_parent ON files(account, parent_id, name)",
];

/// Connection settings applied on open
pub const PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
";

/// Columns selected for every entity read, in `row_to_entity` order
pub const ENTITY_COLUMNS: &str =
    "id, remote_id, path, parent_id, is_folder, size, modified, mime_type, etag, synced_folder_flags, last_sync, deleted";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_FILES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
