//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use crate::entity::{ChildOrder, FileEntity};
use crate::index::{PathIndex, TreeLookup, DEFAULT_PATH_CACHE_CAPACITY};
use crate::path::RemotePath;
use crate::{Error, Result};
use super::schema;

/// Largest number of rows one `batch_insert` may touch.
///
/// One batch is one write transaction and holds the database write lock
/// for its whole duration; 500 rows keeps that window short enough for
/// interactive readers on mobile-class storage. Callers with more rows
/// split them into sequential batches (see `StorageManager::save_files`).
pub const DEFAULT_MAX_BATCH_ROWS: usize = 500;

/// Default wait on a locked database before a write gives up
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Recursive selection of every row below `?1` in account `?2`
const SUBTREE_CTE: &str = r#"
WITH RECURSIVE subtree(id) AS (
    SELECT id FROM files WHERE account = ?2 AND parent_id = ?1
    UNION ALL
    SELECT f.id FROM files f JOIN subtree s ON f.parent_id = s.id WHERE f.account = ?2
)
"#;

/// Tunables for a store instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub max_batch_rows: usize,
    pub path_cache_capacity: usize,
    /// How long a write waits on another connection's lock before failing
    /// with `StorageUnavailable`
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
            path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

/// Connection and the path cache it feeds, guarded together so no
/// reader sees a cache entry for a row mid-write.
struct Inner {
    conn: Connection,
    index: PathIndex,
}

/// SQLite-backed storage for one account's file tree
pub struct SqliteStore {
    account: String,
    options: StoreOptions,
    inner: Mutex<Inner>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, account: &str, options: StoreOptions) -> Result<Self> {
        tracing::info!("Opening file store {:?} for account {}", path, account);
        let conn = Connection::open(path)?;
        Self::with_connection(conn, account, options)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(account: &str) -> Result<Self> {
        Self::open_in_memory_with(account, StoreOptions::default())
    }

    pub fn open_in_memory_with(account: &str, options: StoreOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, account, options)
    }

    fn with_connection(conn: Connection, account: &str, options: StoreOptions) -> Result<Self> {
        if account.trim().is_empty() {
            return Err(Error::Validation("account must not be empty".to_string()));
        }
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(schema::PRAGMAS)?;
        Self::initialize_schema(&conn)?;

        let index = PathIndex::new(options.path_cache_capacity);
        Ok(Self {
            account: account.to_string(),
            options,
            inner: Mutex::new(Inner { conn, index }),
        })
    }

    /// Initialize the database schema
    fn initialize_schema(conn: &Connection) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Account scope this store reads and writes
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Acquire the connection.
    ///
    /// A panic mid-operation drops its transaction (rolling it back) before
    /// the lock is released, so a poisoned lock still guards a consistent
    /// database. The cache is cleared since it may have been half-updated.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("File store lock was poisoned, recovering");
            let mut guard = poisoned.into_inner();
            guard.index.clear();
            guard
        })
    }

    /// Run `f` inside one IMMEDIATE transaction.
    ///
    /// On any failure nothing is committed and the path cache is dropped,
    /// since it may hold entries for rows that were rolled back.
    fn write<T>(&self, f: impl FnOnce(&Scope<'_>, &mut PathIndex) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let Inner { conn, index } = &mut *guard;

        let result = (|| -> Result<T> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let value = f(&Scope { conn: &tx, account: &self.account }, index)?;
            tx.commit()?;
            Ok(value)
        })();

        if result.is_err() {
            index.clear();
        }
        result
    }

    fn read<T>(&self, f: impl FnOnce(&Scope<'_>, &mut PathIndex) -> Result<T>) -> Result<T> {
        let mut guard = self.lock();
        let Inner { conn, index } = &mut *guard;
        f(&Scope { conn, account: &self.account }, index)
    }

    // ========== Root ==========

    /// Get the root folder, creating it if absent
    pub fn ensure_root(&self) -> Result<FileEntity> {
        self.write(|scope, index| {
            if let Some(root) = scope.root()? {
                return Ok(root);
            }
            let root = FileEntity::root();
            let id = scope.insert_row(&root, None)?;
            index.insert(&root.path, id);
            tracing::debug!("Created root folder for account {} (id {})", scope.account, id);
            scope.get_live(id)?
                .ok_or_else(|| Error::NotFound(format!("root of {}", scope.account)))
        })
    }

    /// Get the root folder if it exists
    pub fn root(&self) -> Result<Option<FileEntity>> {
        self.read(|scope, _| scope.root())
    }

    // ========== Entity Operations ==========

    /// Insert a new entity or update the row with its identifier.
    ///
    /// Returns the entity's identifier.
    pub fn insert_or_update(&self, entity: &FileEntity) -> Result<i64> {
        self.write(|scope, index| scope.write_entity(entity, index))
    }

    /// Apply many inserts/updates as one atomic unit.
    ///
    /// Entities without a parent identifier have their parent resolved by
    /// path, which may be a folder created earlier in the same batch.
    pub fn batch_insert(&self, entities: &[FileEntity]) -> Result<Vec<i64>> {
        self.check_batch_size(entities.len())?;
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.write(|scope, index| {
            entities
                .iter()
                .map(|entity| scope.write_entity(entity, index))
                .collect::<Result<Vec<_>>>()
        })?;
        tracing::debug!("Batch wrote {} entities", ids.len());
        Ok(ids)
    }

    /// Apply upserts and cascading removals as one atomic unit.
    ///
    /// Removals run first so an upsert may reuse a removed path.
    pub fn apply_changes(&self, upserts: &[FileEntity], removals: &[i64]) -> Result<Vec<i64>> {
        self.check_batch_size(upserts.len() + removals.len())?;

        self.write(|scope, index| {
            for id in removals {
                scope.delete_entity(*id, true, index)?;
            }
            upserts
                .iter()
                .map(|entity| scope.write_entity(entity, index))
                .collect::<Result<Vec<_>>>()
        })
    }

    fn check_batch_size(&self, rows: usize) -> Result<()> {
        if rows > self.options.max_batch_rows {
            return Err(Error::Validation(format!(
                "batch of {} rows exceeds the limit of {}",
                rows, self.options.max_batch_rows
            )));
        }
        Ok(())
    }

    /// Get a live entity by identifier
    pub fn get_by_id(&self, id: i64) -> Result<Option<FileEntity>> {
        self.read(|scope, _| scope.get_live(id))
    }

    /// Get a live entity by normalized path
    pub fn get_by_path(&self, path: &RemotePath) -> Result<Option<FileEntity>> {
        self.read(|scope, index| match index.resolve(scope, path)? {
            Some(id) => scope.get_live(id),
            None => Ok(None),
        })
    }

    /// Get a live entity by its server identifier
    pub fn get_by_remote_id(&self, remote_id: &str) -> Result<Option<FileEntity>> {
        self.read(|scope, _| {
            scope
                .conn
                .query_row(
                    &format!(
                        "SELECT {} FROM files WHERE account = ?1 AND remote_id = ?2 AND deleted = 0",
                        schema::ENTITY_COLUMNS
                    ),
                    params![scope.account, remote_id],
                    row_to_entity,
                )
                .optional()
                .map_err(Into::into)
        })
    }

    /// List the direct children of a folder
    pub fn list_children(
        &self,
        parent_id: i64,
        include_deleted: bool,
        order: ChildOrder,
    ) -> Result<Vec<FileEntity>> {
        self.read(|scope, _| {
            let sql = format!(
                "SELECT {} FROM files WHERE account = ?1 AND parent_id = ?2 {} ORDER BY {}",
                schema::ENTITY_COLUMNS,
                if include_deleted { "" } else { "AND deleted = 0" },
                order.order_by()
            );
            let mut stmt = scope.conn.prepare_cached(&sql)?;
            let children = stmt
                .query_map(params![scope.account, parent_id], row_to_entity)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(children)
        })
    }

    /// Remove an entity, and with `cascade` everything below it.
    ///
    /// Returns the number of rows removed.
    pub fn delete(&self, id: i64, cascade: bool) -> Result<usize> {
        self.write(|scope, index| scope.delete_entity(id, cascade, index))
    }

    /// Soft-delete an entity and its subtree.
    ///
    /// Marked rows vanish from lookups and free their paths until
    /// [`purge_deleted`](Self::purge_deleted) removes them.
    pub fn mark_deleted(&self, id: i64) -> Result<usize> {
        self.write(|scope, index| {
            let entity = scope
                .get_live(id)?
                .ok_or_else(|| Error::NotFound(format!("file id {}", id)))?;
            if entity.is_root() {
                return Err(Error::Validation("root cannot be deleted".to_string()));
            }

            let marked = scope.conn.execute(
                &format!(
                    "{} UPDATE files SET deleted = 1 WHERE account = ?2 AND (id = ?1 OR id IN (SELECT id FROM subtree))",
                    SUBTREE_CTE
                ),
                params![id, scope.account],
            )?;
            index.invalidate(&entity.path);
            tracing::debug!("Marked {} rows deleted under {}", marked, entity.path);
            Ok(marked)
        })
    }

    /// Remove every soft-deleted row of this account
    pub fn purge_deleted(&self) -> Result<usize> {
        self.write(|scope, _| {
            let purged = scope.conn.execute(
                "DELETE FROM files WHERE account = ?1 AND deleted = 1",
                [scope.account],
            )?;
            Ok(purged)
        })
    }

    // ========== Diagnostics ==========

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.read(|scope, index| {
            let (files, folders, deleted) = scope.conn.query_row(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN deleted = 0 AND is_folder = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN deleted = 0 AND is_folder = 1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(deleted), 0)
                FROM files WHERE account = ?1
                "#,
                [scope.account],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)),
            )?;
            Ok(DbStats {
                files: files as usize,
                folders: folders as usize,
                deleted: deleted as usize,
                cached_paths: index.len(),
            })
        })
    }

    /// Re-derive every live path from its parent chain and report mismatches
    pub fn check_consistency(&self) -> Result<Vec<Inconsistency>> {
        use std::collections::HashMap;

        self.read(|scope, _| {
            let mut stmt = scope.conn.prepare(
                "SELECT id, parent_id, path, is_folder FROM files WHERE account = ?1 AND deleted = 0",
            )?;
            let rows: HashMap<i64, (Option<i64>, String, bool)> = stmt
                .query_map([scope.account], |row| {
                    Ok((row.get(0)?, (row.get(1)?, row.get(2)?, row.get(3)?)))
                })?
                .collect::<rusqlite::Result<_>>()?;

            let mut problems = Vec::new();
            let roots = rows.values().filter(|(parent, _, _)| parent.is_none()).count();
            if roots != 1 {
                problems.push(Inconsistency::RootCount(roots));
            }

            for (id, (parent_id, path, _)) in &rows {
                let Some(parent_id) = parent_id else {
                    if path != "/" {
                        problems.push(Inconsistency::PathMismatch {
                            id: *id,
                            stored: path.clone(),
                            expected: "/".to_string(),
                        });
                    }
                    continue;
                };
                let Some((_, parent_path, parent_is_folder)) = rows.get(parent_id) else {
                    problems.push(Inconsistency::Orphan { id: *id, path: path.clone() });
                    continue;
                };
                if !parent_is_folder {
                    problems.push(Inconsistency::ParentNotFolder { id: *id, path: path.clone() });
                }
                let name = path.rsplit('/').next().unwrap_or_default();
                let expected = RemotePath::parse(parent_path).and_then(|p| p.join(name));
                match expected {
                    Ok(expected) if expected.as_str() == path => {}
                    Ok(expected) => problems.push(Inconsistency::PathMismatch {
                        id: *id,
                        stored: path.clone(),
                        expected: expected.to_string(),
                    }),
                    Err(_) => problems.push(Inconsistency::PathMismatch {
                        id: *id,
                        stored: path.clone(),
                        expected: format!("{}/{}", parent_path.trim_end_matches('/'), name),
                    }),
                }
            }
            Ok(problems)
        })
    }

}

/// One account's view of a connection or open transaction
struct Scope<'a> {
    conn: &'a Connection,
    account: &'a str,
}

impl Scope<'_> {
    fn root(&self) -> Result<Option<FileEntity>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM files WHERE account = ?1 AND parent_id IS NULL",
                    schema::ENTITY_COLUMNS
                ),
                [self.account],
                row_to_entity,
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_live(&self, id: i64) -> Result<Option<FileEntity>> {
        self.conn
            .prepare_cached(&format!(
                "SELECT {} FROM files WHERE id = ?1 AND account = ?2 AND deleted = 0",
                schema::ENTITY_COLUMNS
            ))?
            .query_row(params![id, self.account], row_to_entity)
            .optional()
            .map_err(Into::into)
    }

    /// Insert a row, returning its new identifier
    fn insert_row(&self, entity: &FileEntity, parent_id: Option<i64>) -> Result<i64> {
        self.conn
            .prepare_cached(
                r#"
                INSERT INTO files (account, remote_id, path, parent_id, name, is_folder, size, modified,
                                   mime_type, etag, synced_folder_flags, last_sync)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )?
            .execute(params![
                self.account,
                entity.remote_id,
                entity.path.as_str(),
                parent_id,
                entity.name(),
                entity.is_folder,
                stored_size(entity)?,
                entity.modification_timestamp,
                entity.mime_type,
                entity.etag,
                entity.synced_folder_flags,
                entity.last_sync_timestamp,
            ])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_row(&self, id: i64, entity: &FileEntity, parent_id: i64) -> Result<()> {
        self.conn
            .prepare_cached(
                r#"
                UPDATE files SET remote_id = ?3, path = ?4, parent_id = ?5, name = ?6, is_folder = ?7,
                                 size = ?8, modified = ?9, mime_type = ?10, etag = ?11,
                                 synced_folder_flags = ?12, last_sync = ?13
                WHERE id = ?1 AND account = ?2
                "#,
            )?
            .execute(params![
                id,
                self.account,
                entity.remote_id,
                entity.path.as_str(),
                parent_id,
                entity.name(),
                entity.is_folder,
                stored_size(entity)?,
                entity.modification_timestamp,
                entity.mime_type,
                entity.etag,
                entity.synced_folder_flags,
                entity.last_sync_timestamp,
            ])?;
        Ok(())
    }

    /// Resolve and validate the folder an entity is written into
    fn resolve_parent(&self, entity: &FileEntity, index: &mut PathIndex) -> Result<FileEntity> {
        let parent_path = entity
            .path
            .parent()
            .ok_or_else(|| Error::Validation("root has no parent".to_string()))?;

        let parent = match entity.parent_id {
            Some(parent_id) => self
                .get_live(parent_id)?
                .ok_or_else(|| Error::MissingParent(format!("folder id {}", parent_id)))?,
            None => match index.resolve(self, &parent_path)? {
                Some(parent_id) => self
                    .get_live(parent_id)?
                    .ok_or_else(|| Error::MissingParent(parent_path.to_string()))?,
                None => return Err(Error::MissingParent(parent_path.to_string())),
            },
        };

        if !parent.is_folder {
            return Err(Error::Validation(format!("{} is not a folder", parent.path)));
        }
        if parent.path != parent_path {
            return Err(Error::Validation(format!(
                "{} is not a direct child of {}",
                entity.path, parent.path
            )));
        }
        Ok(parent)
    }

    /// Insert or update one entity inside the current transaction
    fn write_entity(&self, entity: &FileEntity, index: &mut PathIndex) -> Result<i64> {
        if entity.is_root() {
            return self.write_root(entity);
        }
        let parent = self.resolve_parent(entity, index)?;
        let parent_id = parent.id.ok_or_else(|| Error::NotFound(parent.path.to_string()))?;

        let Some(id) = entity.id else {
            let id = self.insert_row(entity, Some(parent_id))?;
            index.insert(&entity.path, id);
            tracing::trace!("Inserted {} (id {})", entity.path, id);
            return Ok(id);
        };

        let existing = self
            .get_live(id)?
            .ok_or_else(|| Error::NotFound(format!("file id {}", id)))?;
        if existing.is_root() {
            return Err(Error::Validation("root cannot be moved".to_string()));
        }
        if existing.path.is_ancestor_of(&entity.path) {
            return Err(Error::Cycle(format!("{} into {}", existing.path, entity.path)));
        }
        if existing.is_folder && !entity.is_folder && self.has_children(id)? {
            return Err(Error::Validation(format!(
                "{} has children and cannot become a file",
                existing.path
            )));
        }

        self.update_row(id, entity, parent_id)?;

        if existing.path != entity.path {
            let moved = self.rebase_subtree(id, &existing.path, &entity.path)?;
            index.invalidate(&existing.path);
            index.invalidate(&entity.path);
            tracing::debug!(
                "Moved {} to {} ({} descendants)",
                existing.path, entity.path, moved
            );
        }
        index.insert(&entity.path, id);
        Ok(id)
    }

    /// Only the root's metadata may change, its place in the tree is fixed
    fn write_root(&self, entity: &FileEntity) -> Result<i64> {
        if entity.parent_id.is_some() {
            return Err(Error::Validation("root cannot have a parent".to_string()));
        }
        let Some(id) = entity.id else {
            return Err(Error::ConstraintViolation(format!(
                "root already exists for {}",
                self.account
            )));
        };
        let updated = self.conn.execute(
            "UPDATE files SET remote_id = ?3, etag = ?4, size = ?5, modified = ?6, last_sync = ?7, \
             mime_type = ?8, synced_folder_flags = ?9 \
             WHERE id = ?1 AND account = ?2 AND parent_id IS NULL",
            params![
                id,
                self.account,
                entity.remote_id,
                entity.etag,
                stored_size(entity)?,
                entity.modification_timestamp,
                entity.last_sync_timestamp,
                entity.mime_type,
                entity.synced_folder_flags,
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("root id {}", id)));
        }
        Ok(id)
    }

    fn has_children(&self, id: i64) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM files WHERE account = ?1 AND parent_id = ?2)",
            params![self.account, id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Rewrite the paths of everything below `id` after it moved
    fn rebase_subtree(&self, id: i64, old: &RemotePath, new: &RemotePath) -> Result<usize> {
        let rows = self.conn.execute(
            &format!(
                "{} UPDATE files SET path = ?4 || substr(path, length(?3) + 1) \
                 WHERE account = ?2 AND id IN (SELECT id FROM subtree)",
                SUBTREE_CTE
            ),
            params![id, self.account, old.descendant_prefix(), new.descendant_prefix()],
        )?;
        Ok(rows)
    }

    /// Delete one row (or a subtree) inside the current transaction
    fn delete_entity(&self, id: i64, cascade: bool, index: &mut PathIndex) -> Result<usize> {
        let entity = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM files WHERE id = ?1 AND account = ?2",
                    schema::ENTITY_COLUMNS
                ),
                params![id, self.account],
                row_to_entity,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("file id {}", id)))?;
        if entity.is_root() && !entity.deleted {
            return Err(Error::Validation("root cannot be deleted".to_string()));
        }

        let mut removed = 0;
        if self.has_children(id)? {
            if !cascade {
                return Err(Error::ConstraintViolation(format!("folder {} is not empty", entity.path)));
            }
            removed += self.conn.execute(
                &format!(
                    "{} DELETE FROM files WHERE account = ?2 AND id IN (SELECT id FROM subtree)",
                    SUBTREE_CTE
                ),
                params![id, self.account],
            )?;
        }
        removed += self.conn.execute(
            "DELETE FROM files WHERE id = ?1 AND account = ?2",
            params![id, self.account],
        )?;

        if !entity.deleted {
            index.invalidate(&entity.path);
        }
        tracing::debug!("Deleted {} ({} rows)", entity.path, removed);
        Ok(removed)
    }
}

impl TreeLookup for Scope<'_> {
    fn root_id(&self) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM files WHERE account = ?1 AND parent_id IS NULL",
                [self.account],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn child_id(&self, parent_id: i64, name: &str) -> Result<Option<i64>> {
        self.conn
            .prepare_cached(
                "SELECT id FROM files WHERE account = ?1 AND parent_id = ?2 AND name = ?3 AND deleted = 0",
            )?
            .query_row(params![self.account, parent_id, name], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn live_path(&self, id: i64) -> Result<Option<String>> {
        self.conn
            .prepare_cached("SELECT path FROM files WHERE id = ?1 AND account = ?2 AND deleted = 0")?
            .query_row(params![id, self.account], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }
}

/// SQLite integers are signed; sizes past `i64::MAX` cannot round-trip
fn stored_size(entity: &FileEntity) -> Result<i64> {
    i64::try_from(entity.size).map_err(|_| {
        Error::Validation(format!("{}: size {} is out of range", entity.path, entity.size))
    })
}

/// Helper to convert a row to a FileEntity
fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<FileEntity> {
    let path_str: String = row.get(2)?;
    let path = RemotePath::parse(&path_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let size: i64 = row.get(5)?;
    let size = u64::try_from(size).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Integer, Box::new(e))
    })?;

    Ok(FileEntity {
        id: Some(row.get(0)?),
        remote_id: row.get(1)?,
        path,
        parent_id: row.get(3)?,
        is_folder: row.get(4)?,
        size,
        modification_timestamp: row.get(6)?,
        mime_type: row.get(7)?,
        etag: row.get(8)?,
        synced_folder_flags: row.get(9)?,
        last_sync_timestamp: row.get(10)?,
        deleted: row.get(11)?,
    })
}

/// A live row whose place in the tree does not match its stored path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// Number of roots is not exactly one
    RootCount(usize),
    Orphan { id: i64, path: String },
    ParentNotFolder { id: i64, path: String },
    PathMismatch { id: i64, stored: String, expected: String },
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inconsistency::RootCount(n) => write!(f, "expected one root, found {}", n),
            Inconsistency::Orphan { id, path } => write!(f, "#{} {} has no live parent", id, path),
            Inconsistency::ParentNotFolder { id, path } => {
                write!(f, "#{} {} is inside a file", id, path)
            }
            Inconsistency::PathMismatch { id, stored, expected } => {
                write!(f, "#{} stored as {} but derives to {}", id, stored, expected)
            }
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub files: usize,
    pub folders: usize,
    pub deleted: usize,
    pub cached_paths: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Files: {}", self.files)?;
        writeln!(f, "  Folders: {}", self.folders)?;
        writeln!(f, "  Deleted: {}", self.deleted)?;
        writeln!(f, "  Cached paths: {}", self.cached_paths)
    }
}
