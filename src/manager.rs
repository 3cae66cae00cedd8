//! Storage Manager - the façade sync engines and UI adapters talk to
//!
//! The manager owns no durable state. It normalizes and validates requests,
//! applies the parent policy, delegates to the injected [`SqliteStore`] and
//! emits folder-change events once writes have committed.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::entity::{ChildOrder, FileEntity};
use crate::events::{EventSender, StoreEvent};
use crate::path::RemotePath;
use crate::storage::{DbStats, Inconsistency, SqliteStore};
use crate::{Error, Result};

/// What `save_file` does when the parent folder is not stored yet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentPolicy {
    /// Fail with [`Error::MissingParent`]
    #[default]
    Fail,
    /// Create placeholder folders for every missing ancestor
    CreatePlaceholders,
}

#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub parent_policy: ParentPolicy,
    pub order: ChildOrder,
    hidden: Vec<glob::Pattern>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            parent_policy: ParentPolicy::Fail,
            order: ChildOrder::Name,
            hidden: glob::Pattern::new(".*").into_iter().collect(),
        }
    }
}

impl ManagerOptions {
    pub fn new(parent_policy: ParentPolicy, hidden_patterns: &[String]) -> Result<Self> {
        let hidden = hidden_patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| Error::Config(format!("invalid hidden pattern {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            parent_policy,
            order: ChildOrder::Name,
            hidden,
        })
    }

    pub fn with_order(mut self, order: ChildOrder) -> Self {
        self.order = order;
        self
    }

    /// True when a name is filtered from listings that exclude hidden entries
    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.iter().any(|p| p.matches(name))
    }
}

/// How a folder listing is filtered and sorted
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    pub include_hidden: bool,
    pub include_deleted: bool,
    /// Overrides the manager's default ordering
    pub order: Option<ChildOrder>,
}

/// Entry point for everything that reads or writes file metadata
pub struct StorageManager {
    store: Arc<SqliteStore>,
    options: ManagerOptions,
    notifier: Option<EventSender>,
}

impl StorageManager {
    /// Wrap an open store; the caller keeps ownership of its lifecycle
    pub fn new(store: Arc<SqliteStore>, options: ManagerOptions) -> Self {
        Self {
            store,
            options,
            notifier: None,
        }
    }

    /// Emit folder-change events to `notifier`
    pub fn with_notifier(mut self, notifier: EventSender) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn account(&self) -> &str {
        self.store.account()
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    // ========== Lookups ==========

    /// Get the account's root folder, creating it on first access
    pub fn get_root(&self) -> Result<FileEntity> {
        match self.store.root()? {
            Some(root) => Ok(root),
            None => self.store.ensure_root(),
        }
    }

    /// Look up a live entity by path; `/` always resolves to the root
    pub fn get_file_by_path(&self, path: &str) -> Result<Option<FileEntity>> {
        let path = RemotePath::parse(path)?;
        if path.is_root() {
            return self.get_root().map(Some);
        }
        self.store.get_by_path(&path)
    }

    pub fn get_file_by_id(&self, id: i64) -> Result<Option<FileEntity>> {
        self.store.get_by_id(id)
    }

    pub fn get_file_by_remote_id(&self, remote_id: &str) -> Result<Option<FileEntity>> {
        self.store.get_by_remote_id(remote_id)
    }

    /// Direct children of `folder`, hidden names filtered unless `include_hidden`
    pub fn get_folder_content(&self, folder: &FileEntity, include_hidden: bool) -> Result<Vec<FileEntity>> {
        self.list_folder(
            folder,
            ListOptions {
                include_hidden,
                ..ListOptions::default()
            },
        )
    }

    /// Direct children of `folder` with explicit filtering and ordering.
    ///
    /// Files and folders that are not stored list as empty.
    pub fn list_folder(&self, folder: &FileEntity, options: ListOptions) -> Result<Vec<FileEntity>> {
        if !folder.is_folder {
            return Ok(Vec::new());
        }
        let Some(folder_id) = self.resolve_id(folder)? else {
            return Ok(Vec::new());
        };

        let order = options.order.unwrap_or(self.options.order);
        let mut children = self.store.list_children(folder_id, options.include_deleted, order)?;
        if !options.include_hidden {
            children.retain(|child| !self.options.is_hidden(child.name()));
        }
        Ok(children)
    }

    // ========== Writes ==========

    /// Insert or update one entity.
    ///
    /// On success the entity's identifier is set. Missing parents are
    /// handled per [`ParentPolicy`]; placeholders and the entity commit
    /// together.
    pub fn save_file(&self, entity: &mut FileEntity) -> Result<i64> {
        let ids = self.save_files(std::slice::from_mut(entity))?;
        ids.into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(entity.path.to_string()))
    }

    /// Insert or update many entities, parents before children.
    ///
    /// Rows (including placeholder folders) are written in sequential atomic
    /// batches of at most `storage.max_batch_rows`. A failure leaves earlier
    /// batches committed; their entities already carry identifiers.
    pub fn save_files(&self, entities: &mut [FileEntity]) -> Result<Vec<i64>> {
        let root = self.get_root()?;
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        // Planned rows, each with the input position it came from
        let mut rows: Vec<(Option<usize>, FileEntity)> = Vec::with_capacity(entities.len());
        let mut planned: HashSet<RemotePath> = HashSet::new();

        for (pos, entity) in entities.iter().enumerate() {
            if entity.is_root() {
                let mut root_update = entity.clone();
                root_update.id = root.id;
                root_update.parent_id = None;
                rows.push((Some(pos), root_update));
                continue;
            }

            if self.options.parent_policy == ParentPolicy::CreatePlaceholders && entity.parent_id.is_none() {
                for placeholder in self.missing_ancestors(&entity.path, &planned)? {
                    planned.insert(placeholder.clone());
                    rows.push((None, FileEntity::with_path(placeholder, true)));
                }
            }
            if entity.is_folder {
                planned.insert(entity.path.clone());
            }
            rows.push((Some(pos), entity.clone()));
        }

        let chunk_size = self.store.options().max_batch_rows.max(1);
        let mut changed_folders = BTreeSet::new();
        let mut result = vec![0; entities.len()];

        for chunk in rows.chunks(chunk_size) {
            let batch: Vec<FileEntity> = chunk.iter().map(|(_, e)| e.clone()).collect();
            let ids = self.store.batch_insert(&batch)?;

            for ((pos, row), id) in chunk.iter().zip(ids) {
                if let Some(pos) = pos {
                    entities[*pos].id = Some(id);
                    result[*pos] = id;
                }
                if let Some(parent) = row.path.parent() {
                    changed_folders.insert(parent);
                }
            }
        }

        tracing::debug!("Saved {} entities ({} rows)", entities.len(), rows.len());
        self.notify_paths(changed_folders);
        Ok(result)
    }

    /// Ancestors of `path` that are neither stored nor already planned, top-down
    fn missing_ancestors(&self, path: &RemotePath, planned: &HashSet<RemotePath>) -> Result<Vec<RemotePath>> {
        let mut missing = Vec::new();
        let mut ancestor = path.parent();
        while let Some(candidate) = ancestor {
            if candidate.is_root() || planned.contains(&candidate) {
                break;
            }
            if self.store.get_by_path(&candidate)?.is_some() {
                break;
            }
            ancestor = candidate.parent();
            missing.push(candidate);
        }
        missing.reverse();
        Ok(missing)
    }

    /// Apply a server listing of one folder.
    ///
    /// `updated` are direct children to insert or update, `removed` are
    /// direct children to delete with their subtrees. Removals run first.
    /// Work is committed in sequential atomic units of at most
    /// `storage.max_batch_rows` rows; a failure leaves earlier units
    /// committed and their entities already carry identifiers.
    pub fn save_folder_content(
        &self,
        folder: &FileEntity,
        updated: &mut [FileEntity],
        removed: &[FileEntity],
    ) -> Result<Vec<i64>> {
        let folder = self.reload(folder)?;
        if !folder.is_folder {
            return Err(Error::Validation(format!("{} is not a folder", folder.path)));
        }
        let folder_id = folder.id.ok_or_else(|| Error::NotFound(folder.path.to_string()))?;

        let mut removal_ids = Vec::with_capacity(removed.len());
        let mut removed_paths = HashSet::with_capacity(removed.len());
        for child in removed {
            if child.path.parent().as_ref() != Some(&folder.path) {
                return Err(Error::Validation(format!("{} is not inside {}", child.path, folder.path)));
            }
            if let Some(id) = self.resolve_id(child)? {
                removal_ids.push(id);
                removed_paths.insert(child.path.clone());
            }
        }

        for child in updated.iter_mut() {
            if child.path.parent().as_ref() != Some(&folder.path) {
                return Err(Error::Validation(format!("{} is not inside {}", child.path, folder.path)));
            }
            child.parent_id = Some(folder_id);
            if child.id.is_none() && !removed_paths.contains(&child.path) {
                // Re-listed entries keep their identity
                child.id = self.store.get_by_path(&child.path)?.and_then(|e| e.id);
            }
        }

        let chunk_size = self.store.options().max_batch_rows.max(1);
        let mut removals = removal_ids.as_slice();
        let mut offset = 0;
        let mut ids = Vec::with_capacity(updated.len());

        loop {
            let take_removals = removals.len().min(chunk_size);
            let (unit_removals, rest) = removals.split_at(take_removals);
            removals = rest;
            let take_upserts = (chunk_size - take_removals).min(updated.len() - offset);
            let unit = &mut updated[offset..offset + take_upserts];

            let unit_ids = self.store.apply_changes(unit, unit_removals)?;
            for (child, id) in unit.iter_mut().zip(&unit_ids) {
                child.id = Some(*id);
            }
            ids.extend(unit_ids);
            offset += take_upserts;

            if removals.is_empty() && offset == updated.len() {
                break;
            }
        }

        tracing::debug!(
            "Synced folder {}: {} updated, {} removed",
            folder.path,
            ids.len(),
            removal_ids.len()
        );
        self.notify(folder_id, &folder.path);
        Ok(ids)
    }

    /// Remove an entity; `cascade` is required for non-empty folders
    pub fn remove_file(&self, entity: &FileEntity, cascade: bool) -> Result<usize> {
        let entity = self.reload(entity)?;
        let id = entity.id.ok_or_else(|| Error::NotFound(entity.path.to_string()))?;

        let removed = self.store.delete(id, cascade)?;
        self.notify_parent(&entity);
        Ok(removed)
    }

    /// Soft-delete an entity and its subtree
    pub fn mark_file_deleted(&self, entity: &FileEntity) -> Result<usize> {
        let entity = self.reload(entity)?;
        let id = entity.id.ok_or_else(|| Error::NotFound(entity.path.to_string()))?;

        let marked = self.store.mark_deleted(id)?;
        self.notify_parent(&entity);
        Ok(marked)
    }

    /// Remove all soft-deleted rows of the account
    pub fn purge_deleted(&self) -> Result<usize> {
        self.store.purge_deleted()
    }

    /// Move an entity into another folder, keeping its name and identifier
    pub fn move_file(&self, entity: &FileEntity, new_parent: &FileEntity) -> Result<FileEntity> {
        let current = self.reload(entity)?;
        let target = match self.resolve_id(new_parent)? {
            Some(id) => self
                .store
                .get_by_id(id)?
                .ok_or_else(|| Error::MissingParent(new_parent.path.to_string()))?,
            None => return Err(Error::MissingParent(new_parent.path.to_string())),
        };

        if current.is_root() {
            return Err(Error::Validation("root cannot be moved".to_string()));
        }
        if current.id == target.id || current.path.is_ancestor_of(&target.path) {
            return Err(Error::Cycle(format!("{} into {}", current.path, target.path)));
        }
        if !target.is_folder {
            return Err(Error::Validation(format!("{} is not a folder", target.path)));
        }

        let new_path = target.path.join(current.name())?;
        self.relocate(current, new_path, target.id)
    }

    /// Rename an entity inside its folder
    pub fn rename_file(&self, entity: &FileEntity, new_name: &str) -> Result<FileEntity> {
        let current = self.reload(entity)?;
        let parent = current
            .path
            .parent()
            .ok_or_else(|| Error::Validation("root cannot be renamed".to_string()))?;

        let new_path = parent.join(new_name)?;
        let parent_id = current.parent_id;
        self.relocate(current, new_path, parent_id)
    }

    fn relocate(&self, current: FileEntity, new_path: RemotePath, parent_id: Option<i64>) -> Result<FileEntity> {
        if new_path == current.path {
            return Ok(current);
        }
        let old_parent = current.path.parent();

        let mut updated = current.clone();
        updated.path = new_path;
        updated.parent_id = parent_id;
        let id = self.store.insert_or_update(&updated)?;

        tracing::debug!("Relocated {} to {}", current.path, updated.path);
        self.notify_paths(old_parent.into_iter().chain(updated.path.parent()));

        self.store
            .get_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("file id {}", id)))
    }

    // ========== Diagnostics ==========

    pub fn stats(&self) -> Result<DbStats> {
        self.store.stats()
    }

    pub fn check_consistency(&self) -> Result<Vec<Inconsistency>> {
        self.store.check_consistency()
    }

    // ========== Helpers ==========

    /// Identifier of a stored entity, from the value itself or by path
    fn resolve_id(&self, entity: &FileEntity) -> Result<Option<i64>> {
        if let Some(id) = entity.id {
            return Ok(Some(id));
        }
        if entity.is_root() {
            return Ok(self.get_root()?.id);
        }
        Ok(self.store.get_by_path(&entity.path)?.and_then(|e| e.id))
    }

    /// Current stored state of an entity
    fn reload(&self, entity: &FileEntity) -> Result<FileEntity> {
        let stored = match self.resolve_id(entity)? {
            Some(id) => self.store.get_by_id(id)?,
            None => None,
        };
        stored.ok_or_else(|| Error::NotFound(entity.path.to_string()))
    }

    fn notify_parent(&self, entity: &FileEntity) {
        self.notify_paths(entity.path.parent());
    }

    fn notify_paths(&self, folders: impl IntoIterator<Item = RemotePath>) {
        if self.notifier.is_none() {
            return;
        }
        for path in folders {
            match self.store.get_by_path(&path) {
                Ok(Some(folder)) => {
                    if let Some(id) = folder.id {
                        self.notify(id, &folder.path);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("Skipping change event for {}: {}", path, e),
            }
        }
    }

    fn notify(&self, folder_id: i64, folder_path: &RemotePath) {
        if let Some(notifier) = &self.notifier {
            notifier.emit(StoreEvent::FolderContentChanged {
                account: self.store.account().to_string(),
                folder_id,
                folder_path: folder_path.to_string(),
            });
        }
    }
}
