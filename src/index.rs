//! Path Index - cached path → identifier resolution
//!
//! The index is a cache over the store, never a source of truth: every hit
//! is verified against storage before it is returned, misses fall back to
//! walking the tree from the deepest cached ancestor, and any entry may be
//! dropped at any time.

use std::collections::BTreeMap;
use crate::path::RemotePath;
use crate::Result;

/// Default number of cached paths before the index is cleared
pub const DEFAULT_PATH_CACHE_CAPACITY: usize = 10_000;

/// Storage-side lookups the index falls back to.
///
/// Implemented by the SQLite store for a single account scope.
pub trait TreeLookup {
    /// Identifier of the account's root folder
    fn root_id(&self) -> Result<Option<i64>>;

    /// Identifier of the live child `name` of folder `parent_id`
    fn child_id(&self, parent_id: i64, name: &str) -> Result<Option<i64>>;

    /// Current path of a live entity
    fn live_path(&self, id: i64) -> Result<Option<String>>;
}

/// Ordered map of resolved paths.
///
/// Ordering keeps every cached descendant of a path in one contiguous
/// range, so subtree invalidation never scans unrelated entries.
#[derive(Debug)]
pub struct PathIndex {
    entries: BTreeMap<String, i64>,
    capacity: usize,
}

impl Default for PathIndex {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_CACHE_CAPACITY)
    }
}

impl PathIndex {
    /// Create an empty index holding at most `capacity` paths
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached identifier, unverified
    pub fn get(&self, path: &RemotePath) -> Option<i64> {
        self.entries.get(path.as_str()).copied()
    }

    /// Record a resolved path
    pub fn insert(&mut self, path: &RemotePath, id: i64) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(path.as_str()) {
            tracing::debug!("Path index full ({} entries), clearing", self.entries.len());
            self.entries.clear();
        }
        self.entries.insert(path.as_str().to_string(), id);
    }

    /// Drop a path and every cached path below it
    pub fn invalidate(&mut self, path: &RemotePath) {
        if path.is_root() {
            self.entries.clear();
            return;
        }

        self.entries.remove(path.as_str());
        let prefix = path.descendant_prefix();
        let doomed: Vec<String> = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in doomed {
            self.entries.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resolve a path to a live identifier.
    ///
    /// A cached entry is returned only after `lookup` confirms it still
    /// names a live entity at that path; stale entries are dropped.
    pub fn resolve(&mut self, lookup: &impl TreeLookup, path: &RemotePath) -> Result<Option<i64>> {
        if let Some(id) = self.verified(lookup, path)? {
            tracing::trace!("Path index hit: {}", path);
            return Ok(Some(id));
        }

        // Deepest verified ancestor, falling back to the root
        let mut start: Option<(RemotePath, i64)> = None;
        let mut ancestor = path.parent();
        while let Some(candidate) = ancestor {
            if let Some(id) = self.verified(lookup, &candidate)? {
                start = Some((candidate, id));
                break;
            }
            ancestor = candidate.parent();
        }

        let (mut current_path, mut current_id) = match start {
            Some(found) => found,
            None => match lookup.root_id()? {
                Some(root_id) => {
                    let root = RemotePath::root();
                    self.insert(&root, root_id);
                    (root, root_id)
                }
                None => return Ok(None),
            },
        };

        let skip = current_path.depth();
        for segment in path.segments().skip(skip) {
            let Some(child) = lookup.child_id(current_id, segment)? else {
                return Ok(None);
            };
            current_path = current_path.join(segment)?;
            current_id = child;
            self.insert(&current_path, current_id);
        }

        Ok(Some(current_id))
    }

    fn verified(&mut self, lookup: &impl TreeLookup, path: &RemotePath) -> Result<Option<i64>> {
        let Some(id) = self.get(path) else {
            return Ok(None);
        };
        match lookup.live_path(id)? {
            Some(current) if current == path.as_str() => Ok(Some(id)),
            _ => {
                self.invalidate(path);
                Ok(None)
            }
        }
    }
}
