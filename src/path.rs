//! Remote paths - normalized, slash-delimited locations in an account's tree
//!
//! Format: `/<segment>/<segment>/...`, root is `/`.
//!
//! Examples:
//! - `/`
//! - `/Photos/2024/beach.jpg`
//! - `/Documents` (never `/Documents/`)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Path separator used by the server and in stored rows.
pub const SEPARATOR: char = '/';

/// A normalized absolute path inside one account's file tree.
///
/// Construction always normalizes, so two `RemotePath`s compare equal
/// exactly when they address the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RemotePath(String);

impl RemotePath {
    /// The root path `/`
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Parse and normalize a path string.
    ///
    /// Runs of separators collapse into one and a single trailing separator
    /// is dropped. Empty input, relative paths, `.`/`..` segments and
    /// segments containing NUL are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::Validation("path must not be empty".to_string()));
        }
        if !path.starts_with(SEPARATOR) {
            return Err(Error::Validation(format!("path must start with '/': {}", path)));
        }

        let mut normalized = String::with_capacity(path.len());
        for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
            validate_segment(segment)?;
            normalized.push(SEPARATOR);
            normalized.push_str(segment);
        }

        if normalized.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self(normalized))
    }

    /// Build a child path below this one
    pub fn join(&self, name: &str) -> Result<Self> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(Error::Validation(format!("invalid name: {:?}", name)));
        }
        validate_segment(name)?;

        let mut path = self.0.clone();
        if !self.is_root() {
            path.push(SEPARATOR);
        }
        path.push_str(name);
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Parent path, `None` for root
    pub fn parent(&self) -> Option<RemotePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Last segment, empty for root
    pub fn name(&self) -> &str {
        match self.0.rfind(SEPARATOR) {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Segments from the root down, root itself has none
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments below root
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// True when `other` lies strictly below this path
    pub fn is_ancestor_of(&self, other: &RemotePath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == SEPARATOR as u8
    }

    /// Prefix used to select descendants with a plain string comparison
    pub fn descendant_prefix(&self) -> String {
        if self.is_root() {
            self.0.clone()
        } else {
            format!("{}{}", self.0, SEPARATOR)
        }
    }

    /// Re-home a path from below `old_prefix` to below `new_prefix`.
    ///
    /// Returns `None` when this path is neither `old_prefix` nor below it.
    pub fn rebase(&self, old_prefix: &RemotePath, new_prefix: &RemotePath) -> Option<RemotePath> {
        if self == old_prefix {
            return Some(new_prefix.clone());
        }
        if !old_prefix.is_ancestor_of(self) {
            return None;
        }
        let rest = &self.0[old_prefix.descendant_prefix().len()..];
        let mut path = new_prefix.descendant_prefix();
        path.push_str(rest);
        Some(Self(path))
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment == "." || segment == ".." {
        return Err(Error::Validation(format!("relative segment not allowed: {}", segment)));
    }
    if segment.contains('\0') {
        return Err(Error::Validation("path segment contains NUL".to_string()));
    }
    Ok(())
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemotePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for RemotePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for RemotePath {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RemotePath {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RemotePath::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(RemotePath::parse("/").unwrap().as_str(), "/");
        assert_eq!(RemotePath::parse("///").unwrap().as_str(), "/");
        assert_eq!(RemotePath::parse("/a//b///c").unwrap().as_str(), "/a/b/c");
        assert_eq!(RemotePath::parse("/Documents/").unwrap().as_str(), "/Documents");
    }

    #[test]
    fn test_invalid_paths() {
        assert!(RemotePath::parse("").is_err());
        assert!(RemotePath::parse("relative/path").is_err());
        assert!(RemotePath::parse("/a/../b").is_err());
        assert!(RemotePath::parse("/a/./b").is_err());
        assert!(matches!(RemotePath::parse("/a\0b"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_parent_and_name() {
        let path = RemotePath::parse("/Photos/2024/beach.jpg").unwrap();
        assert_eq!(path.name(), "beach.jpg");
        assert_eq!(path.parent().unwrap().as_str(), "/Photos/2024");
        assert_eq!(RemotePath::parse("/top").unwrap().parent().unwrap(), RemotePath::root());
        assert!(RemotePath::root().parent().is_none());
        assert_eq!(RemotePath::root().name(), "");
    }

    #[test]
    fn test_join() {
        let root = RemotePath::root();
        let docs = root.join("Documents").unwrap();
        assert_eq!(docs.as_str(), "/Documents");
        assert_eq!(docs.join("cv.pdf").unwrap().as_str(), "/Documents/cv.pdf");
        assert!(docs.join("a/b").is_err());
        assert!(docs.join("").is_err());
        assert!(docs.join("..").is_err());
    }

    #[test]
    fn test_ancestry() {
        let a = RemotePath::parse("/a").unwrap();
        let ab = RemotePath::parse("/a/b").unwrap();
        let abc = RemotePath::parse("/abc").unwrap();

        assert!(a.is_ancestor_of(&ab));
        assert!(!a.is_ancestor_of(&abc));
        assert!(!a.is_ancestor_of(&a));
        assert!(RemotePath::root().is_ancestor_of(&a));
        assert!(!ab.is_ancestor_of(&a));
    }

    #[test]
    fn test_rebase() {
        let old = RemotePath::parse("/a").unwrap();
        let new = RemotePath::parse("/x/y").unwrap();

        let moved = RemotePath::parse("/a/b/c.txt").unwrap().rebase(&old, &new).unwrap();
        assert_eq!(moved.as_str(), "/x/y/b/c.txt");
        assert_eq!(old.rebase(&old, &new).unwrap(), new);
        assert!(RemotePath::parse("/ab").unwrap().rebase(&old, &new).is_none());
    }

    #[test]
    fn test_segments() {
        let path = RemotePath::parse("/a/b/c").unwrap();
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(path.depth(), 3);
        assert_eq!(RemotePath::root().depth(), 0);
    }
}
