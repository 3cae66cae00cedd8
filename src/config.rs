use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::index::DEFAULT_PATH_CACHE_CAPACITY;
use crate::manager::{ManagerOptions, ParentPolicy};
use crate::storage::{StoreOptions, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_BATCH_ROWS};
use std::time::Duration;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilemetaConfig {
    pub account: AccountConfig,
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub logging: LoggingConfig,
}

/// Identity used to partition rows, one root per account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub name: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self { name: "default".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database: Option<String>,
    /// Rows per atomic batch, see `storage::DEFAULT_MAX_BATCH_ROWS`
    pub max_batch_rows: usize,
    pub path_cache_capacity: usize,
    /// Milliseconds a write waits on a locked database
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: None,
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
            path_cache_capacity: DEFAULT_PATH_CACHE_CAPACITY,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Create placeholder folders for missing parents instead of failing
    pub create_missing_parents: bool,
    /// Glob patterns matched against names hidden from folder listings
    pub hidden_patterns: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            create_missing_parents: false,
            hidden_patterns: vec![".*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl FilemetaConfig {
    /// Reject values the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.account.name.trim().is_empty() {
            return Err(Error::Config("account.name must not be empty".to_string()));
        }
        if self.storage.max_batch_rows == 0 {
            return Err(Error::Config("storage.max_batch_rows must be at least 1".to_string()));
        }
        if self.storage.path_cache_capacity == 0 {
            return Err(Error::Config("storage.path_cache_capacity must be at least 1".to_string()));
        }
        for pattern in &self.policy.hidden_patterns {
            glob::Pattern::new(pattern)
                .map_err(|e| Error::Config(format!("invalid hidden pattern {:?}: {}", pattern, e)))?;
        }
        Ok(())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_batch_rows: self.storage.max_batch_rows,
            path_cache_capacity: self.storage.path_cache_capacity,
            busy_timeout: Duration::from_millis(self.storage.busy_timeout_ms),
        }
    }

    pub fn manager_options(&self) -> Result<ManagerOptions> {
        let parent_policy = if self.policy.create_missing_parents {
            ParentPolicy::CreatePlaceholders
        } else {
            ParentPolicy::Fail
        };
        ManagerOptions::new(parent_policy, &self.policy.hidden_patterns)
    }

    /// Database location, relative paths resolved against `base`
    pub fn database_path(&self, base: &Path) -> PathBuf {
        match &self.storage.database {
            Some(db) => base.join(db),
            None => default_database_path_in(base),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("filemeta.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".filemeta").join("files.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<FilemetaConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: FilemetaConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &FilemetaConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FilemetaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.max_batch_rows, DEFAULT_MAX_BATCH_ROWS);
        assert!(!config.policy.create_missing_parents);
        assert_eq!(config.policy.hidden_patterns, vec![".*"]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: FilemetaConfig = toml::from_str(
            r#"
            [account]
            name = "alice@cloud.example.com"

            [policy]
            create_missing_parents = true
            "#,
        )
        .unwrap();
        assert_eq!(config.account.name, "alice@cloud.example.com");
        assert!(config.policy.create_missing_parents);
        assert_eq!(config.storage.path_cache_capacity, DEFAULT_PATH_CACHE_CAPACITY);
        assert_eq!(
            config.store_options().busy_timeout,
            Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS)
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_values() {
        let mut config = FilemetaConfig::default();
        config.storage.max_batch_rows = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = FilemetaConfig::default();
        config.policy.hidden_patterns = vec!["[".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filemeta.toml");

        let mut config = FilemetaConfig::default();
        config.account.name = "bob".to_string();
        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.account.name, "bob");
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_database_path() {
        let base = Path::new("/data");
        let mut config = FilemetaConfig::default();
        assert_eq!(config.database_path(base), PathBuf::from("/data/.filemeta/files.db"));
        config.storage.database = Some("custom.db".to_string());
        assert_eq!(config.database_path(base), PathBuf::from("/data/custom.db"));
    }
}
