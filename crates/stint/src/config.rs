//! Workspace configuration.
//!
//! Loaded from `.stint/config.yaml`:
//!
//! ```yaml
//! storage:
//!   backend: sqlite
//!   data_file: .stint/stint.db
//! engine:
//!   side_effect_queue: 64
//! log_filter: stint=info
//! ```
//!
//! Every section is optional on load; unknown keys are rejected.

use crate::engine::DEFAULT_QUEUE_CAPACITY;
use crate::error::{Error, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Name of the workspace directory
pub const STINT_DIR_NAME: &str = ".stint";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the SQLite database file
pub const DATABASE_FILE_NAME: &str = "stint.db";

/// Log filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "stint=info";

/// Storage backend kind as written in the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite database at `data_file`
    #[default]
    Sqlite,

    /// In-memory store, empty on every start
    Memory,
}

/// Configuration file structure for stint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StintConfig {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// `tracing` filter directive for the CLI
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// Storage configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendKind,

    /// Path to the database, relative to the workspace root
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

/// Engine configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Capacity of the post-commit side-effect queue
    #[serde(default = "default_queue")]
    pub side_effect_queue: usize,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

fn default_data_file() -> String {
    format!("{STINT_DIR_NAME}/{DATABASE_FILE_NAME}")
}

fn default_queue() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            data_file: default_data_file(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            side_effect_queue: default_queue(),
        }
    }
}

impl Default for StintConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            engine: EngineConfig::default(),
            log_filter: default_log_filter(),
        }
    }
}

impl StintConfig {
    /// Default configuration using `backend`.
    pub fn with_backend(backend: BackendKind) -> Self {
        Self {
            storage: StorageConfig {
                backend,
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        if config.engine.side_effect_queue == 0 {
            return Err(Error::Config(
                "engine.side_effect_queue must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load configuration from a file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Save configuration to a file
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Storage backend for a workspace rooted at `root`.
    ///
    /// # Errors
    ///
    /// `Config` when the SQLite data file is blank.
    pub fn storage_backend(&self, root: &Path) -> Result<StorageBackend> {
        match self.storage.backend {
            BackendKind::Memory => Ok(StorageBackend::InMemory),
            BackendKind::Sqlite => {
                let data_file = self.storage.data_file.trim();
                if data_file.is_empty() {
                    return Err(Error::Config(
                        "storage.data_file cannot be empty".to_string(),
                    ));
                }
                Ok(StorageBackend::Sqlite(root.join(data_file)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config = StintConfig::from_yaml("{}").unwrap();
        assert_eq!(config, StintConfig::default());
        assert_eq!(config.storage.data_file, ".stint/stint.db");
        assert_eq!(config.engine.side_effect_queue, 64);
        assert_eq!(config.log_filter, "stint=info");
    }

    #[rstest]
    #[case::top_level("storage:\n  backend: sqlite\nissue-prefix: proj\n")]
    #[case::nested("storage:\n  backend: sqlite\n  compress: true\n")]
    #[case::unknown_backend("storage:\n  backend: jsonl\n")]
    #[case::zero_queue("engine:\n  side_effect_queue: 0\n")]
    fn invalid_config_is_rejected(#[case] yaml: &str) {
        let err = StintConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn backend_resolves_relative_to_root() {
        let root = PathBuf::from("/work");
        let sqlite = StintConfig::default().storage_backend(&root).unwrap();
        assert_eq!(
            sqlite,
            StorageBackend::Sqlite(PathBuf::from("/work/.stint/stint.db"))
        );

        let memory = StintConfig::with_backend(BackendKind::Memory)
            .storage_backend(&root)
            .unwrap();
        assert_eq!(memory, StorageBackend::InMemory);
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        let original = StintConfig::with_backend(BackendKind::Memory);
        original.save(&path).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("backend: memory"));
        assert_eq!(StintConfig::load(&path).await.unwrap(), original);
    }
}
