//! Application context for CLI command execution.
//!
//! This module provides the `App` struct that opens the configured store and
//! wires an [`Engine`] over it.
//!
//! # Example
//!
//! ```no_run
//! use stint::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     // Execute commands using app.engine()...
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

use crate::commands::init::find_stint_root;
use crate::config::{StintConfig, CONFIG_FILE_NAME, STINT_DIR_NAME};
use crate::engine::{Engine, LogNotifier};
use crate::error::{Error, Result};
use crate::storage::create_store;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
pub struct App {
    /// The engine over the configured store
    engine: Engine,

    /// Directory containing `.stint/`
    root: PathBuf,

    /// Loaded configuration
    config: StintConfig,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create an App instance from the given working directory.
    ///
    /// Searches up the directory tree to find a `.stint/` directory,
    /// loads configuration, and opens storage.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No stint workspace is found in the directory tree
    /// - Configuration cannot be loaded
    /// - Storage cannot be opened
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root = find_stint_root(working_dir).ok_or_else(|| {
            Error::Config("Not a stint workspace (run `stint init` first)".to_string())
        })?;
        let config_path = root.join(STINT_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = StintConfig::load(&config_path).await?;

        let backend = config.storage_backend(&root)?;
        let store = create_store(&backend).await?;
        let engine = Engine::with_notifier(
            store,
            Arc::new(LogNotifier),
            config.engine.side_effect_queue,
        );
        tracing::debug!(root = %root.display(), ?backend, "Opened workspace");

        Ok(Self {
            engine,
            root,
            config,
        })
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Directory containing `.stint/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded configuration.
    pub fn config(&self) -> &StintConfig {
        &self.config
    }

    /// Drain queued side effects. Call before exiting.
    pub async fn shutdown(self) {
        self.engine.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::config::BackendKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_from_initialized_directory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), BackendKind::Sqlite)
            .await
            .unwrap();

        let app = App::from_directory(temp_dir.path()).await.unwrap();

        assert_eq!(app.root(), temp_dir.path());
        assert_eq!(app.engine().store().backend_name(), "sqlite");
        assert_eq!(app.config().engine.side_effect_queue, 64);
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_app_from_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        init::init(temp_dir.path(), BackendKind::Memory)
            .await
            .unwrap();

        let sub_dir = temp_dir.path().join("src").join("lib");
        std::fs::create_dir_all(&sub_dir).unwrap();

        let app = App::from_directory(&sub_dir).await.unwrap();
        assert_eq!(app.engine().store().backend_name(), "memory");
        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_app_from_uninitialized_directory() {
        let temp_dir = TempDir::new().unwrap();

        let err = App::from_directory(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("Not a stint workspace"));
    }
}
