//! Implementation of the `init` command.
//!
//! This module handles initialization of a new stint workspace, creating
//! the `.stint/` directory with its configuration and an empty database.

use crate::config::{BackendKind, StintConfig, CONFIG_FILE_NAME, STINT_DIR_NAME};
use crate::error::{Error, Result};
use crate::storage::create_store;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .stint
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Maximum directory depth to traverse when searching for the workspace root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created .stint directory
    pub stint_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created database, if the backend has one
    pub data_file: Option<PathBuf>,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// Backend written to the config
    pub backend: BackendKind,
}

/// Initialize a new stint workspace in the given directory.
///
/// # Errors
///
/// Returns an error if:
/// - The `.stint/` directory already exists
/// - File system operations fail
/// - The database cannot be created
pub async fn init(base_dir: &Path, backend: BackendKind) -> Result<InitResult> {
    let stint_dir = base_dir.join(STINT_DIR_NAME);

    if stint_dir.exists() {
        return Err(Error::Config(format!(
            "stint is already initialized in this directory. Found existing '{STINT_DIR_NAME}'"
        )));
    }

    fs::create_dir_all(&stint_dir).await?;

    let config_file = stint_dir.join(CONFIG_FILE_NAME);
    let config = StintConfig::with_backend(backend);
    config.save(&config_file).await?;

    // Opening the store creates the database and applies the schema.
    let storage = config.storage_backend(base_dir)?;
    create_store(&storage).await?;
    let data_file = storage.data_path().map(Path::to_path_buf);

    let gitignore_file = stint_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = "\
# SQLite side files
*.db-wal
*.db-shm
";
    fs::write(&gitignore_file, gitignore_content).await?;

    tracing::info!(dir = %stint_dir.display(), ?backend, "Initialized stint workspace");
    Ok(InitResult {
        stint_dir,
        config_file,
        data_file,
        gitignore_file,
        backend,
    })
}

/// Check if a directory has been initialized with stint.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(STINT_DIR_NAME).exists()
}

/// Find the workspace root by searching up the directory tree.
///
/// Starts from the given directory and traverses parent directories
/// until a `.stint/` directory is found, the root is reached, or
/// the maximum traversal depth is exceeded.
pub fn find_stint_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(STINT_DIR_NAME).exists() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
