//! Stint CLI binary.

use anyhow::Result;
use stint::cli::Cli;
use stint::commands::init::find_stint_root;
use stint::config::{StintConfig, CONFIG_FILE_NAME, DEFAULT_LOG_FILTER, STINT_DIR_NAME};
use tracing_subscriber::EnvFilter;

/// Main entry point for the stint CLI.
///
/// Uses tokio's current_thread runtime; the side-effect dispatcher runs as a
/// task on the same thread and is drained before exit.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // RUST_LOG wins over the workspace's `log_filter`.
    // Example: RUST_LOG=stint=debug stint issue list -P <project>
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(workspace_log_filter().await)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting stint CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Stint CLI completed successfully");
    Ok(())
}

/// The `log_filter` of the enclosing workspace, if there is one.
async fn workspace_log_filter() -> String {
    let Some(root) = std::env::current_dir()
        .ok()
        .and_then(|dir| find_stint_root(&dir))
    else {
        return DEFAULT_LOG_FILTER.to_string();
    };
    StintConfig::load(&root.join(STINT_DIR_NAME).join(CONFIG_FILE_NAME))
        .await
        .map_or_else(|_| DEFAULT_LOG_FILTER.to_string(), |config| config.log_filter)
}
