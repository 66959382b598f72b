//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for stint using clap's derive API.
//! Each command has its own argument struct with validation and helpful error messages.
//!
//! # Commands
//!
//! - `init`: Initialize a new stint workspace
//! - `project`: Create projects, manage members and settings
//! - `issue`: Create, update, sequence, reparent and delete issues
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//! - `--as <USER>`: Acting user (or `STINT_USER`)
//!
//! # Example
//!
//! ```bash
//! stint --as alice project create "Website" --auto-assign --method round_robin
//! stint --as alice issue create -P <project> --title "Fix login" -D "Broken on Safari"
//! stint --as alice issue move <issue> up
//! stint --as alice issue list -P <project> --tree
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::app::App;
use crate::domain::UserId;
use crate::output::OutputMode;

// Re-export argument structs
pub use args::{
    AddMemberArgs, CreateArgs, InitArgs, IssueAction, IssueArgs, IssueRefArgs, ListArgs,
    MoveArgs, ProjectAction, ProjectArgs, ProjectCreateArgs, ProjectRefArgs,
    RemoveMemberArgs, ReparentArgs, SettingsArgs, UpdateArgs,
};

// Re-export types
pub use types::{
    BackendArg, DirectionArg, IssueTypeArg, MethodArg, PriorityArg, RoleArg, StatusArg,
};

// Re-export validators for external use
pub use validators::{validate_id, validate_title, MAX_TITLE_LENGTH};

/// Stint - issue hierarchy and sequencing
///
/// Keep project issues in a user-controlled order, nest them one level deep,
/// and record who changed what.
#[derive(Parser, Debug)]
#[command(name = "stint")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// User performing the command
    #[arg(
        long = "as",
        global = true,
        env = "STINT_USER",
        value_name = "USER",
        value_parser = validate_id
    )]
    pub as_user: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new stint workspace
    ///
    /// Creates the `.stint/` directory with configuration and an empty database.
    Init(InitArgs),

    /// Manage projects
    ///
    /// Projects own issues, members and the settings that drive defaults
    /// and auto-assignment.
    Project(ProjectArgs),

    /// Manage issues
    ///
    /// Issues live in ordered scopes: the project's root issues, and the
    /// children of each root issue.
    Issue(IssueArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// The acting user from `--as` or `STINT_USER`.
    ///
    /// # Errors
    ///
    /// Fails when neither is given.
    pub fn actor(&self) -> Result<UserId> {
        self.as_user
            .as_deref()
            .map(UserId::new)
            .context("No acting user (pass --as <USER> or set STINT_USER)")
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        match &self.command {
            Some(Commands::Init(args)) => execute::execute_init(args, output_mode).await,
            Some(Commands::Project(args)) => {
                let (app, actor) = self.open().await?;
                let result = execute::execute_project(&app, &actor, args, output_mode).await;
                app.shutdown().await;
                result
            }
            Some(Commands::Issue(args)) => {
                let (app, actor) = self.open().await?;
                let result = execute::execute_issue(&app, &actor, args, output_mode).await;
                app.shutdown().await;
                result
            }
            None => {
                println!("Stint issue hierarchy and sequencing");
                println!("Use --help for more information");
                Ok(())
            }
        }
    }

    async fn open(&self) -> Result<(App, UserId)> {
        let actor = self.actor()?;
        let app = App::from_directory(&std::env::current_dir()?).await?;
        Ok((app, actor))
    }
}
