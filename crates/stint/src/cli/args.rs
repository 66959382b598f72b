//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use super::types::{
    BackendArg, DirectionArg, IssueTypeArg, MethodArg, PriorityArg, RoleArg, StatusArg,
};
use super::validators::{validate_id, validate_title};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Storage backend written to the new config
    #[arg(long, value_enum, default_value = "sqlite")]
    pub backend: BackendArg,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `project` command group
#[derive(Parser, Debug, Clone)]
pub struct ProjectArgs {
    /// Project subcommand
    #[command(subcommand)]
    pub action: ProjectAction,
}

/// Project subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProjectAction {
    /// Create a project owned by the caller
    Create(ProjectCreateArgs),

    /// Add a member or change their role
    AddMember(AddMemberArgs),

    /// Remove a member from the project
    RemoveMember(RemoveMemberArgs),

    /// Change project settings
    Settings(SettingsArgs),

    /// Show a project with its members
    Show(ProjectRefArgs),
}

/// Arguments for `project create`
#[derive(Parser, Debug, Clone)]
pub struct ProjectCreateArgs {
    /// Project name
    #[arg(value_parser = validate_title)]
    pub name: String,

    /// Auto-assign new issues created without an assignee
    #[arg(long)]
    pub auto_assign: bool,

    /// Auto-assignment method
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Allow root issues without a description
    #[arg(long)]
    pub optional_description: bool,
}

/// Arguments for `project add-member`
#[derive(Parser, Debug, Clone)]
pub struct AddMemberArgs {
    /// Project ID
    #[arg(value_parser = validate_id)]
    pub project: String,

    /// User to add
    #[arg(value_parser = validate_id)]
    pub user: String,

    /// Role to grant
    #[arg(short, long, value_enum, default_value = "editor")]
    pub role: RoleArg,
}

/// Arguments for `project remove-member`
#[derive(Parser, Debug, Clone)]
pub struct RemoveMemberArgs {
    /// Project ID
    #[arg(value_parser = validate_id)]
    pub project: String,

    /// User to remove
    #[arg(value_parser = validate_id)]
    pub user: String,
}

/// Arguments for `project settings`
#[derive(Parser, Debug, Clone)]
pub struct SettingsArgs {
    /// Project ID
    #[arg(value_parser = validate_id)]
    pub project: String,

    /// Turn auto-assignment on or off
    #[arg(long)]
    pub auto_assign: Option<bool>,

    /// Auto-assignment method
    #[arg(long, value_enum)]
    pub method: Option<MethodArg>,

    /// Priority for new issues created without one
    #[arg(long, value_enum)]
    pub default_priority: Option<PriorityArg>,

    /// Status for new issues created without one
    #[arg(long, value_enum)]
    pub default_status: Option<StatusArg>,

    /// Require a description on root issues
    #[arg(long)]
    pub require_description: Option<bool>,
}

/// A single project reference
#[derive(Parser, Debug, Clone)]
pub struct ProjectRefArgs {
    /// Project ID
    #[arg(value_parser = validate_id)]
    pub project: String,
}

/// Arguments for the `issue` command group
#[derive(Parser, Debug, Clone)]
pub struct IssueArgs {
    /// Issue subcommand
    #[command(subcommand)]
    pub action: IssueAction,
}

/// Issue subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum IssueAction {
    /// Create an issue at the end of its scope
    Create(CreateArgs),

    /// Update fields of an issue
    Update(UpdateArgs),

    /// Move an issue within its scope
    Move(MoveArgs),

    /// Hang an issue under a parent
    Reparent(ReparentArgs),

    /// Detach an issue from its parent
    Unparent(IssueRefArgs),

    /// Delete an issue (and the children of a root issue)
    Delete(IssueRefArgs),

    /// List issues of a project
    List(ListArgs),

    /// Show issue details
    Show(IssueRefArgs),

    /// Show recent activity of an issue and its children
    Activity(IssueRefArgs),
}

/// Arguments for `issue create`
#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    /// Project ID
    #[arg(short = 'P', long, value_parser = validate_id)]
    pub project: String,

    /// Issue title
    #[arg(long, value_parser = validate_title)]
    pub title: String,

    /// Detailed description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// Issue type (defaults to subtask under a parent, task otherwise)
    #[arg(short = 't', long = "type", value_enum)]
    pub issue_type: Option<IssueTypeArg>,

    /// Priority (defaults from project settings)
    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Status (defaults from project settings)
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Assignee (auto-assigned when omitted and enabled)
    #[arg(short, long, value_parser = validate_id)]
    pub assignee: Option<String>,

    /// Parent issue ID
    #[arg(long, value_parser = validate_id)]
    pub parent: Option<String>,

    /// Free-text label
    #[arg(short, long)]
    pub label: Option<String>,

    /// Goal of the issue
    #[arg(long)]
    pub goal: Option<String>,

    /// Start date (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// Due date (RFC 3339)
    #[arg(long)]
    pub due: Option<DateTime<Utc>>,
}

/// Arguments for `issue update`
#[derive(Parser, Debug, Clone)]
pub struct UpdateArgs {
    /// Issue ID to update
    #[arg(value_parser = validate_id)]
    pub issue_id: String,

    /// New title
    #[arg(long, value_parser = validate_title)]
    pub title: Option<String>,

    /// New description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// New type
    #[arg(short = 't', long = "type", value_enum)]
    pub issue_type: Option<IssueTypeArg>,

    /// New priority
    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// New status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// New assignee
    #[arg(short, long, value_parser = validate_id, conflicts_with = "unassign")]
    pub assignee: Option<String>,

    /// Clear the assignee
    #[arg(long)]
    pub unassign: bool,

    /// New reporter
    #[arg(long, value_parser = validate_id)]
    pub reporter: Option<String>,

    /// New label
    #[arg(short, long)]
    pub label: Option<String>,

    /// New goal
    #[arg(long)]
    pub goal: Option<String>,

    /// New parent issue ID (moves the issue to the end of its children)
    #[arg(long, value_parser = validate_id, conflicts_with = "no_parent")]
    pub parent: Option<String>,

    /// Make the issue a root issue
    #[arg(long)]
    pub no_parent: bool,

    /// New due date (RFC 3339)
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<DateTime<Utc>>,

    /// Clear the due date
    #[arg(long)]
    pub clear_due: bool,
}

/// Arguments for `issue move`
#[derive(Parser, Debug, Clone)]
pub struct MoveArgs {
    /// Issue ID to move
    #[arg(value_parser = validate_id)]
    pub issue_id: String,

    /// Where to move it
    #[arg(value_enum)]
    pub direction: DirectionArg,
}

/// Arguments for `issue reparent`
#[derive(Parser, Debug, Clone)]
pub struct ReparentArgs {
    /// Issue ID to move
    #[arg(value_parser = validate_id)]
    pub issue_id: String,

    /// New parent issue ID
    #[arg(value_parser = validate_id)]
    pub parent: String,
}

/// A single issue reference
#[derive(Parser, Debug, Clone)]
pub struct IssueRefArgs {
    /// Issue ID
    #[arg(value_parser = validate_id)]
    pub issue_id: String,
}

/// Arguments for `issue list`
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {
    /// Project ID
    #[arg(short = 'P', long, value_parser = validate_id)]
    pub project: String,

    /// List the children of this issue instead of the root scope
    #[arg(long, value_parser = validate_id, conflicts_with = "tree")]
    pub parent: Option<String>,

    /// Show the whole project as a tree
    #[arg(long)]
    pub tree: bool,
}
