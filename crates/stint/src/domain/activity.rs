//! Audit records.

use super::{
    IssueId, IssuePriority, IssueStatus, IssueType, ProjectId, ProjectSettings, Role, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an activity record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl ActivityId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of mutation an activity record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Project created
    ProjectCreate,
    /// Project settings changed
    ProjectUpdate,
    /// Issue created
    IssueCreate,
    /// Issue fields changed
    IssueUpdate,
    /// Root issue deleted
    IssueDelete,
    /// Issue reordered or reparented
    IssueMove,
    /// Child issue deleted
    IssueChildrenDelete,
    /// Membership added or changed
    UserProjectUpdate,
    /// Member removed from a project
    UserProjectDelete,
}

impl ActivityType {
    /// Wire representation of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectCreate => "project_create",
            Self::ProjectUpdate => "project_update",
            Self::IssueCreate => "issue_create",
            Self::IssueUpdate => "issue_update",
            Self::IssueDelete => "issue_delete",
            Self::IssueMove => "issue_move",
            Self::IssueChildrenDelete => "issue_children_delete",
            Self::UserProjectUpdate => "user_project_update",
            Self::UserProjectDelete => "user_project_delete",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "project_create" => Self::ProjectCreate,
            "project_update" => Self::ProjectUpdate,
            "issue_create" => Self::IssueCreate,
            "issue_update" => Self::IssueUpdate,
            "issue_delete" => Self::IssueDelete,
            "issue_move" => Self::IssueMove,
            "issue_children_delete" => Self::IssueChildrenDelete,
            "user_project_update" => Self::UserProjectUpdate,
            "user_project_delete" => Self::UserProjectDelete,
            other => return Err(format!("unknown activity type '{other}'")),
        })
    }
}

/// Value snapshot captured before or after a mutation.
///
/// Only the fields relevant to the activity are populated; absent fields are
/// omitted from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<IssuePriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<IssueStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_date: Option<DateTime<Utc>>,
    /// Number of siblings whose position was rewritten.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_issue_id: Option<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_issue_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProjectSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Immutable audit record written in the same transaction as a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    /// Unique identifier
    pub id: ActivityId,

    /// Who performed the mutation
    pub user_id: UserId,

    /// Affected project
    pub project_id: Option<ProjectId>,

    /// Affected issue
    pub issue_id: Option<IssueId>,

    /// Affected comment (owned by an external subsystem)
    pub comment_id: Option<String>,

    /// Affected issue item (owned by an external subsystem)
    pub item_id: Option<String>,

    /// What happened
    #[serde(rename = "type")]
    pub activity_type: ActivityType,

    /// Values before the mutation
    pub old_values: Option<Snapshot>,

    /// Values after the mutation
    pub new_values: Option<Snapshot>,

    /// When the record was written
    pub created_at: DateTime<Utc>,
}
