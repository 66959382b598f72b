//! Domain types for issue tracking.
//!
//! This module contains the core domain types: projects with their members
//! and settings, issues arranged in per-project forests, and the audit
//! records written alongside every mutation.
//!
//! Issues form an arena addressed by [`IssueId`]. An issue's parent is an
//! optional key into the same arena, and its `order` is its position among
//! the siblings of its [`Scope`].

mod activity;

pub use activity::{ActivityId, ActivityType, RecentActivity, Snapshot};

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` when the identifier is blank.
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(
    /// Unique identifier for an issue
    IssueId
);
id_type!(
    /// Unique identifier for a project
    ProjectId
);
id_type!(
    /// Identifier of a user, resolved by the caller before reaching the engine
    UserId
);

/// Generates `Display` and `FromStr` for a snake_case wire enum.
macro_rules! wire_enum {
    ($name:ident, $field:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Wire representation of this value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }

            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(ValidationError::InvalidValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Type of issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// General task
    #[default]
    Task,

    /// Task hanging under a parent issue
    Subtask,

    /// Bug fix
    Bug,

    /// User story
    Story,

    /// Epic (large parent issue)
    Epic,
}

wire_enum!(IssueType, "issue type", {
    Task => "task",
    Subtask => "subtask",
    Bug => "bug",
    Story => "story",
    Epic => "epic",
});

/// Priority of an issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    /// Lowest priority
    Lowest,
    /// Low priority
    Low,
    /// Medium priority
    #[default]
    Medium,
    /// High priority
    High,
    /// Highest priority
    Highest,
}

wire_enum!(IssuePriority, "priority", {
    Lowest => "lowest",
    Low => "low",
    Medium => "medium",
    High => "high",
    Highest => "highest",
});

/// Status of an issue
///
/// `draft → todo → on_progress → done`, with `done` reversible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// Not yet ready for work
    Draft,

    /// Ready to be picked up
    #[default]
    Todo,

    /// Currently being worked on
    OnProgress,

    /// Completed
    Done,
}

wire_enum!(IssueStatus, "status", {
    Draft => "draft",
    Todo => "todo",
    OnProgress => "on_progress",
    Done => "done",
});

/// Auto-assignment policy of a project
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    /// Rotate through members using the project cursor
    #[default]
    RoundRobin,

    /// Member with the fewest open assigned issues
    LeastBusy,

    /// Uniform random member
    Random,
}

impl AssignmentMethod {
    /// Wire representation of this method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastBusy => "least_busy",
            Self::Random => "random",
        }
    }
}

impl fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Self::RoundRobin),
            "least_busy" => Ok(Self::LeastBusy),
            "random" => Ok(Self::Random),
            other => Err(ValidationError::UnknownAssignmentMethod(other.to_string())),
        }
    }
}

/// Role of a member on a project. Ordered `viewer < editor < admin < owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// View only
    Viewer,
    /// View and edit
    Editor,
    /// Full project administration
    Admin,
    /// Project ownership
    Owner,
}

wire_enum!(Role, "role", {
    Viewer => "viewer",
    Editor => "editor",
    Admin => "admin",
    Owner => "owner",
});

/// Direction of a reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// First position of the scope
    Top,
    /// One position earlier
    Up,
    /// One position later
    Down,
    /// Last position of the scope
    Bottom,
}

wire_enum!(MoveDirection, "direction", {
    Top => "top",
    Up => "up",
    Down => "down",
    Bottom => "bottom",
});

/// The siblings sharing a project and a parent (or the project root).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Owning project
    pub project: ProjectId,

    /// Parent issue, `None` for the project root
    pub parent: Option<IssueId>,
}

impl Scope {
    /// Root scope of a project.
    pub fn root(project: ProjectId) -> Self {
        Self {
            project,
            parent: None,
        }
    }

    /// Children of `parent` inside `project`.
    pub fn children(project: ProjectId, parent: IssueId) -> Self {
        Self {
            project,
            parent: Some(parent),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}/{}", self.project, parent),
            None => write!(f, "{}/root", self.project),
        }
    }
}

/// Represents an issue in the tracking system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique identifier for the issue
    pub id: IssueId,

    /// Owning project
    pub project_id: ProjectId,

    /// Parent issue in the same project (optional)
    pub parent_id: Option<IssueId>,

    /// Issue title
    pub title: String,

    /// Issue type
    #[serde(rename = "type")]
    pub issue_type: IssueType,

    /// Priority level
    pub priority: IssuePriority,

    /// Current status
    pub status: IssueStatus,

    /// Assignee (optional)
    pub assignee: Option<UserId>,

    /// Reporter (optional)
    pub reporter: Option<UserId>,

    /// Creator (optional)
    pub creator: Option<UserId>,

    /// When work started
    pub start_date: Option<DateTime<Utc>>,

    /// When the issue is due
    pub due_date: Option<DateTime<Utc>>,

    /// When the issue was last completed
    pub done_date: Option<DateTime<Utc>>,

    /// Free-text label
    pub label: Option<String>,

    /// Issue description
    pub description: Option<String>,

    /// Goal of the issue
    pub goal: Option<String>,

    /// Position within the scope, `0..n-1`
    pub order: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// The scope this issue is ordered in.
    pub fn scope(&self) -> Scope {
        Scope {
            project: self.project_id.clone(),
            parent: self.parent_id.clone(),
        }
    }

    /// Returns `true` when the issue has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Per-project behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Pick an assignee when a new issue has none
    pub auto_assignment: bool,

    /// Policy used when auto-assigning
    pub assignment_method: AssignmentMethod,

    /// Priority for issues created without one
    pub default_priority: IssuePriority,

    /// Status for issues created without one
    pub default_status: IssueStatus,

    /// Root issues must carry a description
    pub require_description: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            auto_assignment: false,
            assignment_method: AssignmentMethod::RoundRobin,
            default_priority: IssuePriority::Medium,
            default_status: IssueStatus::Todo,
            require_description: true,
        }
    }
}

/// Partial settings update. Only the named fields exist; anything else is
/// rejected when the patch is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    /// New auto-assignment flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_assignment: Option<bool>,

    /// New assignment method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_method: Option<AssignmentMethod>,

    /// New default priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_priority: Option<IssuePriority>,

    /// New default status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_status: Option<IssueStatus>,

    /// New description requirement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_description: Option<bool>,
}

impl SettingsPatch {
    /// Apply every present field to `settings`.
    pub fn apply(&self, settings: &mut ProjectSettings) {
        if let Some(auto_assignment) = self.auto_assignment {
            settings.auto_assignment = auto_assignment;
        }
        if let Some(method) = self.assignment_method {
            settings.assignment_method = method;
        }
        if let Some(priority) = self.default_priority {
            settings.default_priority = priority;
        }
        if let Some(status) = self.default_status {
            settings.default_status = status;
        }
        if let Some(require) = self.require_description {
            settings.require_description = require;
        }
    }

    /// Returns `true` when the patch carries no field.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A user's membership on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member
    pub user_id: UserId,

    /// Their role
    pub role: Role,
}

/// A project owning a forest of issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// Owning user
    pub owner_id: UserId,

    /// Display name
    pub name: String,

    /// Behaviour switches
    pub settings: ProjectSettings,

    /// Index of the member picked by the last round-robin assignment
    pub last_assigned_index: Option<i64>,

    /// Members in the order they joined
    pub members: Vec<Member>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Role of `user` on this project, if they are a member.
    pub fn role_of(&self, user: &UserId) -> Option<Role> {
        self.members
            .iter()
            .find(|m| &m.user_id == user)
            .map(|m| m.role)
    }
}

/// Data for creating a new issue
#[derive(Debug, Clone, Default)]
pub struct NewIssue {
    /// Owning project
    pub project_id: ProjectId,

    /// Issue title
    pub title: String,

    /// Issue type; defaults to `subtask` under a parent, `task` otherwise
    pub issue_type: Option<IssueType>,

    /// Priority; defaults from project settings
    pub priority: Option<IssuePriority>,

    /// Status; defaults from project settings
    pub status: Option<IssueStatus>,

    /// Explicit assignee; auto-assignment runs when absent
    pub assignee: Option<UserId>,

    /// Parent issue in the same project
    pub parent_id: Option<IssueId>,

    /// Free-text label
    pub label: Option<String>,

    /// Description
    pub description: Option<String>,

    /// Goal
    pub goal: Option<String>,

    /// Start date
    pub start_date: Option<DateTime<Utc>>,

    /// Due date
    pub due_date: Option<DateTime<Utc>>,
}

/// Data for updating an existing issue.
///
/// Outer `None` keeps the current value; `Some(None)` clears an optional
/// field.
#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<Option<String>>,

    /// New priority
    pub priority: Option<IssuePriority>,

    /// New type
    pub issue_type: Option<IssueType>,

    /// New status
    pub status: Option<IssueStatus>,

    /// New assignee
    pub assignee: Option<Option<UserId>>,

    /// New reporter
    pub reporter: Option<Option<UserId>>,

    /// New label
    pub label: Option<Option<String>>,

    /// New goal
    pub goal: Option<Option<String>>,

    /// New parent
    pub parent_id: Option<Option<IssueId>>,

    /// New start date
    pub start_date: Option<Option<DateTime<Utc>>>,

    /// New due date
    pub due_date: Option<Option<DateTime<Utc>>>,
}
