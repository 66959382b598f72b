//! CLI value enums and domain type conversions.
//!
//! This module contains the value enums used for CLI argument parsing
//! and their conversions to domain types.

use clap::ValueEnum;

use crate::config::BackendKind;
use crate::domain::{
    AssignmentMethod, IssuePriority, IssueStatus, IssueType, MoveDirection, Role,
};

// ============================================================================
// Value Enums
// ============================================================================

/// Issue type for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueTypeArg {
    /// General task
    Task,
    /// Task under a parent
    Subtask,
    /// Bug fix
    Bug,
    /// User story
    Story,
    /// Epic (large parent issue)
    Epic,
}

/// Issue priority for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    /// Lowest priority
    Lowest,
    /// Low priority
    Low,
    /// Medium priority
    Medium,
    /// High priority
    High,
    /// Highest priority
    Highest,
}

/// Issue status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    /// Not ready for work
    Draft,
    /// Ready to be picked up
    Todo,
    /// Currently being worked on
    #[value(name = "on_progress", alias = "on-progress")]
    OnProgress,
    /// Completed
    Done,
}

/// Member role for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleArg {
    /// View only
    Viewer,
    /// View and edit
    Editor,
    /// Project administration
    Admin,
    /// Project ownership
    Owner,
}

/// Move direction for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionArg {
    /// First position
    Top,
    /// One position earlier
    Up,
    /// One position later
    Down,
    /// Last position
    Bottom,
}

/// Auto-assignment method for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Rotate through members
    #[value(name = "round_robin", alias = "round-robin")]
    RoundRobin,
    /// Member with the fewest open issues
    #[value(name = "least_busy", alias = "least-busy")]
    LeastBusy,
    /// Random member
    Random,
}

/// Storage backend for `stint init`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendArg {
    /// SQLite database under `.stint/`
    #[default]
    Sqlite,
    /// Ephemeral in-memory store
    Memory,
}

// ============================================================================
// Domain Type Conversions
// ============================================================================

impl From<IssueTypeArg> for IssueType {
    fn from(arg: IssueTypeArg) -> Self {
        match arg {
            IssueTypeArg::Task => IssueType::Task,
            IssueTypeArg::Subtask => IssueType::Subtask,
            IssueTypeArg::Bug => IssueType::Bug,
            IssueTypeArg::Story => IssueType::Story,
            IssueTypeArg::Epic => IssueType::Epic,
        }
    }
}

impl From<PriorityArg> for IssuePriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Lowest => IssuePriority::Lowest,
            PriorityArg::Low => IssuePriority::Low,
            PriorityArg::Medium => IssuePriority::Medium,
            PriorityArg::High => IssuePriority::High,
            PriorityArg::Highest => IssuePriority::Highest,
        }
    }
}

impl From<StatusArg> for IssueStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => IssueStatus::Draft,
            StatusArg::Todo => IssueStatus::Todo,
            StatusArg::OnProgress => IssueStatus::OnProgress,
            StatusArg::Done => IssueStatus::Done,
        }
    }
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Viewer => Role::Viewer,
            RoleArg::Editor => Role::Editor,
            RoleArg::Admin => Role::Admin,
            RoleArg::Owner => Role::Owner,
        }
    }
}

impl From<DirectionArg> for MoveDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Top => MoveDirection::Top,
            DirectionArg::Up => MoveDirection::Up,
            DirectionArg::Down => MoveDirection::Down,
            DirectionArg::Bottom => MoveDirection::Bottom,
        }
    }
}

impl From<MethodArg> for AssignmentMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::RoundRobin => AssignmentMethod::RoundRobin,
            MethodArg::LeastBusy => AssignmentMethod::LeastBusy,
            MethodArg::Random => AssignmentMethod::Random,
        }
    }
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sqlite => BackendKind::Sqlite,
            BackendArg::Memory => BackendKind::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_names_match_wire_format() {
        for status in StatusArg::value_variants() {
            let name = status.to_possible_value().unwrap();
            assert_eq!(name.get_name(), IssueStatus::from(*status).as_str());
        }
        for method in MethodArg::value_variants() {
            let name = method.to_possible_value().unwrap();
            assert_eq!(name.get_name(), AssignmentMethod::from(*method).as_str());
        }
        for direction in DirectionArg::value_variants() {
            let name = direction.to_possible_value().unwrap();
            assert_eq!(name.get_name(), MoveDirection::from(*direction).as_str());
        }
    }

    #[test]
    fn test_conversions() {
        assert_eq!(IssueType::from(IssueTypeArg::Subtask), IssueType::Subtask);
        assert_eq!(IssuePriority::from(PriorityArg::Highest), IssuePriority::Highest);
        assert_eq!(Role::from(RoleArg::Admin), Role::Admin);
        assert_eq!(BackendKind::from(BackendArg::default()), BackendKind::Sqlite);
    }
}
