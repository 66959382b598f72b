//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Done:   green   (done status, completed actions)
//!   - Active:         yellow  (on_progress, high priority)
//!   - Error/Urgent:   red     (highest priority, bugs, failures)
//!   - Reference:      cyan    (issue and project IDs)
//!   - Accent:         magenta (labels, epics, roles)
//!   - Muted:          dimmed  (field names, drafts, connectors)

use crate::domain::{IssuePriority, IssueStatus, IssueType, Role};
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply color to status text based on issue status.
pub(crate) fn colorize_status(status: IssueStatus, config: &OutputConfig) -> String {
    let text = status.to_string();
    if !config.use_colors {
        return text;
    }
    match status {
        IssueStatus::Draft => text.dimmed().to_string(),
        IssueStatus::Todo => text.white().to_string(),
        IssueStatus::OnProgress => text.yellow().to_string(),
        IssueStatus::Done => text.green().to_string(),
    }
}

/// Apply color to priority text based on priority level.
pub(crate) fn colorize_priority(priority: IssuePriority, config: &OutputConfig) -> String {
    let text = priority.to_string();
    if !config.use_colors {
        return text;
    }
    match priority {
        IssuePriority::Highest => text.red().bold().to_string(),
        IssuePriority::High => text.yellow().to_string(),
        IssuePriority::Medium => text,
        IssuePriority::Low | IssuePriority::Lowest => text.dimmed().to_string(),
    }
}

/// Colorize an identifier (cyan).
pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

/// Colorize a member role (magenta, bold for the owner).
pub(crate) fn colorize_role(role: Role, config: &OutputConfig) -> String {
    let text = role.to_string();
    if !config.use_colors {
        return text;
    }
    match role {
        Role::Owner => text.magenta().bold().to_string(),
        _ => text.magenta().to_string(),
    }
}

/// Get a colored status icon, with ASCII fallback support.
pub(crate) fn colored_status_icon(status: IssueStatus, config: &OutputConfig) -> String {
    let icon = if config.use_ascii {
        match status {
            IssueStatus::Draft => "~",
            IssueStatus::Todo => "o",
            IssueStatus::OnProgress => ">",
            IssueStatus::Done => "+",
        }
    } else {
        match status {
            IssueStatus::Draft => "◌",
            IssueStatus::Todo => "○",
            IssueStatus::OnProgress => "▶",
            IssueStatus::Done => "✓",
        }
    };

    if !config.use_colors {
        return icon.to_string();
    }

    match status {
        IssueStatus::Draft => icon.dimmed().to_string(),
        IssueStatus::Todo => icon.white().to_string(),
        IssueStatus::OnProgress => icon.yellow().to_string(),
        IssueStatus::Done => icon.green().to_string(),
    }
}

/// Apply dimmed style to text (for labels/field names).
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text (for section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Get a type icon for issue types, with ASCII fallback support.
pub(crate) fn type_icon(issue_type: IssueType, config: &OutputConfig) -> &'static str {
    if config.use_ascii {
        match issue_type {
            IssueType::Task => "-",
            IssueType::Subtask => "_",
            IssueType::Bug => "*",
            IssueType::Story => "+",
            IssueType::Epic => "#",
        }
    } else {
        match issue_type {
            IssueType::Task => "◇",
            IssueType::Subtask => "·",
            IssueType::Bug => "●",
            IssueType::Story => "★",
            IssueType::Epic => "◆",
        }
    }
}

/// Get a colored type icon for issue types.
pub(crate) fn colored_type_icon(issue_type: IssueType, config: &OutputConfig) -> String {
    let icon = type_icon(issue_type, config);
    if !config.use_colors {
        return icon.to_string();
    }
    match issue_type {
        IssueType::Bug => icon.red().to_string(),
        IssueType::Story => icon.green().to_string(),
        IssueType::Epic => icon.magenta().bold().to_string(),
        IssueType::Task => icon.blue().to_string(),
        IssueType::Subtask => icon.dimmed().to_string(),
    }
}
