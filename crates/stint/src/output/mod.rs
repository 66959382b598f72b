//! Output formatting for CLI commands.
//!
//! This module provides utilities for formatting command output in both
//! human-readable text format and JSON format for programmatic use.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers (semantic colors, icons)
//! - [`tree`]: Issue hierarchy rendering with ASCII/Unicode connectors

pub mod color;
pub mod tree;

use crate::domain::{Issue, Project, RecentActivity};
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success};
pub use tree::{build_forest, write_forest, IssueNode};

use color::{
    bold, colored_status_icon, colored_type_icon, colorize_id, colorize_priority, colorize_role,
    colorize_status, dimmed,
};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    pub fn new(use_ascii: bool, use_colors: bool) -> Self {
        Self {
            use_ascii,
            use_colors,
        }
    }

    /// Create an `OutputConfig` from the process environment.
    ///
    /// Reads:
    /// - `STINT_ASCII`: "1" or "true" for ASCII-only icons
    /// - `NO_COLOR`: any value disables colors
    /// - `STINT_COLOR`: "0" or "false" disables colors
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let use_ascii = match lookup("STINT_ASCII") {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => true,
            Some(v) if v == "0" || v.eq_ignore_ascii_case("false") || v.is_empty() => false,
            Some(v) => {
                tracing::warn!(
                    env_var = "STINT_ASCII",
                    value = %v,
                    "Invalid value (expected '1', 'true', '0', or 'false'), using default"
                );
                false
            }
            None => false,
        };

        // https://no-color.org/
        let use_colors = lookup("NO_COLOR").is_none()
            && lookup("STINT_COLOR")
                .is_none_or(|v| v != "0" && !v.eq_ignore_ascii_case("false"));

        Self {
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Write to stdout in `mode`: `text` renders human output, JSON mode
/// serializes `value`.
fn emit<T, F>(value: &T, mode: OutputMode, text: F) -> io::Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&mut io::StdoutLock<'static>, &OutputConfig) -> io::Result<()>,
{
    let mut handle = io::stdout().lock();
    match mode {
        OutputMode::Text => text(&mut handle, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, value),
    }
}

/// Print an issue with its details.
pub fn print_issue(issue: &Issue, mode: OutputMode) -> io::Result<()> {
    emit(issue, mode, |w, config| write_issue_details(w, issue, config))
}

/// Print one scope's issues in position order.
pub fn print_issues(issues: &[Issue], mode: OutputMode) -> io::Result<()> {
    emit(issues, mode, |w, config| write_issue_list(w, issues, config))
}

/// Print a project's issues as a tree.
pub fn print_issue_tree(issues: &[Issue], mode: OutputMode) -> io::Result<()> {
    let forest = build_forest(issues);
    emit(&forest, mode, |w, config| {
        if forest.is_empty() {
            return writeln!(w, "No issues found.");
        }
        write_forest(w, &forest, config)
    })
}

/// Print a project with its settings and members.
pub fn print_project(project: &Project, mode: OutputMode) -> io::Result<()> {
    emit(project, mode, |w, config| write_project(w, project, config))
}

/// Print activity records, newest first.
pub fn print_activities(activities: &[RecentActivity], mode: OutputMode) -> io::Result<()> {
    emit(activities, mode, |w, config| {
        write_activities(w, activities, config)
    })
}

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    writeln!(io::stdout().lock(), "{msg}")
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    write_json(&mut io::stdout().lock(), value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

// ============================================================================
// Text Formatting
// ============================================================================

fn issue_line(issue: &Issue, config: &OutputConfig) -> String {
    format!(
        "{:>3} {} {} {} {} {}",
        dimmed(&format!("#{}", issue.order), config),
        colored_status_icon(issue.status, config),
        colorize_id(issue.id.as_str(), config),
        colored_type_icon(issue.issue_type, config),
        colorize_priority(issue.priority, config),
        issue.title
    )
}

fn write_issue_list<W: Write>(w: &mut W, issues: &[Issue], config: &OutputConfig) -> io::Result<()> {
    if issues.is_empty() {
        return writeln!(w, "No issues found.");
    }
    for issue in issues {
        writeln!(w, "{}", issue_line(issue, config))?;
    }
    Ok(())
}

fn field<W: Write>(w: &mut W, name: &str, value: &str, config: &OutputConfig) -> io::Result<()> {
    writeln!(w, "  {} {}", dimmed(&format!("{name}:"), config), value)
}

fn optional_field<W: Write, T: std::fmt::Display>(
    w: &mut W,
    name: &str,
    value: Option<&T>,
    config: &OutputConfig,
) -> io::Result<()> {
    match value {
        Some(value) => field(w, name, &value.to_string(), config),
        None => Ok(()),
    }
}

fn write_issue_details<W: Write>(
    w: &mut W,
    issue: &Issue,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "{} {} {}",
        colored_type_icon(issue.issue_type, config),
        colorize_id(issue.id.as_str(), config),
        bold(&issue.title, config)
    )?;
    field(w, "Project", issue.project_id.as_str(), config)?;
    optional_field(w, "Parent", issue.parent_id.as_ref(), config)?;
    field(w, "Position", &issue.order.to_string(), config)?;
    field(w, "Type", issue.issue_type.as_str(), config)?;
    field(w, "Status", &colorize_status(issue.status, config), config)?;
    field(w, "Priority", &colorize_priority(issue.priority, config), config)?;
    optional_field(w, "Assignee", issue.assignee.as_ref(), config)?;
    optional_field(w, "Reporter", issue.reporter.as_ref(), config)?;
    optional_field(w, "Label", issue.label.as_ref(), config)?;
    optional_field(w, "Started", issue.start_date.as_ref(), config)?;
    optional_field(w, "Due", issue.due_date.as_ref(), config)?;
    optional_field(w, "Done", issue.done_date.as_ref(), config)?;
    field(w, "Updated", &issue.updated_at.to_rfc3339(), config)?;

    for (title, text) in [("Description", &issue.description), ("Goal", &issue.goal)] {
        if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
            writeln!(w)?;
            writeln!(w, "{}", bold(&format!("{title}:"), config))?;
            for line in text.lines() {
                writeln!(w, "  {line}")?;
            }
        }
    }
    Ok(())
}

fn write_project<W: Write>(w: &mut W, project: &Project, config: &OutputConfig) -> io::Result<()> {
    let settings = &project.settings;
    writeln!(
        w,
        "{} {}",
        colorize_id(project.id.as_str(), config),
        bold(&project.name, config)
    )?;
    field(w, "Owner", project.owner_id.as_str(), config)?;
    field(
        w,
        "Auto-assign",
        &if settings.auto_assignment {
            settings.assignment_method.to_string()
        } else {
            "off".to_string()
        },
        config,
    )?;
    field(w, "Default priority", settings.default_priority.as_str(), config)?;
    field(w, "Default status", settings.default_status.as_str(), config)?;
    field(
        w,
        "Description required",
        if settings.require_description { "yes" } else { "no" },
        config,
    )?;

    writeln!(w)?;
    writeln!(w, "{}", bold("Members:", config))?;
    for (index, member) in project.members.iter().enumerate() {
        let marker = if project.last_assigned_index == i64::try_from(index).ok() {
            " *"
        } else {
            ""
        };
        writeln!(
            w,
            "  {} {}{}",
            member.user_id,
            colorize_role(member.role, config),
            dimmed(marker, config)
        )?;
    }
    Ok(())
}

fn write_activities<W: Write>(
    w: &mut W,
    activities: &[RecentActivity],
    config: &OutputConfig,
) -> io::Result<()> {
    if activities.is_empty() {
        return writeln!(w, "No activity.");
    }
    for activity in activities {
        let message = activity
            .new_values
            .as_ref()
            .or(activity.old_values.as_ref())
            .and_then(|s| s.message.as_deref())
            .map(|m| format!(" ({m})"))
            .unwrap_or_default();
        writeln!(
            w,
            "{} {} {}{}",
            dimmed(&activity.created_at.format("%Y-%m-%d %H:%M:%S").to_string(), config),
            activity.user_id,
            bold(activity.activity_type.as_str(), config),
            message
        )?;
    }
    Ok(())
}
