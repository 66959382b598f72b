//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants shared by the queries.

use crate::domain::{
    ActivityId, Issue, IssueId, Project, ProjectId, ProjectSettings, Snapshot, UserId,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use std::str::FromStr;

/// SQL column list for the issues table.
///
/// Use with `row_to_issue` for consistent column ordering.
pub(crate) const ISSUE_COLUMNS: &str = "id, project_id, parent_id, title, type, priority, status, \
     assignee, reporter, creator, start_date, due_date, done_date, label, description, goal, \
     order_index, created_at, updated_at";

/// SQL column list for the projects table.
///
/// Use with `row_to_project` for consistent column ordering.
pub(crate) const PROJECT_COLUMNS: &str = "id, owner_id, name, auto_assignment, \
     assignment_method, default_priority, default_status, require_description, \
     last_assigned_index, created_at, updated_at";

/// SQL column list for the `recent_activities` table.
pub(crate) const ACTIVITY_COLUMNS: &str = "id, user_id, project_id, issue_id, comment_id, \
     item_id, type, old_values, new_values, created_at";

/// Format a timestamp for storage. Fixed precision keeps the text sortable.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// Parse a wire-encoded enum column.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_optional_timestamp(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

fn parse_snapshot(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Snapshot>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        None => Ok(None),
    }
}

/// Convert a database row to an [`Issue`].
pub(crate) fn row_to_issue(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: IssueId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        parent_id: row.get::<_, Option<String>>(2)?.map(IssueId),
        title: row.get(3)?,
        issue_type: parse_column(row, 4)?,
        priority: parse_column(row, 5)?,
        status: parse_column(row, 6)?,
        assignee: row.get::<_, Option<String>>(7)?.map(UserId),
        reporter: row.get::<_, Option<String>>(8)?.map(UserId),
        creator: row.get::<_, Option<String>>(9)?.map(UserId),
        start_date: parse_optional_timestamp(row, 10)?,
        due_date: parse_optional_timestamp(row, 11)?,
        done_date: parse_optional_timestamp(row, 12)?,
        label: row.get(13)?,
        description: row.get(14)?,
        goal: row.get(15)?,
        order: row.get(16)?,
        created_at: parse_timestamp(row, 17)?,
        updated_at: parse_timestamp(row, 18)?,
    })
}

/// Convert a database row to a [`Project`] without members.
pub(crate) fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: ProjectId(row.get(0)?),
        owner_id: UserId(row.get(1)?),
        name: row.get(2)?,
        settings: ProjectSettings {
            auto_assignment: row.get(3)?,
            assignment_method: parse_column(row, 4)?,
            default_priority: parse_column(row, 5)?,
            default_status: parse_column(row, 6)?,
            require_description: row.get(7)?,
        },
        last_assigned_index: row.get(8)?,
        members: Vec::new(),
        created_at: parse_timestamp(row, 9)?,
        updated_at: parse_timestamp(row, 10)?,
    })
}

/// An activity row whose type column has not been checked yet.
pub(crate) struct ActivityRow {
    pub(crate) id: ActivityId,
    pub(crate) user_id: UserId,
    pub(crate) project_id: Option<ProjectId>,
    pub(crate) issue_id: Option<IssueId>,
    pub(crate) comment_id: Option<String>,
    pub(crate) item_id: Option<String>,
    pub(crate) activity_type: String,
    pub(crate) old_values: Option<Snapshot>,
    pub(crate) new_values: Option<Snapshot>,
    pub(crate) created_at: DateTime<Utc>,
}

/// Convert a database row to an [`ActivityRow`].
pub(crate) fn row_to_activity(row: &rusqlite::Row) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: ActivityId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        project_id: row.get::<_, Option<String>>(2)?.map(ProjectId),
        issue_id: row.get::<_, Option<String>>(3)?.map(IssueId),
        comment_id: row.get(4)?,
        item_id: row.get(5)?,
        activity_type: row.get(6)?,
        old_values: parse_snapshot(row, 7)?,
        new_values: parse_snapshot(row, 8)?,
        created_at: parse_timestamp(row, 9)?,
    })
}

/// `?, ?, ?` with `n` placeholders.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_keep_microseconds() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:20:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(at), "2024-03-01T10:20:30.123456Z");
    }

    #[test]
    fn placeholders_are_comma_separated() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }
}
