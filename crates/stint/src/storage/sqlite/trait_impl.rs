//! Store and Transaction trait implementations for `SQLite` storage.

use super::helpers::{
    format_timestamp, placeholders, row_to_activity, row_to_issue, row_to_project,
    ACTIVITY_COLUMNS, ISSUE_COLUMNS, PROJECT_COLUMNS,
};
use super::SqliteStore;
use crate::domain::{
    ActivityType, Issue, IssueId, IssueStatus, IssueType, Member, Project, ProjectId,
    ProjectSettings, RecentActivity, Role, Scope, UserId,
};
use crate::error::{Result, StorageContext, StorageError};
use crate::storage::{Store, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::OwnedMutexGuard;

/// A transaction holding the connection between `BEGIN IMMEDIATE` and
/// `COMMIT`.
pub(crate) struct SqliteTransaction {
    conn: OwnedMutexGuard<Connection>,
    committed: bool,
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let conn = self.conn.clone().lock_owned().await;
        conn.execute_batch("BEGIN IMMEDIATE")
            .context("beginning transaction")?;
        Ok(Box::new(SqliteTransaction {
            conn,
            committed: false,
        }))
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "Failed to roll back transaction");
        }
    }
}

fn expect_one_row(
    changed: usize,
    table: &'static str,
    id: &impl ToString,
) -> std::result::Result<(), StorageError> {
    if changed == 0 {
        Err(StorageError::MissingRow {
            table,
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

fn optional_timestamp(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(format_timestamp)
}

impl SqliteTransaction {
    fn write_issue(&self, sql: &str, issue: &Issue) -> rusqlite::Result<usize> {
        self.conn.execute(
            sql,
            params![
                issue.id.as_str(),
                issue.project_id.as_str(),
                issue.parent_id.as_ref().map(IssueId::as_str),
                issue.title,
                issue.issue_type.as_str(),
                issue.priority.as_str(),
                issue.status.as_str(),
                issue.assignee.as_ref().map(UserId::as_str),
                issue.reporter.as_ref().map(UserId::as_str),
                issue.creator.as_ref().map(UserId::as_str),
                optional_timestamp(issue.start_date),
                optional_timestamp(issue.due_date),
                optional_timestamp(issue.done_date),
                issue.label,
                issue.description,
                issue.goal,
                issue.order,
                format_timestamp(issue.created_at),
                format_timestamp(issue.updated_at),
            ],
        )
    }

    fn query_issues(&self, sql: &str, args: &[&dyn ToSql]) -> rusqlite::Result<Vec<Issue>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(args, row_to_issue)?;
        rows.collect()
    }

    fn project_exists(&self, id: &ProjectId) -> rusqlite::Result<bool> {
        self.conn
            .query_row("SELECT 1 FROM projects WHERE id = ?1", [id.as_str()], |_| {
                Ok(())
            })
            .optional()
            .map(|found| found.is_some())
    }

    fn insert_member(&self, project: &ProjectId, member: &Member) -> rusqlite::Result<usize> {
        self.conn.execute(
            "INSERT INTO project_members (project_id, user_id, role, position)
             VALUES (?1, ?2, ?3,
                     (SELECT COALESCE(MAX(position), -1) + 1 FROM project_members WHERE project_id = ?1))
             ON CONFLICT(project_id, user_id) DO UPDATE SET role = excluded.role",
            params![project.as_str(), member.user_id.as_str(), member.role.as_str()],
        )
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn get_issue(&mut self, id: &IssueId) -> Result<Option<Issue>> {
        self.conn
            .query_row(
                &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
                [id.as_str()],
                row_to_issue,
            )
            .optional()
            .context("loading issue")
    }

    async fn scope_issues(&mut self, scope: &Scope) -> Result<Vec<Issue>> {
        let parent = scope.parent.as_ref().map(IssueId::as_str);
        self.query_issues(
            &format!(
                "SELECT {ISSUE_COLUMNS} FROM issues
                 WHERE project_id = ?1 AND parent_id IS ?2
                 ORDER BY order_index, created_at, id"
            ),
            &[&scope.project.as_str(), &parent],
        )
        .context("listing scope")
    }

    async fn project_issues(&mut self, project: &ProjectId) -> Result<Vec<Issue>> {
        self.query_issues(
            &format!(
                "SELECT {ISSUE_COLUMNS} FROM issues
                 WHERE project_id = ?1
                 ORDER BY parent_id IS NOT NULL, parent_id, order_index, created_at, id"
            ),
            &[&project.as_str()],
        )
        .context("listing project issues")
    }

    async fn child_ids(&mut self, parent: &IssueId) -> Result<Vec<IssueId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM issues WHERE parent_id = ?1 ORDER BY order_index")
            .context("listing children")?;
        let rows = stmt
            .query_map([parent.as_str()], |row| row.get::<_, String>(0).map(IssueId))
            .context("listing children")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("listing children")
    }

    async fn max_order(&mut self, scope: &Scope) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT MAX(order_index) FROM issues WHERE project_id = ?1 AND parent_id IS ?2",
                params![
                    scope.project.as_str(),
                    scope.parent.as_ref().map(IssueId::as_str)
                ],
                |row| row.get(0),
            )
            .context("reading last position")
    }

    async fn insert_issue(&mut self, issue: &Issue) -> Result<()> {
        self.write_issue(
            &format!(
                "INSERT INTO issues ({ISSUE_COLUMNS}) VALUES ({})",
                placeholders(19)
            ),
            issue,
        )
        .context("inserting issue")?;
        Ok(())
    }

    async fn save_issue(&mut self, issue: &Issue) -> Result<()> {
        let changed = self
            .write_issue(
                "UPDATE issues SET project_id = ?2, parent_id = ?3, title = ?4, type = ?5,
                 priority = ?6, status = ?7, assignee = ?8, reporter = ?9, creator = ?10,
                 start_date = ?11, due_date = ?12, done_date = ?13, label = ?14,
                 description = ?15, goal = ?16, order_index = ?17, created_at = ?18,
                 updated_at = ?19
                 WHERE id = ?1",
                issue,
            )
            .context("saving issue")?;
        expect_one_row(changed, "issues", &issue.id).context("saving issue")
    }

    async fn clear_parent(&mut self, id: &IssueId, issue_type: IssueType) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE issues SET parent_id = NULL, type = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.as_str(), issue_type.as_str(), format_timestamp(Utc::now())],
            )
            .context("clearing parent")?;
        expect_one_row(changed, "issues", id).context("clearing parent")
    }

    async fn rewrite_positions(&mut self, positions: &[(IssueId, i64)]) -> Result<()> {
        if positions.is_empty() {
            return Ok(());
        }

        // One statement: CASE id WHEN ? THEN ? ... END WHERE id IN (...)
        let mut sql = String::from("UPDATE issues SET order_index = CASE id");
        for _ in positions {
            sql.push_str(" WHEN ? THEN ?");
        }
        sql.push_str(" END WHERE id IN (");
        sql.push_str(&placeholders(positions.len()));
        sql.push(')');

        let mut args: Vec<&dyn ToSql> = Vec::with_capacity(positions.len() * 3);
        for (id, order) in positions {
            args.push(&id.0);
            args.push(order);
        }
        for (id, _) in positions {
            args.push(&id.0);
        }

        let changed = self
            .conn
            .execute(&sql, args.as_slice())
            .context("rewriting positions")?;
        if changed == positions.len() {
            return Ok(());
        }

        // Name the first issue that matched nothing.
        for (id, _) in positions {
            let found = self
                .conn
                .query_row("SELECT 1 FROM issues WHERE id = ?1", [id.as_str()], |_| Ok(()))
                .optional()
                .context("rewriting positions")?;
            if found.is_none() {
                return Err(StorageError::MissingRow {
                    table: "issues",
                    id: id.to_string(),
                })
                .context("rewriting positions");
            }
        }
        Ok(())
    }

    async fn touch_issue(&mut self, id: &IssueId, at: DateTime<Utc>) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE issues SET updated_at = ?2 WHERE id = ?1",
                params![id.as_str(), format_timestamp(at)],
            )
            .context("touching issue")?;
        expect_one_row(changed, "issues", id).context("touching issue")
    }

    async fn delete_issue(&mut self, id: &IssueId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM issues WHERE id = ?1", [id.as_str()])
            .context("deleting issue")?;
        expect_one_row(changed, "issues", id).context("deleting issue")
    }

    async fn delete_children(&mut self, parent: &IssueId) -> Result<usize> {
        self.conn
            .execute("DELETE FROM issues WHERE parent_id = ?1", [parent.as_str()])
            .context("deleting children")
    }

    async fn count_open_assigned(&mut self, user: &UserId) -> Result<u64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM issues WHERE assignee = ?1 AND status != ?2",
                params![user.as_str(), IssueStatus::Done.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| u64::try_from(count).unwrap_or_default())
            .context("counting assigned issues")
    }

    async fn get_project(&mut self, id: &ProjectId) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                [id.as_str()],
                row_to_project,
            )
            .optional()
            .context("loading project")?;
        let Some(mut project) = project else {
            return Ok(None);
        };

        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT user_id, role FROM project_members WHERE project_id = ?1 ORDER BY position",
            )
            .context("loading members")?;
        let rows = stmt
            .query_map([id.as_str()], |row| {
                let role: String = row.get(1)?;
                Ok(Member {
                    user_id: UserId(row.get(0)?),
                    role: role.parse::<Role>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                })
            })
            .context("loading members")?;
        project.members = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("loading members")?;
        Ok(Some(project))
    }

    async fn insert_project(&mut self, project: &Project) -> Result<()> {
        let settings = &project.settings;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO projects ({PROJECT_COLUMNS}) VALUES ({})",
                    placeholders(11)
                ),
                params![
                    project.id.as_str(),
                    project.owner_id.as_str(),
                    project.name,
                    settings.auto_assignment,
                    settings.assignment_method.as_str(),
                    settings.default_priority.as_str(),
                    settings.default_status.as_str(),
                    settings.require_description,
                    project.last_assigned_index,
                    format_timestamp(project.created_at),
                    format_timestamp(project.updated_at),
                ],
            )
            .context("inserting project")?;
        for member in &project.members {
            self.insert_member(&project.id, member)
                .context("inserting member")?;
        }
        Ok(())
    }

    async fn save_settings(&mut self, id: &ProjectId, settings: &ProjectSettings) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE projects SET auto_assignment = ?2, assignment_method = ?3,
                 default_priority = ?4, default_status = ?5, require_description = ?6,
                 updated_at = ?7
                 WHERE id = ?1",
                params![
                    id.as_str(),
                    settings.auto_assignment,
                    settings.assignment_method.as_str(),
                    settings.default_priority.as_str(),
                    settings.default_status.as_str(),
                    settings.require_description,
                    format_timestamp(Utc::now()),
                ],
            )
            .context("saving settings")?;
        expect_one_row(changed, "projects", id).context("saving settings")
    }

    async fn set_last_assigned(&mut self, id: &ProjectId, index: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE projects SET last_assigned_index = ?2 WHERE id = ?1",
                params![id.as_str(), index],
            )
            .context("advancing round-robin cursor")?;
        expect_one_row(changed, "projects", id).context("advancing round-robin cursor")
    }

    async fn upsert_member(&mut self, id: &ProjectId, member: &Member) -> Result<()> {
        let exists = self.project_exists(id).context("saving member")?;
        expect_one_row(usize::from(exists), "projects", id).context("saving member")?;
        self.insert_member(id, member).context("saving member")?;
        Ok(())
    }

    async fn remove_member(&mut self, id: &ProjectId, user: &UserId) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
                params![id.as_str(), user.as_str()],
            )
            .context("removing member")?;
        expect_one_row(changed, "project_members", user).context("removing member")
    }

    async fn insert_activity(&mut self, activity: &RecentActivity) -> Result<()> {
        let old_values = activity
            .old_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("encoding snapshot")?;
        let new_values = activity
            .new_values
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("encoding snapshot")?;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO recent_activities ({ACTIVITY_COLUMNS}) VALUES ({})",
                    placeholders(10)
                ),
                params![
                    activity.id.0,
                    activity.user_id.as_str(),
                    activity.project_id.as_ref().map(ProjectId::as_str),
                    activity.issue_id.as_ref().map(IssueId::as_str),
                    activity.comment_id,
                    activity.item_id,
                    activity.activity_type.as_str(),
                    old_values,
                    new_values,
                    format_timestamp(activity.created_at),
                ],
            )
            .context("recording activity")?;
        Ok(())
    }

    async fn activities_for(&mut self, issues: &[IssueId]) -> Result<Vec<RecentActivity>> {
        if issues.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM recent_activities
             WHERE issue_id IN ({})
             ORDER BY seq DESC",
            placeholders(issues.len())
        );
        let args: Vec<&dyn ToSql> = issues.iter().map(|id| &id.0 as &dyn ToSql).collect();

        let mut stmt = self.conn.prepare(&sql).context("listing activity")?;
        let rows = stmt
            .query_map(args.as_slice(), row_to_activity)
            .context("listing activity")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("listing activity")?;

        rows.into_iter()
            .map(|row| {
                let activity_type = row.activity_type.parse::<ActivityType>().map_err(|reason| {
                    StorageError::CorruptRow {
                        table: "recent_activities",
                        reason,
                    }
                });
                Ok(RecentActivity {
                    id: row.id,
                    user_id: row.user_id,
                    project_id: row.project_id,
                    issue_id: row.issue_id,
                    comment_id: row.comment_id,
                    item_id: row.item_id,
                    activity_type: activity_type.context("listing activity")?,
                    old_values: row.old_values,
                    new_values: row.new_values,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.conn.execute_batch("COMMIT").context("committing")?;
        this.committed = true;
        Ok(())
    }
}
