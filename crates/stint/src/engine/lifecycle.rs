//! Issue create, update and move, plus the read side.

use super::assignment::resolve_assignee;
use super::audit::record;
use super::hierarchy::relocate;
use super::sequence::{compact, next_position, reorder};
use super::{load_issue, load_project, require_role, Engine};
use crate::domain::{
    ActivityType, Issue, IssueId, IssueStatus, IssueType, IssueUpdate, MoveDirection, NewIssue,
    ProjectId, RecentActivity, Role, Scope, Snapshot, UserId,
};
use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Status-driven date changes applied on update.
///
/// - leaving `todo` for `on_progress` or `done` with no start date sets it
/// - entering `done` sets `done_date`
/// - leaving `done` keeps the previous `done_date`
/// - any other transition clears `done_date`
pub(crate) fn apply_status_dates(prev: &Issue, next: &mut Issue, now: DateTime<Utc>) {
    if prev.start_date.is_none()
        && next.start_date.is_none()
        && prev.status == IssueStatus::Todo
        && matches!(next.status, IssueStatus::OnProgress | IssueStatus::Done)
    {
        next.start_date = Some(now);
    }

    next.done_date = match (prev.status, next.status) {
        (IssueStatus::Done, _) => prev.done_date,
        (_, IssueStatus::Done) => Some(now),
        _ => None,
    };
}

fn trimmed_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle.into());
    }
    Ok(title.to_string())
}

impl Engine {
    /// Create an issue.
    ///
    /// Requires Admin on the project. The issue is appended to its scope and,
    /// when no assignee is given, auto-assigned according to the project
    /// settings. Root issues must carry a description when the project
    /// requires one.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty project reference or title, a missing
    ///   required description, or a parent in another project
    /// - `ProjectNotFound` / `IssueNotFound` for a missing project or parent
    /// - `PermissionDenied` below Admin
    pub async fn create_issue(&self, actor: &UserId, new: NewIssue) -> Result<Issue> {
        if new.project_id.is_empty() {
            return Err(ValidationError::EmptyProjectReference.into());
        }
        let title = trimmed_title(&new.title)?;
        debug!(actor = %actor, project = %new.project_id, "Creating issue");

        let mut tx = self.store.begin().await?;
        let project = load_project(tx.as_mut(), &new.project_id).await?;
        require_role(&project, actor, Role::Admin)?;

        if let Some(parent_id) = &new.parent_id {
            let parent = load_issue(tx.as_mut(), parent_id).await?;
            if parent.project_id != project.id {
                return Err(ValidationError::CrossProjectParent.into());
            }
        } else if project.settings.require_description && new.description.is_none() {
            return Err(ValidationError::DescriptionRequired.into());
        }

        let assignee = resolve_assignee(tx.as_mut(), &project, new.assignee).await?;
        let scope = Scope {
            project: project.id.clone(),
            parent: new.parent_id.clone(),
        };
        let order = next_position(tx.as_mut(), &scope).await?;

        let default_type = if new.parent_id.is_some() {
            IssueType::Subtask
        } else {
            IssueType::Task
        };
        let now = Utc::now();
        let issue = Issue {
            id: IssueId::generate(),
            project_id: project.id.clone(),
            parent_id: new.parent_id,
            title,
            issue_type: new.issue_type.unwrap_or(default_type),
            priority: new.priority.unwrap_or(project.settings.default_priority),
            status: new.status.unwrap_or(project.settings.default_status),
            assignee,
            reporter: Some(actor.clone()),
            creator: Some(actor.clone()),
            start_date: new.start_date,
            due_date: new.due_date,
            done_date: None,
            label: new.label,
            description: new.description,
            goal: new.goal,
            order,
            created_at: now,
            updated_at: now,
        };
        tx.insert_issue(&issue).await?;

        let activity = RecentActivity::new(actor, ActivityType::IssueCreate)
            .for_project(&issue.project_id)
            .for_issue(&issue.id)
            .with_new(Snapshot::of_issue(&issue));
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(issue = %issue.id, project = %issue.project_id, order, "Created issue");
        self.after_issue_commit(actor, &issue, true);
        Ok(issue)
    }

    /// Update an issue's fields.
    ///
    /// Requires Editor. Status changes drive `start_date` and `done_date`
    /// (see [`apply_status_dates`]). A parent change moves the issue to the
    /// end of its new scope, promotes or demotes its type unless the update
    /// sets one, and closes the gap it leaves behind.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` for a missing issue or new parent
    /// - `PermissionDenied` below Editor
    /// - `Validation` for an empty title, a self-parent or a cross-project
    ///   parent
    pub async fn update_issue(
        &self,
        actor: &UserId,
        id: &IssueId,
        changes: IssueUpdate,
    ) -> Result<Issue> {
        debug!(actor = %actor, issue = %id, "Updating issue");

        let mut tx = self.store.begin().await?;
        let prev = load_issue(tx.as_mut(), id).await?;
        let project = load_project(tx.as_mut(), &prev.project_id).await?;
        require_role(&project, actor, Role::Editor)?;

        let mut next = prev.clone();
        if let Some(title) = &changes.title {
            next.title = trimmed_title(title)?;
        }
        if let Some(description) = changes.description {
            next.description = description;
        }
        if let Some(priority) = changes.priority {
            next.priority = priority;
        }
        if let Some(issue_type) = changes.issue_type {
            next.issue_type = issue_type;
        }
        if let Some(status) = changes.status {
            next.status = status;
        }
        if let Some(assignee) = changes.assignee {
            next.assignee = assignee;
        }
        if let Some(reporter) = changes.reporter {
            next.reporter = reporter;
        }
        if let Some(label) = changes.label {
            next.label = label;
        }
        if let Some(goal) = changes.goal {
            next.goal = goal;
        }
        if let Some(start_date) = changes.start_date {
            next.start_date = start_date;
        }
        if let Some(due_date) = changes.due_date {
            next.due_date = due_date;
        }

        let now = Utc::now();
        apply_status_dates(&prev, &mut next, now);

        let vacated = match changes.parent_id {
            Some(parent) if parent != prev.parent_id => {
                relocate(
                    tx.as_mut(),
                    &mut next,
                    parent.as_ref(),
                    changes.issue_type.is_some(),
                )
                .await?;
                Some(prev.scope())
            }
            _ => None,
        };

        next.updated_at = now;
        tx.save_issue(&next).await?;
        if let Some(scope) = &vacated {
            compact(tx.as_mut(), scope).await?;
        }

        let activity = RecentActivity::new(actor, ActivityType::IssueUpdate)
            .for_project(&next.project_id)
            .for_issue(&next.id)
            .with_old(Snapshot::of_issue(&prev))
            .with_new(Snapshot::of_issue(&next));
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(issue = %next.id, status = %next.status, "Updated issue");
        self.after_issue_commit(actor, &next, false);
        Ok(next)
    }

    /// Move an issue within its scope.
    ///
    /// Requires Admin. Returns the scope in its resulting order. A move that
    /// would not change the issue's index records no activity; it writes
    /// nothing unless the scope has gaps to close.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` for a missing issue
    /// - `PermissionDenied` below Admin
    pub async fn move_issue(
        &self,
        actor: &UserId,
        id: &IssueId,
        direction: MoveDirection,
    ) -> Result<Vec<Issue>> {
        debug!(actor = %actor, issue = %id, %direction, "Moving issue");

        let mut tx = self.store.begin().await?;
        let issue = load_issue(tx.as_mut(), id).await?;
        let project = load_project(tx.as_mut(), &issue.project_id).await?;
        require_role(&project, actor, Role::Admin)?;

        let result = reorder(tx.as_mut(), &issue.scope(), id, direction).await?;
        if !result.changed {
            debug!(issue = %id, %direction, "Move is a no-op");
            return Ok(result.issues);
        }
        if !result.moved {
            tx.commit().await?;
            debug!(issue = %id, scope = %issue.scope(), "Closed gaps without moving");
            return Ok(result.issues);
        }

        let new_values = Snapshot {
            order: result.position_of(id),
            parent: issue.parent_id.clone(),
            affected: Some(result.issues.len()),
            ..Snapshot::default()
        };
        let activity = RecentActivity::new(actor, ActivityType::IssueMove)
            .for_project(&issue.project_id)
            .for_issue(&issue.id)
            .with_old(Snapshot::of_position(&issue))
            .with_new(new_values);
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(issue = %id, %direction, from = issue.order, "Moved issue");
        Ok(result.issues)
    }

    /// Fetch one issue. Requires Viewer.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` or `PermissionDenied`.
    pub async fn get_issue(&self, actor: &UserId, id: &IssueId) -> Result<Issue> {
        let mut tx = self.store.begin().await?;
        let issue = load_issue(tx.as_mut(), id).await?;
        let project = load_project(tx.as_mut(), &issue.project_id).await?;
        require_role(&project, actor, Role::Viewer)?;
        Ok(issue)
    }

    /// Issues of one scope in position order. Requires Viewer.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` or `PermissionDenied`.
    pub async fn scope_issues(
        &self,
        actor: &UserId,
        project: &ProjectId,
        parent: Option<&IssueId>,
    ) -> Result<Vec<Issue>> {
        let mut tx = self.store.begin().await?;
        let project = load_project(tx.as_mut(), project).await?;
        require_role(&project, actor, Role::Viewer)?;
        let scope = Scope {
            project: project.id,
            parent: parent.cloned(),
        };
        tx.scope_issues(&scope).await
    }

    /// Every issue of a project, roots first. Requires Viewer.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` or `PermissionDenied`.
    pub async fn project_issues(&self, actor: &UserId, project: &ProjectId) -> Result<Vec<Issue>> {
        let mut tx = self.store.begin().await?;
        let project = load_project(tx.as_mut(), project).await?;
        require_role(&project, actor, Role::Viewer)?;
        tx.project_issues(&project.id).await
    }

    /// Activity of an issue and its direct children, newest first.
    /// Requires Viewer.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` or `PermissionDenied`.
    pub async fn activities(&self, actor: &UserId, id: &IssueId) -> Result<Vec<RecentActivity>> {
        let mut tx = self.store.begin().await?;
        let issue = load_issue(tx.as_mut(), id).await?;
        let project = load_project(tx.as_mut(), &issue.project_id).await?;
        require_role(&project, actor, Role::Viewer)?;

        let mut ids = vec![issue.id];
        ids.extend(tx.child_ids(id).await?);
        tx.activities_for(&ids).await
    }
}
