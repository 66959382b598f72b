//! Store and Transaction trait implementations for in-memory storage.

use super::inner::StoreState;
use super::InMemoryStore;
use crate::domain::{
    Issue, IssueId, IssueStatus, IssueType, Member, Project, ProjectId, ProjectSettings,
    RecentActivity, Scope, UserId,
};
use crate::error::{Result, StorageContext, StorageError};
use crate::storage::{Store, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

/// A transaction over the in-memory state.
///
/// Holds the store lock for its whole life and works on a private copy of
/// the state.
pub(crate) struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
    fail_activity_writes: bool,
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            fail_activity_writes: self.activity_writes_fail(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn missing(table: &'static str, id: &impl ToString) -> StorageError {
    StorageError::MissingRow {
        table,
        id: id.to_string(),
    }
}

impl InMemoryTransaction {
    fn issue_mut(&mut self, id: &IssueId, context: &str) -> Result<&mut Issue> {
        self.working
            .issues
            .get_mut(id)
            .ok_or_else(|| missing("issues", id))
            .context(context)
    }

    fn project_mut(&mut self, id: &ProjectId, context: &str) -> Result<&mut Project> {
        self.working
            .projects
            .get_mut(id)
            .ok_or_else(|| missing("projects", id))
            .context(context)
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn get_issue(&mut self, id: &IssueId) -> Result<Option<Issue>> {
        Ok(self.working.issues.get(id).cloned())
    }

    async fn scope_issues(&mut self, scope: &Scope) -> Result<Vec<Issue>> {
        Ok(self.working.scope(scope))
    }

    async fn project_issues(&mut self, project: &ProjectId) -> Result<Vec<Issue>> {
        Ok(self.working.project(project))
    }

    async fn child_ids(&mut self, parent: &IssueId) -> Result<Vec<IssueId>> {
        let mut children: Vec<&Issue> = self
            .working
            .issues
            .values()
            .filter(|i| i.parent_id.as_ref() == Some(parent))
            .collect();
        children.sort_by_key(|i| i.order);
        Ok(children.into_iter().map(|i| i.id.clone()).collect())
    }

    async fn max_order(&mut self, scope: &Scope) -> Result<Option<i64>> {
        Ok(self
            .working
            .issues
            .values()
            .filter(|i| i.project_id == scope.project && i.parent_id == scope.parent)
            .map(|i| i.order)
            .max())
    }

    async fn insert_issue(&mut self, issue: &Issue) -> Result<()> {
        self.working.issues.insert(issue.id.clone(), issue.clone());
        Ok(())
    }

    async fn save_issue(&mut self, issue: &Issue) -> Result<()> {
        let stored = self.issue_mut(&issue.id, "saving issue")?;
        *stored = issue.clone();
        Ok(())
    }

    async fn clear_parent(&mut self, id: &IssueId, issue_type: IssueType) -> Result<()> {
        let issue = self.issue_mut(id, "clearing parent")?;
        issue.parent_id = None;
        issue.issue_type = issue_type;
        issue.updated_at = Utc::now();
        Ok(())
    }

    async fn rewrite_positions(&mut self, positions: &[(IssueId, i64)]) -> Result<()> {
        // Check every row first so a failed rewrite leaves nothing half-applied.
        if let Some((id, _)) = positions
            .iter()
            .find(|(id, _)| !self.working.issues.contains_key(id))
        {
            return Err(missing("issues", id)).context("rewriting positions");
        }
        for (id, order) in positions {
            if let Some(issue) = self.working.issues.get_mut(id) {
                issue.order = *order;
            }
        }
        Ok(())
    }

    async fn touch_issue(&mut self, id: &IssueId, at: DateTime<Utc>) -> Result<()> {
        self.issue_mut(id, "touching issue")?.updated_at = at;
        Ok(())
    }

    async fn delete_issue(&mut self, id: &IssueId) -> Result<()> {
        self.working
            .issues
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| missing("issues", id))
            .context("deleting issue")
    }

    async fn delete_children(&mut self, parent: &IssueId) -> Result<usize> {
        let before = self.working.issues.len();
        self.working
            .issues
            .retain(|_, issue| issue.parent_id.as_ref() != Some(parent));
        Ok(before - self.working.issues.len())
    }

    async fn count_open_assigned(&mut self, user: &UserId) -> Result<u64> {
        let count = self
            .working
            .issues
            .values()
            .filter(|i| i.assignee.as_ref() == Some(user) && i.status != IssueStatus::Done)
            .count();
        Ok(count as u64)
    }

    async fn get_project(&mut self, id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.working.projects.get(id).cloned())
    }

    async fn insert_project(&mut self, project: &Project) -> Result<()> {
        self.working
            .projects
            .insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn save_settings(&mut self, id: &ProjectId, settings: &ProjectSettings) -> Result<()> {
        let project = self.project_mut(id, "saving settings")?;
        project.settings = settings.clone();
        project.updated_at = Utc::now();
        Ok(())
    }

    async fn set_last_assigned(&mut self, id: &ProjectId, index: i64) -> Result<()> {
        self.project_mut(id, "advancing round-robin cursor")?
            .last_assigned_index = Some(index);
        Ok(())
    }

    async fn upsert_member(&mut self, id: &ProjectId, member: &Member) -> Result<()> {
        let project = self.project_mut(id, "saving member")?;
        match project
            .members
            .iter_mut()
            .find(|m| m.user_id == member.user_id)
        {
            Some(existing) => existing.role = member.role,
            None => project.members.push(member.clone()),
        }
        Ok(())
    }

    async fn remove_member(&mut self, id: &ProjectId, user: &UserId) -> Result<()> {
        let project = self.project_mut(id, "removing member")?;
        let before = project.members.len();
        project.members.retain(|m| &m.user_id != user);
        if project.members.len() == before {
            return Err(missing("project_members", user)).context("removing member");
        }
        Ok(())
    }

    async fn insert_activity(&mut self, activity: &RecentActivity) -> Result<()> {
        if self.fail_activity_writes {
            return Err(StorageError::Injected("activity insert")).context("recording activity");
        }
        self.working.activities.push(activity.clone());
        Ok(())
    }

    async fn activities_for(&mut self, issues: &[IssueId]) -> Result<Vec<RecentActivity>> {
        Ok(self
            .working
            .activities
            .iter()
            .rev()
            .filter(|a| a.issue_id.as_ref().is_some_and(|id| issues.contains(id)))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
