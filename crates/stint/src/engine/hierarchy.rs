//! Parent links: reparent, remove-parent and delete.
//!
//! A project's issues form a forest. Hanging an issue under a parent moves it
//! to the end of the parent's children and turns a `task` into a `subtask`;
//! removing the parent does the reverse and sends it to the bottom of the
//! root scope. Either way the scope it left is compacted so positions stay
//! `0..n-1`.

use super::audit::{record, REMOVE_PARENT, UPDATE_PARENT};
use super::sequence::{compact, next_position, reorder};
use super::{load_issue, load_project, require_role, Engine};
use crate::domain::{
    ActivityType, Issue, IssueId, IssueStatus, IssueType, MoveDirection, RecentActivity, Role,
    Scope, Snapshot, UserId,
};
use crate::error::{Error, Result, StorageContext, StorageError, ValidationError};
use crate::storage::Transaction;
use chrono::Utc;
use tracing::{debug, info};

/// Type an issue takes when it gains a parent.
pub(crate) fn promote(issue_type: IssueType) -> IssueType {
    match issue_type {
        IssueType::Task => IssueType::Subtask,
        other => other,
    }
}

/// Type an issue takes when it loses its parent.
pub(crate) fn demote(issue_type: IssueType) -> IssueType {
    match issue_type {
        IssueType::Subtask => IssueType::Task,
        other => other,
    }
}

/// Reason an issue in `status` cannot be deleted, if any.
pub(crate) fn delete_conflict(status: IssueStatus) -> Option<&'static str> {
    match status {
        IssueStatus::OnProgress => Some("can't delete in progress issue"),
        IssueStatus::Done => Some("can't delete completed issue"),
        IssueStatus::Draft => Some("can't delete draft issue"),
        IssueStatus::Todo => None,
    }
}

fn same_project(child: &Issue, parent: &Issue) -> Result<()> {
    if child.project_id != parent.project_id {
        return Err(ValidationError::CrossProjectParent.into());
    }
    Ok(())
}

/// Point `issue` at `parent` and append it to the new scope.
///
/// Unless `keep_type` is set, a `task` gaining a parent becomes a `subtask`
/// and a `subtask` losing one becomes a `task`. Nothing is written; the
/// caller saves the issue and compacts the scope it left.
pub(crate) async fn relocate(
    tx: &mut dyn Transaction,
    issue: &mut Issue,
    parent: Option<&IssueId>,
    keep_type: bool,
) -> Result<()> {
    let parent = match parent {
        Some(parent_id) => {
            if parent_id == &issue.id {
                return Err(ValidationError::SelfParent.into());
            }
            let parent = load_issue(tx, parent_id).await?;
            same_project(issue, &parent)?;
            Some(parent.id)
        }
        None => None,
    };

    if !keep_type {
        issue.issue_type = if parent.is_some() {
            promote(issue.issue_type)
        } else {
            demote(issue.issue_type)
        };
    }
    issue.parent_id = parent;
    issue.order = next_position(tx, &issue.scope()).await?;
    Ok(())
}

impl Engine {
    /// Hang `id` under `parent_id`.
    ///
    /// Requires Admin. The issue is appended to the parent's children, a
    /// `task` becomes a `subtask`, and the scope it left is compacted.
    ///
    /// Only direct self-parenting is rejected; deeper cycles are not
    /// detected.
    ///
    /// # Errors
    ///
    /// - `Validation(SelfParent)` when `id == parent_id`
    /// - `IssueNotFound` for a missing issue or parent
    /// - `PermissionDenied` below Admin
    /// - `Validation(CrossProjectParent)` across projects
    /// - `Validation(Unchanged)` when already under `parent_id`
    pub async fn reparent(
        &self,
        actor: &UserId,
        id: &IssueId,
        parent_id: &IssueId,
    ) -> Result<Issue> {
        if id == parent_id {
            return Err(ValidationError::SelfParent.into());
        }
        debug!(actor = %actor, issue = %id, parent = %parent_id, "Reparenting issue");

        let mut tx = self.store.begin().await?;
        let child = load_issue(tx.as_mut(), id).await?;
        let parent = load_issue(tx.as_mut(), parent_id).await?;
        let project = load_project(tx.as_mut(), &child.project_id).await?;
        require_role(&project, actor, Role::Admin)?;
        same_project(&child, &parent)?;
        if child.parent_id.as_ref() == Some(parent_id) {
            return Err(ValidationError::Unchanged.into());
        }

        let vacated = child.scope();
        let mut next = child.clone();
        next.parent_id = Some(parent.id.clone());
        next.issue_type = promote(child.issue_type);
        next.order = next_position(tx.as_mut(), &next.scope()).await?;
        next.updated_at = Utc::now();
        tx.save_issue(&next).await?;
        compact(tx.as_mut(), &vacated).await?;

        let activity = RecentActivity::new(actor, ActivityType::IssueMove)
            .for_project(&next.project_id)
            .for_issue(&next.id)
            .with_old(Snapshot::of_placement(&child, UPDATE_PARENT))
            .with_new(Snapshot::of_placement(&next, UPDATE_PARENT));
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(issue = %next.id, parent = %parent.id, order = next.order, "Reparented issue");
        self.after_issue_commit(actor, &next, false);
        Ok(next)
    }

    /// Detach `id` from its parent and send it to the bottom of the root
    /// scope.
    ///
    /// Requires Admin. A `subtask` becomes a `task`. The activity is recorded
    /// against the former parent.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` for a missing issue
    /// - `PermissionDenied` below Admin
    /// - `Validation(Unchanged)` when the issue is already a root
    pub async fn remove_parent(&self, actor: &UserId, id: &IssueId) -> Result<Issue> {
        debug!(actor = %actor, issue = %id, "Removing parent");

        let mut tx = self.store.begin().await?;
        let issue = load_issue(tx.as_mut(), id).await?;
        let project = load_project(tx.as_mut(), &issue.project_id).await?;
        require_role(&project, actor, Role::Admin)?;
        let Some(old_parent) = issue.parent_id.clone() else {
            return Err(ValidationError::Unchanged.into());
        };

        tx.clear_parent(id, demote(issue.issue_type)).await?;
        let root = Scope::root(project.id.clone());
        let placed = reorder(tx.as_mut(), &root, id, MoveDirection::Bottom).await?;
        compact(
            tx.as_mut(),
            &Scope::children(project.id.clone(), old_parent.clone()),
        )
        .await?;

        let moved = placed
            .issues
            .into_iter()
            .find(|i| &i.id == id)
            .ok_or_else(|| StorageError::MissingRow {
                table: "issues",
                id: id.to_string(),
            })
            .context("placing issue in root scope")?;

        let old_values = Snapshot {
            issue_id: Some(issue.id.clone()),
            parent: Some(old_parent.clone()),
            message: Some(REMOVE_PARENT.to_string()),
            ..Snapshot::default()
        };
        let new_values = Snapshot {
            issue_id: Some(issue.id.clone()),
            parent: None,
            order: Some(moved.order),
            message: Some(REMOVE_PARENT.to_string()),
            ..Snapshot::default()
        };
        let activity = RecentActivity::new(actor, ActivityType::IssueMove)
            .for_project(&project.id)
            .for_issue(&old_parent)
            .with_old(old_values)
            .with_new(new_values);
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(issue = %id, former_parent = %old_parent, order = moved.order, "Removed parent");
        self.after_issue_commit(actor, &moved, false);
        Ok(moved)
    }

    /// Delete an issue.
    ///
    /// Requires Admin and a `todo` issue. Deleting a root also deletes its
    /// children; the issue's scope is compacted. Returns how many children
    /// went with it. Both kinds of delete are recorded against the deleted
    /// issue; a child's record names its parent in the snapshot.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` for a missing issue
    /// - `Conflict` when the status blocks deletion
    /// - `PermissionDenied` below Admin
    pub async fn delete_issue(&self, actor: &UserId, id: &IssueId) -> Result<usize> {
        debug!(actor = %actor, issue = %id, "Deleting issue");

        let mut tx = self.store.begin().await?;
        let issue = load_issue(tx.as_mut(), id).await?;
        if let Some(reason) = delete_conflict(issue.status) {
            return Err(Error::Conflict(reason.to_string()));
        }
        let project = load_project(tx.as_mut(), &issue.project_id).await?;
        require_role(&project, actor, Role::Admin)?;

        let removed = if issue.is_root() {
            tx.delete_children(id).await?
        } else {
            0
        };
        reorder(tx.as_mut(), &issue.scope(), id, MoveDirection::Bottom).await?;

        let activity = match &issue.parent_id {
            Some(parent_id) => {
                let parent_title = tx.get_issue(parent_id).await?.map(|p| p.title);
                let old_values = Snapshot {
                    issue_id: Some(issue.id.clone()),
                    title: Some(issue.title.clone()),
                    parent_issue_id: Some(parent_id.clone()),
                    parent_issue_title: parent_title,
                    ..Snapshot::default()
                };
                RecentActivity::new(actor, ActivityType::IssueChildrenDelete)
                    .for_project(&issue.project_id)
                    .for_issue(&issue.id)
                    .with_old(old_values)
            }
            None => RecentActivity::new(actor, ActivityType::IssueDelete)
                .for_project(&issue.project_id)
                .for_issue(&issue.id)
                .with_old(Snapshot::of_deleted(&issue))
                .with_new(Snapshot {
                    affected: Some(removed),
                    ..Snapshot::default()
                }),
        };
        record(tx.as_mut(), &activity).await?;
        tx.delete_issue(id).await?;
        tx.commit().await?;

        info!(issue = %id, children = removed, "Deleted issue");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueUpdate, ProjectSettings};
    use crate::engine::testing::Harness;
    use crate::storage::Store;
    use rstest::rstest;

    #[rstest]
    #[case(IssueType::Task, IssueType::Subtask)]
    #[case(IssueType::Bug, IssueType::Bug)]
    #[case(IssueType::Epic, IssueType::Epic)]
    fn promotion_only_touches_tasks(#[case] from: IssueType, #[case] to: IssueType) {
        assert_eq!(promote(from), to);
    }

    #[rstest]
    #[case(IssueType::Subtask, IssueType::Task)]
    #[case(IssueType::Story, IssueType::Story)]
    fn demotion_only_touches_subtasks(#[case] from: IssueType, #[case] to: IssueType) {
        assert_eq!(demote(from), to);
    }

    #[tokio::test]
    async fn reparent_appends_promotes_and_compacts() {
        let h = Harness::new().await;
        let a = h.create("A", None).await;
        let b = h.create("B", None).await;
        let c = h.create("C", None).await;
        let existing = h.create("Existing child", Some(&c.id)).await;

        let moved = h.engine.reparent(&h.owner, &a.id, &c.id).await.unwrap();

        assert_eq!(moved.parent_id.as_ref(), Some(&c.id));
        assert_eq!(moved.issue_type, IssueType::Subtask);
        assert_eq!(moved.order, 1);
        assert_eq!(h.children(&c.id).await, [(existing.id, 0), (a.id.clone(), 1)]);
        assert_eq!(h.roots().await, [(b.id, 0), (c.id, 1)]);

        let activity = h.engine.activities(&h.owner, &a.id).await.unwrap();
        assert_eq!(activity[0].activity_type, ActivityType::IssueMove);
        let new = activity[0].new_values.as_ref().unwrap();
        assert_eq!(new.message.as_deref(), Some(UPDATE_PARENT));
        assert_eq!(new.order, Some(1));
    }

    #[tokio::test]
    async fn reparent_rejects_self_before_reading() {
        let h = Harness::new().await;
        let missing = IssueId::new("missing");

        let err = h
            .engine
            .reparent(&h.owner, &missing, &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::SelfParent)));
    }

    #[tokio::test]
    async fn reparent_rejects_cross_project_parent() {
        let h = Harness::new().await;
        let other = h
            .engine
            .create_project(&h.owner, "Other", ProjectSettings::default())
            .await
            .unwrap();
        let here = h.create("Here", None).await;
        let there = h
            .engine
            .create_issue(
                &h.owner,
                crate::domain::NewIssue {
                    project_id: other.id,
                    title: "There".to_string(),
                    description: Some("elsewhere".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = h
            .engine
            .reparent(&h.owner, &here.id, &there.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::CrossProjectParent)
        ));
    }

    #[tokio::test]
    async fn reparent_under_current_parent_is_unchanged() {
        let h = Harness::new().await;
        let parent = h.create("Parent", None).await;
        let child = h.create("Child", Some(&parent.id)).await;

        let err = h
            .engine
            .reparent(&h.owner, &child.id, &parent.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Unchanged)));
    }

    #[tokio::test]
    async fn reparent_requires_admin() {
        let h = Harness::new().await;
        let parent = h.create("Parent", None).await;
        let issue = h.create("Loose", None).await;

        let err = h
            .engine
            .reparent(&h.editor, &issue.id, &parent.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn remove_parent_demotes_and_sends_to_bottom() {
        let h = Harness::new().await;
        let parent = h.create("Parent", None).await;
        let other = h.create("Other", None).await;
        let first = h.create("First", Some(&parent.id)).await;
        let second = h.create("Second", Some(&parent.id)).await;

        let moved = h.engine.remove_parent(&h.owner, &first.id).await.unwrap();

        assert!(moved.is_root());
        assert_eq!(moved.issue_type, IssueType::Task);
        assert_eq!(
            h.roots().await,
            [(parent.id.clone(), 0), (other.id, 1), (first.id.clone(), 2)]
        );
        assert_eq!(h.children(&parent.id).await, [(second.id, 0)]);

        // Recorded against the former parent.
        let activity = h.engine.activities(&h.owner, &parent.id).await.unwrap();
        assert_eq!(activity[0].activity_type, ActivityType::IssueMove);
        assert_eq!(activity[0].issue_id.as_ref(), Some(&parent.id));
        let old = activity[0].old_values.as_ref().unwrap();
        assert_eq!(old.issue_id.as_ref(), Some(&first.id));
        assert_eq!(old.message.as_deref(), Some(REMOVE_PARENT));
        assert_eq!(activity[0].new_values.as_ref().unwrap().order, Some(2));
    }

    #[tokio::test]
    async fn remove_parent_of_root_is_unchanged() {
        let h = Harness::new().await;
        let root = h.create("Root", None).await;

        let err = h.engine.remove_parent(&h.owner, &root.id).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::Unchanged)));
    }

    #[rstest]
    #[case(IssueStatus::OnProgress, "can't delete in progress issue")]
    #[case(IssueStatus::Done, "can't delete completed issue")]
    #[case(IssueStatus::Draft, "can't delete draft issue")]
    #[tokio::test]
    async fn delete_is_blocked_by_status(#[case] status: IssueStatus, #[case] reason: &str) {
        let h = Harness::new().await;
        let issue = h.create("Busy", None).await;
        h.engine
            .update_issue(
                &h.owner,
                &issue.id,
                IssueUpdate {
                    status: Some(status),
                    ..IssueUpdate::default()
                },
            )
            .await
            .unwrap();

        let err = h.engine.delete_issue(&h.owner, &issue.id).await.unwrap_err();
        match err {
            Error::Conflict(message) => assert_eq!(message, reason),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleting_a_root_takes_its_children_and_compacts() {
        let h = Harness::new().await;
        let first = h.create("First", None).await;
        let doomed = h.create("Doomed", None).await;
        let last = h.create("Last", None).await;
        let child = h.create("Child", Some(&doomed.id)).await;
        h.create("Child 2", Some(&doomed.id)).await;

        let removed = h.engine.delete_issue(&h.owner, &doomed.id).await.unwrap();

        assert_eq!(removed, 2);
        assert_eq!(h.roots().await, [(first.id, 0), (last.id, 1)]);
        assert!(h
            .engine
            .get_issue(&h.owner, &child.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn deleting_a_child_is_recorded_on_the_child() {
        let h = Harness::new().await;
        let parent = h.create("Parent", None).await;
        let first = h.create("First", Some(&parent.id)).await;
        let second = h.create("Second", Some(&parent.id)).await;

        assert_eq!(h.engine.delete_issue(&h.owner, &first.id).await.unwrap(), 0);

        assert_eq!(h.children(&parent.id).await, [(second.id, 0)]);
        let on_parent = h.engine.activities(&h.owner, &parent.id).await.unwrap();
        assert!(on_parent
            .iter()
            .all(|a| a.activity_type != ActivityType::IssueChildrenDelete));

        let mut tx = h.store.begin().await.unwrap();
        let activity = tx.activities_for(&[first.id.clone()]).await.unwrap();
        assert_eq!(activity[0].activity_type, ActivityType::IssueChildrenDelete);
        assert_eq!(activity[0].issue_id.as_ref(), Some(&first.id));
        let old = activity[0].old_values.as_ref().unwrap();
        assert_eq!(old.issue_id.as_ref(), Some(&first.id));
        assert_eq!(old.parent_issue_title.as_deref(), Some("Parent"));
    }

    #[tokio::test]
    async fn failed_audit_write_rolls_back_delete() {
        let h = Harness::new().await;
        let parent = h.create("Parent", None).await;
        let child = h.create("Child", Some(&parent.id)).await;
        h.store.fail_activity_writes(true);

        assert!(h.engine.delete_issue(&h.owner, &parent.id).await.is_err());

        h.store.fail_activity_writes(false);
        assert_eq!(h.roots().await, [(parent.id.clone(), 0)]);
        assert_eq!(h.children(&parent.id).await, [(child.id, 0)]);
    }

    #[tokio::test]
    async fn failed_audit_write_rolls_back_reparent() {
        let h = Harness::new().await;
        let a = h.create("A", None).await;
        let b = h.create("B", None).await;
        h.store.fail_activity_writes(true);

        assert!(h.engine.reparent(&h.owner, &a.id, &b.id).await.is_err());

        h.store.fail_activity_writes(false);
        assert_eq!(h.roots().await, [(a.id, 0), (b.id.clone(), 1)]);
        assert!(h.children(&b.id).await.is_empty());
    }

    #[tokio::test]
    async fn failed_audit_write_rolls_back_remove_parent() {
        let h = Harness::new().await;
        let parent = h.create("P", None).await;
        let child = h.create("C", Some(&parent.id)).await;
        h.store.fail_activity_writes(true);

        assert!(h.engine.remove_parent(&h.owner, &child.id).await.is_err());

        h.store.fail_activity_writes(false);
        assert_eq!(h.roots().await, [(parent.id.clone(), 0)]);
        assert_eq!(h.children(&parent.id).await, [(child.id.clone(), 0)]);
        let stored = h.engine.get_issue(&h.owner, &child.id).await.unwrap();
        assert_eq!(stored.issue_type, IssueType::Subtask);
    }
}
