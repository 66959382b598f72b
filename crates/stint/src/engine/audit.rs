//! Audit trail helpers.
//!
//! Every mutating engine operation builds exactly one [`RecentActivity`] and
//! hands it to [`record`] inside the transaction that carries the mutation.

use crate::domain::{
    ActivityId, ActivityType, Issue, IssueId, ProjectId, RecentActivity, Snapshot, UserId,
};
use crate::error::Result;
use crate::storage::Transaction;
use chrono::Utc;

/// Message attached to reparent records.
pub(crate) const UPDATE_PARENT: &str = "update parent";

/// Message attached to remove-parent records.
pub(crate) const REMOVE_PARENT: &str = "remove parent";

impl RecentActivity {
    /// A fresh record of `activity_type` performed by `actor`, stamped now.
    pub fn new(actor: &UserId, activity_type: ActivityType) -> Self {
        Self {
            id: ActivityId::generate(),
            user_id: actor.clone(),
            project_id: None,
            issue_id: None,
            comment_id: None,
            item_id: None,
            activity_type,
            old_values: None,
            new_values: None,
            created_at: Utc::now(),
        }
    }

    /// Attach the affected project.
    #[must_use]
    pub fn for_project(mut self, project: &ProjectId) -> Self {
        self.project_id = Some(project.clone());
        self
    }

    /// Attach the affected issue.
    #[must_use]
    pub fn for_issue(mut self, issue: &IssueId) -> Self {
        self.issue_id = Some(issue.clone());
        self
    }

    /// Set the before-snapshot.
    #[must_use]
    pub fn with_old(mut self, values: Snapshot) -> Self {
        self.old_values = Some(values);
        self
    }

    /// Set the after-snapshot.
    #[must_use]
    pub fn with_new(mut self, values: Snapshot) -> Self {
        self.new_values = Some(values);
        self
    }
}

impl Snapshot {
    /// Editable fields of an issue, as captured by create and update.
    pub fn of_issue(issue: &Issue) -> Self {
        Self {
            title: Some(issue.title.clone()),
            description: issue.description.clone(),
            issue_type: Some(issue.issue_type),
            priority: Some(issue.priority),
            status: Some(issue.status),
            assignee: issue.assignee.clone(),
            reporter: issue.reporter.clone(),
            creator: issue.creator.clone(),
            parent: issue.parent_id.clone(),
            start_date: issue.start_date,
            due_date: issue.due_date,
            done_date: issue.done_date,
            ..Self::default()
        }
    }

    /// Fields that change when an issue is hung under a new parent.
    pub fn of_placement(issue: &Issue, message: &str) -> Self {
        Self {
            title: Some(issue.title.clone()),
            description: issue.description.clone(),
            issue_type: Some(issue.issue_type),
            priority: Some(issue.priority),
            status: Some(issue.status),
            assignee: issue.assignee.clone(),
            reporter: issue.reporter.clone(),
            parent: issue.parent_id.clone(),
            order: Some(issue.order),
            message: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Position of an issue: its order and parent.
    pub fn of_position(issue: &Issue) -> Self {
        Self {
            order: Some(issue.order),
            parent: issue.parent_id.clone(),
            ..Self::default()
        }
    }

    /// What a deleted root issue looked like.
    pub fn of_deleted(issue: &Issue) -> Self {
        Self {
            title: Some(issue.title.clone()),
            description: issue.description.clone(),
            status: Some(issue.status),
            priority: Some(issue.priority),
            assignee: issue.assignee.clone(),
            reporter: issue.reporter.clone(),
            parent: issue.parent_id.clone(),
            ..Self::default()
        }
    }
}

/// Write `activity` in `tx`.
pub(crate) async fn record(tx: &mut dyn Transaction, activity: &RecentActivity) -> Result<()> {
    tx.insert_activity(activity).await?;
    tracing::debug!(
        activity = %activity.activity_type,
        actor = %activity.user_id,
        issue = ?activity.issue_id,
        "Recorded activity"
    );
    Ok(())
}
