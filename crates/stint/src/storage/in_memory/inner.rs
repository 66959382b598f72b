//! Core in-memory storage data structures.
//!
//! This module contains the state that is cloned into every transaction and
//! swapped back on commit.

use crate::domain::{Issue, IssueId, Project, ProjectId, RecentActivity, Scope};
use std::collections::HashMap;

/// Everything the in-memory store knows.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    /// Issue arena indexed by ID for O(1) lookups
    pub(super) issues: HashMap<IssueId, Issue>,

    /// Projects with their settings and members
    pub(super) projects: HashMap<ProjectId, Project>,

    /// Append-only audit log, oldest first
    pub(super) activities: Vec<RecentActivity>,
}

impl StoreState {
    /// Issues of a scope, ordered by position.
    ///
    /// Ties on position are broken by creation time and then ID so listings
    /// stay stable across calls.
    pub(super) fn scope(&self, scope: &Scope) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self
            .issues
            .values()
            .filter(|i| i.project_id == scope.project && i.parent_id == scope.parent)
            .cloned()
            .collect();
        sort_by_position(&mut issues);
        issues
    }

    /// Every issue of a project: roots first, then children grouped by parent.
    pub(super) fn project(&self, project: &ProjectId) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self
            .issues
            .values()
            .filter(|i| &i.project_id == project)
            .cloned()
            .collect();
        issues.sort_by(|a, b| {
            a.parent_id
                .is_some()
                .cmp(&b.parent_id.is_some())
                .then_with(|| a.parent_id.cmp(&b.parent_id))
                .then(a.order.cmp(&b.order))
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        issues
    }
}

fn sort_by_position(issues: &mut [Issue]) {
    issues.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then(a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
