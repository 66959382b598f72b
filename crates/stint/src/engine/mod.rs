//! The issue hierarchy and sequencing engine.
//!
//! [`Engine`] is the façade every caller goes through. Each mutating
//! operation follows the same shape:
//!
//! 1. begin a storage transaction
//! 2. load the issue and its project, check the caller's role
//! 3. apply hierarchy, sequencing and assignment rules
//! 4. write the mutation and its audit record
//! 5. commit, then queue post-commit side effects
//!
//! Any error before the commit drops the transaction, which rolls back every
//! write of the operation, the audit record included.
//!
//! ## Module Structure
//!
//! - `sequence` - positions within a scope (`next_position`, `reorder`, `compact`)
//! - `hierarchy` - reparent, remove-parent and delete
//! - `lifecycle` - create, update, move, and issue reads
//! - `projects` - project creation, membership, settings
//! - `assignment` - auto-assignment policies
//! - `audit` - activity records and snapshots
//! - `dispatch` - post-commit side effects

mod assignment;
mod audit;
pub mod dispatch;
mod hierarchy;
mod lifecycle;
mod projects;
pub mod sequence;

pub use dispatch::{Dispatcher, LogNotifier, Notifier, SideEffect, DEFAULT_QUEUE_CAPACITY};

use crate::domain::{Issue, IssueId, Project, ProjectId, Role, UserId};
use crate::error::{Error, Result};
use crate::storage::{Store, Transaction};
use std::sync::Arc;

/// Orchestrates every issue and project operation over a [`Store`].
pub struct Engine {
    store: Arc<dyn Store>,
    side_effects: Dispatcher,
}

impl Engine {
    /// Create an engine that logs notifications.
    ///
    /// Must be called from within a Tokio runtime: the side-effect worker is
    /// spawned immediately.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_notifier(store, Arc::new(LogNotifier), DEFAULT_QUEUE_CAPACITY)
    }

    /// Create an engine with a custom notifier and side-effect queue size.
    pub fn with_notifier(
        store: Arc<dyn Store>,
        notifier: Arc<dyn Notifier>,
        queue_capacity: usize,
    ) -> Self {
        let side_effects = Dispatcher::spawn(store.clone(), notifier, queue_capacity);
        Self {
            store,
            side_effects,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Wait for queued side effects, then stop the worker.
    pub async fn shutdown(self) {
        self.side_effects.shutdown().await;
    }

    fn dispatch(&self, effect: SideEffect) {
        self.side_effects.dispatch(effect);
    }

    /// Queue the notification for a committed create or update, then the
    /// parent touch.
    fn after_issue_commit(&self, actor: &UserId, issue: &Issue, is_new: bool) {
        self.dispatch(SideEffect::Notify {
            actor: actor.clone(),
            issue: Box::new(issue.clone()),
            is_new,
        });
        if let Some(parent) = &issue.parent_id {
            self.dispatch(SideEffect::TouchIssue(parent.clone()));
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.store.backend_name())
            .field("side_effects", &self.side_effects)
            .finish()
    }
}

async fn load_issue(tx: &mut dyn Transaction, id: &IssueId) -> Result<Issue> {
    tx.get_issue(id)
        .await?
        .ok_or_else(|| Error::IssueNotFound(id.clone()))
}

async fn load_project(tx: &mut dyn Transaction, id: &ProjectId) -> Result<Project> {
    tx.get_project(id)
        .await?
        .ok_or_else(|| Error::ProjectNotFound(id.clone()))
}

/// Fail unless `user` holds at least `minimum` on `project`.
fn require_role(project: &Project, user: &UserId, minimum: Role) -> Result<()> {
    match project.role_of(user) {
        Some(role) if role >= minimum => Ok(()),
        _ => Err(Error::PermissionDenied {
            user: user.clone(),
            project: project.id.clone(),
            required: minimum,
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! An engine over a fresh in-memory store with a three-member project.

    use super::*;
    use crate::domain::{NewIssue, ProjectSettings, Scope};
    use crate::storage::in_memory::InMemoryStore;

    pub(crate) struct Harness {
        pub(crate) engine: Engine,
        pub(crate) store: InMemoryStore,
        pub(crate) project: Project,
        pub(crate) owner: UserId,
        pub(crate) editor: UserId,
        pub(crate) viewer: UserId,
    }

    impl Harness {
        pub(crate) async fn new() -> Self {
            let store = InMemoryStore::new();
            let engine = Engine::new(Arc::new(store.clone()));
            let owner = UserId::new("alice");
            let editor = UserId::new("bob");
            let viewer = UserId::new("carol");

            let project = engine
                .create_project(&owner, "Demo", ProjectSettings::default())
                .await
                .unwrap();
            engine
                .add_member(&owner, &project.id, &editor, Role::Editor)
                .await
                .unwrap();
            let project = engine
                .add_member(&owner, &project.id, &viewer, Role::Viewer)
                .await
                .unwrap();

            Self {
                engine,
                store,
                project,
                owner,
                editor,
                viewer,
            }
        }

        pub(crate) fn new_issue(&self, title: &str, parent: Option<&IssueId>) -> NewIssue {
            NewIssue {
                project_id: self.project.id.clone(),
                title: title.to_string(),
                parent_id: parent.cloned(),
                description: Some(format!("{title} details")),
                ..NewIssue::default()
            }
        }

        pub(crate) async fn create(&self, title: &str, parent: Option<&IssueId>) -> Issue {
            self.engine
                .create_issue(&self.owner, self.new_issue(title, parent))
                .await
                .unwrap()
        }

        async fn positions(&self, scope: Scope) -> Vec<(IssueId, i64)> {
            let mut tx = self.store.begin().await.unwrap();
            tx.scope_issues(&scope)
                .await
                .unwrap()
                .into_iter()
                .map(|i| (i.id, i.order))
                .collect()
        }

        /// Root issues as `(id, order)` in position order.
        pub(crate) async fn roots(&self) -> Vec<(IssueId, i64)> {
            self.positions(Scope::root(self.project.id.clone())).await
        }

        /// Children of `parent` as `(id, order)` in position order.
        pub(crate) async fn children(&self, parent: &IssueId) -> Vec<(IssueId, i64)> {
            self.positions(Scope::children(self.project.id.clone(), parent.clone()))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::project;
    use rstest::rstest;

    #[rstest]
    #[case(Role::Viewer, Role::Viewer, true)]
    #[case(Role::Editor, Role::Admin, false)]
    #[case(Role::Admin, Role::Admin, true)]
    #[case(Role::Owner, Role::Admin, true)]
    fn role_check_compares_ranks(
        #[case] held: Role,
        #[case] minimum: Role,
        #[case] allowed: bool,
    ) {
        let project = project("p1", &[("u", held)]);
        assert_eq!(
            require_role(&project, &UserId::new("u"), minimum).is_ok(),
            allowed
        );
    }

    #[test]
    fn non_members_are_denied() {
        let project = project("p1", &[("u", Role::Owner)]);
        let err = require_role(&project, &UserId::new("stranger"), Role::Viewer).unwrap_err();
        assert!(matches!(
            err,
            Error::PermissionDenied {
                required: Role::Viewer,
                ..
            }
        ));
    }
}
