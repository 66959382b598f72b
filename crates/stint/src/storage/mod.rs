//! Storage abstraction layer for stint.
//!
//! This module provides the core storage traits and factory for creating
//! storage backends. It supports multiple implementations:
//!
//! - **In-memory**: Fast, ephemeral storage backed by HashMaps
//! - **SQLite**: Persistent relational storage with real transactions
//!
//! # Architecture
//!
//! Every engine operation runs inside one [`Transaction`]. A transaction is
//! obtained from [`Store::begin`], sees its own writes, and becomes visible
//! to other callers only after [`Transaction::commit`]. Dropping a
//! transaction without committing rolls it back, so an early `?` return from
//! anywhere in an operation leaves storage untouched.
//!
//! Both traits are object-safe, allowing for dynamic dispatch via
//! `Arc<dyn Store>` and `Box<dyn Transaction>`.
//!
//! # Isolation
//!
//! Transactions of one store are serialized. There is no finer-grained
//! locking: two reorders of the same scope simply run one after the other,
//! and the later commit wins.
//!
//! # Example
//!
//! ```no_run
//! use stint::storage::{create_store, StorageBackend};
//! use stint::domain::{ProjectId, Scope};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = create_store(&StorageBackend::InMemory).await?;
//!
//!     let mut tx = store.begin().await?;
//!     let issues = tx.scope_issues(&Scope::root(ProjectId::new("p1"))).await?;
//!     println!("{} root issues", issues.len());
//!
//!     Ok(())
//! }
//! ```

use crate::domain::{
    Issue, IssueId, IssueType, Member, Project, ProjectId, ProjectSettings, RecentActivity, Scope,
    UserId,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Storage backend implementations
pub mod in_memory;
pub mod sqlite;

/// A source of transactions.
///
/// Implementations must be `Send + Sync` so a single store can be shared by
/// the engine and its background side-effect worker.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new transaction.
    ///
    /// Waits until any transaction already in flight on this store finishes.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Short name of the backend, for logs.
    fn backend_name(&self) -> &'static str;
}

/// A unit of work against a store.
///
/// # Method Categories
///
/// - **Issues**: `get_issue`, `scope_issues`, `project_issues`, `child_ids`,
///   `insert_issue`, `save_issue`, `clear_parent`, `touch_issue`,
///   `delete_issue`, `delete_children`, `count_open_assigned`
/// - **Sequencing**: `max_order`, `rewrite_positions`
/// - **Projects**: `get_project`, `insert_project`, `save_settings`,
///   `set_last_assigned`, `upsert_member`, `remove_member`
/// - **Audit**: `insert_activity`, `activities_for`
///
/// # Error Handling
///
/// Backends report failures as `Error::Storage` with the operation that
/// failed. Writes that target a missing row fail with
/// `StorageError::MissingRow` rather than silently doing nothing.
#[async_trait]
pub trait Transaction: Send {
    // ========== Issues ==========

    /// Get an issue by ID. Returns `None` if it doesn't exist.
    async fn get_issue(&mut self, id: &IssueId) -> Result<Option<Issue>>;

    /// All issues of a scope, ordered by position.
    ///
    /// Equal positions (only possible with foreign data) come back in an
    /// unspecified order.
    async fn scope_issues(&mut self, scope: &Scope) -> Result<Vec<Issue>>;

    /// All issues of a project, roots first, each scope ordered by position.
    async fn project_issues(&mut self, project: &ProjectId) -> Result<Vec<Issue>>;

    /// Identifiers of the direct children of an issue.
    async fn child_ids(&mut self, parent: &IssueId) -> Result<Vec<IssueId>>;

    /// Highest position in a scope, `None` when the scope is empty.
    async fn max_order(&mut self, scope: &Scope) -> Result<Option<i64>>;

    /// Insert a new issue row.
    async fn insert_issue(&mut self, issue: &Issue) -> Result<()>;

    /// Overwrite every column of an existing issue row.
    async fn save_issue(&mut self, issue: &Issue) -> Result<()>;

    /// Clear an issue's parent and set its type, leaving its position as is.
    async fn clear_parent(&mut self, id: &IssueId, issue_type: IssueType) -> Result<()>;

    /// Set the positions of many issues in a single statement.
    async fn rewrite_positions(&mut self, positions: &[(IssueId, i64)]) -> Result<()>;

    /// Bump an issue's `updated_at`.
    async fn touch_issue(&mut self, id: &IssueId, at: DateTime<Utc>) -> Result<()>;

    /// Delete one issue row.
    async fn delete_issue(&mut self, id: &IssueId) -> Result<()>;

    /// Delete the direct children of an issue, returning how many went.
    async fn delete_children(&mut self, parent: &IssueId) -> Result<usize>;

    /// Number of issues assigned to `user` whose status is not `done`.
    async fn count_open_assigned(&mut self, user: &UserId) -> Result<u64>;

    // ========== Projects ==========

    /// Get a project with its settings and members.
    async fn get_project(&mut self, id: &ProjectId) -> Result<Option<Project>>;

    /// Insert a project together with its settings and members.
    async fn insert_project(&mut self, project: &Project) -> Result<()>;

    /// Replace a project's settings.
    async fn save_settings(&mut self, id: &ProjectId, settings: &ProjectSettings) -> Result<()>;

    /// Persist the round-robin cursor.
    async fn set_last_assigned(&mut self, id: &ProjectId, index: i64) -> Result<()>;

    /// Add a member, or change the role of an existing one.
    async fn upsert_member(&mut self, id: &ProjectId, member: &Member) -> Result<()>;

    /// Drop a member. The remaining members keep their relative order.
    async fn remove_member(&mut self, id: &ProjectId, user: &UserId) -> Result<()>;

    // ========== Audit ==========

    /// Append an activity record.
    async fn insert_activity(&mut self, activity: &RecentActivity) -> Result<()>;

    /// Activity records of the given issues, newest first.
    async fn activities_for(&mut self, issues: &[IssueId]) -> Result<Vec<RecentActivity>>;

    // ========== Lifecycle ==========

    /// Make every write of this transaction durable and visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Storage backend configuration.
///
/// Determines which storage implementation to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// `SQLite` database file (persistent)
    Sqlite(PathBuf),
}

impl StorageBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&Path> {
        match self {
            StorageBackend::Sqlite(path) => Some(path),
            StorageBackend::InMemory => None,
        }
    }
}

/// Create a store for the given backend.
///
/// # Errors
///
/// - `Error::Io` if the database directory cannot be created
/// - `Error::Storage` if the database cannot be opened or its schema applied
pub async fn create_store(backend: &StorageBackend) -> Result<Arc<dyn Store>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(in_memory::InMemoryStore::new())),
        StorageBackend::Sqlite(path) => {
            let store = sqlite::SqliteStore::open(path).await?;
            tracing::debug!(path = %path.display(), "Opened SQLite store");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for exercising both backends.

    use super::*;
    use crate::domain::{IssuePriority, IssueStatus, Role};

    pub(crate) fn project(id: &str, members: &[(&str, Role)]) -> Project {
        let now = Utc::now();
        Project {
            id: ProjectId::new(id),
            owner_id: UserId::new(members.first().map_or("owner", |m| m.0)),
            name: format!("Project {id}"),
            settings: ProjectSettings::default(),
            last_assigned_index: None,
            members: members
                .iter()
                .map(|(user, role)| Member {
                    user_id: UserId::new(*user),
                    role: *role,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn issue(id: &str, project: &str, parent: Option<&str>, order: i64) -> Issue {
        let now = Utc::now();
        Issue {
            id: IssueId::new(id),
            project_id: ProjectId::new(project),
            parent_id: parent.map(IssueId::new),
            title: format!("Issue {id}"),
            issue_type: if parent.is_some() {
                IssueType::Subtask
            } else {
                IssueType::Task
            },
            priority: IssuePriority::Medium,
            status: IssueStatus::Todo,
            assignee: None,
            reporter: None,
            creator: None,
            start_date: None,
            due_date: None,
            done_date: None,
            label: None,
            description: Some("description".to_string()),
            goal: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Runs the backend-agnostic contract against `store`.
    pub(crate) async fn exercise_contract(store: &dyn Store) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project("p1", &[("alice", Role::Owner), ("bob", Role::Editor)]))
            .await
            .unwrap();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            tx.insert_issue(&issue(id, "p1", None, i as i64)).await.unwrap();
        }
        tx.insert_issue(&issue("a1", "p1", Some("a"), 0)).await.unwrap();
        tx.commit().await.unwrap();

        let root = Scope::root(ProjectId::new("p1"));
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.max_order(&root).await.unwrap(), Some(2));
        let ids: Vec<_> = tx
            .scope_issues(&root)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id.0)
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);

        tx.rewrite_positions(&[
            (IssueId::new("c"), 0),
            (IssueId::new("a"), 1),
            (IssueId::new("b"), 2),
        ])
        .await
        .unwrap();
        let ids: Vec<_> = tx
            .scope_issues(&root)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id.0)
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
        drop(tx);

        // Dropped without commit: the rewrite is gone.
        let mut tx = store.begin().await.unwrap();
        let first = tx.scope_issues(&root).await.unwrap().remove(0);
        assert_eq!(first.id.as_str(), "a");

        assert_eq!(
            tx.child_ids(&IssueId::new("a")).await.unwrap(),
            vec![IssueId::new("a1")]
        );
        tx.clear_parent(&IssueId::new("a1"), IssueType::Task)
            .await
            .unwrap();
        let a1 = tx.get_issue(&IssueId::new("a1")).await.unwrap().unwrap();
        assert!(a1.parent_id.is_none());
        assert_eq!(a1.issue_type, IssueType::Task);
        assert_eq!(a1.order, 0);

        tx.set_last_assigned(&ProjectId::new("p1"), 1).await.unwrap();
        tx.upsert_member(
            &ProjectId::new("p1"),
            &Member {
                user_id: UserId::new("bob"),
                role: Role::Admin,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let project = tx.get_project(&ProjectId::new("p1")).await.unwrap().unwrap();
        assert_eq!(project.last_assigned_index, Some(1));
        assert_eq!(project.role_of(&UserId::new("bob")), Some(Role::Admin));
        assert_eq!(project.members.len(), 2);
        assert_eq!(project.members[0].user_id.as_str(), "alice");

        tx.remove_member(&ProjectId::new("p1"), &UserId::new("bob"))
            .await
            .unwrap();
        tx.upsert_member(
            &ProjectId::new("p1"),
            &Member {
                user_id: UserId::new("dave"),
                role: Role::Viewer,
            },
        )
        .await
        .unwrap();
        let project = tx.get_project(&ProjectId::new("p1")).await.unwrap().unwrap();
        let users: Vec<_> = project.members.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(users, ["alice", "dave"]);
        assert!(tx
            .remove_member(&ProjectId::new("p1"), &UserId::new("bob"))
            .await
            .is_err());

        assert!(tx.get_project(&ProjectId::new("missing")).await.unwrap().is_none());
        assert!(tx.clear_parent(&IssueId::new("missing"), IssueType::Task).await.is_err());
    }
}
