//! `SQLite` storage backend.
//!
//! Projects, members, issues and activity records live in one database file.
//! Each [`Transaction`](crate::storage::Transaction) takes the connection for
//! its whole life and wraps its statements in `BEGIN IMMEDIATE` / `COMMIT`.
//! A transaction dropped before `commit()` issues `ROLLBACK`.
//!
//! ## Blocking
//!
//! Statements run directly on the calling task; nothing is moved to
//! `spawn_blocking`. The store owns a single connection and every
//! transaction holds it from `BEGIN` to `COMMIT`, so there is no other work
//! for the runtime thread to overlap with. The CLI runs on a
//! `current_thread` runtime for the same reason. Embedders that share a
//! multi-threaded runtime with latency-sensitive tasks should drive the
//! engine from a dedicated runtime.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and column lists
//! - `trait_impl` - `Store` and `Transaction` implementations

mod helpers;
mod schema;
mod trait_impl;

use crate::error::{Result, StorageContext};
use rusqlite::Connection;
use schema::SCHEMA;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Persistent store backed by a single `SQLite` file.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// - `Error::Io` if the parent directory cannot be created
    /// - `Error::Storage` if the database cannot be opened or migrated
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(path).context("opening database")?;

        // Enable WAL mode and foreign keys
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;

        // Apply schema
        conn.execute_batch(SCHEMA).context("applying schema")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IssueId, ProjectId, Role, Scope};
    use crate::storage::test_support::{exercise_contract, issue, project};
    use crate::storage::Store;
    use tempfile::TempDir;

    #[tokio::test]
    async fn satisfies_the_store_contract() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("stint.db")).await.unwrap();
        exercise_contract(&store).await;
    }

    #[tokio::test]
    async fn committed_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("stint.db");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            let mut tx = store.begin().await.unwrap();
            tx.insert_project(&project("p1", &[("alice", Role::Owner)]))
                .await
                .unwrap();
            tx.insert_issue(&issue("a", "p1", None, 0)).await.unwrap();
            tx.commit().await.unwrap();

            // Never committed.
            let mut tx = store.begin().await.unwrap();
            tx.insert_issue(&issue("b", "p1", None, 1)).await.unwrap();
        }

        let store = SqliteStore::open(&path).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        let issues = tx.scope_issues(&Scope::root(ProjectId::new("p1"))).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, IssueId::new("a"));
        assert_eq!(issues[0].description.as_deref(), Some("description"));
    }

    #[tokio::test]
    async fn rewrite_of_unknown_issue_fails() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&dir.path().join("stint.db")).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project("p1", &[("alice", Role::Owner)]))
            .await
            .unwrap();
        tx.insert_issue(&issue("a", "p1", None, 0)).await.unwrap();

        let result = tx
            .rewrite_positions(&[(IssueId::new("a"), 1), (IssueId::new("ghost"), 0)])
            .await;
        assert!(result.is_err());
    }
}
