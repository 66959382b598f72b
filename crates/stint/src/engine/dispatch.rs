//! Best-effort side effects run after a transaction commits.
//!
//! This module provides [`Dispatcher`], a background worker that receives
//! [`SideEffect`]s over a bounded channel and applies them one at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────────────────────┐
//! │  Engine operation            │  Worker task                     │
//! │  ────────────────            │  ───────────                     │
//! │  commit transaction          │  recv() from channel             │
//! │  dispatch() ─────────────────┼→ notify / touch parent           │
//! │  return to caller            │  log failures, continue          │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Side effects never block the caller and are never retried. A full queue
//! drops the effect with a warning; a failing effect is logged and
//! forgotten.

use crate::domain::{Issue, IssueId, UserId};
use crate::error::Result;
use crate::storage::Store;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default capacity of the side-effect queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Receiver of issue change notifications.
///
/// Implementations push the change to whatever fan-out the host application
/// runs (websockets, mail, ...). Errors are logged by the dispatcher and
/// otherwise ignored.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// `actor` created (`is_new`) or updated `issue`.
    async fn issue_changed(&self, actor: &UserId, issue: &Issue, is_new: bool) -> Result<()>;
}

/// Notifier that only writes a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn issue_changed(&self, actor: &UserId, issue: &Issue, is_new: bool) -> Result<()> {
        info!(
            actor = %actor,
            issue = %issue.id,
            project = %issue.project_id,
            is_new,
            "Issue changed"
        );
        Ok(())
    }
}

/// Work queued for after a commit.
#[derive(Debug, Clone)]
pub enum SideEffect {
    /// Tell the notifier about a created or updated issue.
    Notify {
        /// Who made the change
        actor: UserId,
        /// The issue as committed
        issue: Box<Issue>,
        /// `true` for a creation
        is_new: bool,
    },

    /// Bump a parent's `updated_at`, in its own transaction.
    TouchIssue(IssueId),
}

/// Bounded queue drained by a single worker task.
pub struct Dispatcher {
    /// Channel sender for queued effects.
    sender: mpsc::Sender<SideEffect>,
    /// Handle to the worker task.
    handle: JoinHandle<()>,
}

impl Dispatcher {
    /// Start the worker on the current Tokio runtime.
    ///
    /// A `capacity` of 0 is raised to 1.
    pub fn spawn(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(store, notifier, receiver));
        Self { sender, handle }
    }

    /// Queue `effect` without waiting. Dropped with a warning if the queue
    /// is full or the worker is gone.
    pub fn dispatch(&self, effect: SideEffect) {
        match self.sender.try_send(effect) {
            Ok(()) => {}
            Err(TrySendError::Full(effect)) => {
                warn!(effect = ?effect, "Side-effect queue full, dropping");
            }
            Err(TrySendError::Closed(effect)) => {
                warn!(effect = ?effect, "Side-effect worker stopped, dropping");
            }
        }
    }

    /// Close the queue and wait until every queued effect has run.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Side-effect worker panicked");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capacity", &self.sender.max_capacity())
            .finish_non_exhaustive()
    }
}

async fn run_worker(
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    mut receiver: mpsc::Receiver<SideEffect>,
) {
    while let Some(effect) = receiver.recv().await {
        if let Err(e) = apply(store.as_ref(), notifier.as_ref(), &effect).await {
            warn!(effect = ?effect, error = %e, "Side effect failed");
        }
    }
    debug!("Side-effect worker finished");
}

async fn apply(store: &dyn Store, notifier: &dyn Notifier, effect: &SideEffect) -> Result<()> {
    match effect {
        SideEffect::Notify {
            actor,
            issue,
            is_new,
        } => notifier.issue_changed(actor, issue, *is_new).await,
        SideEffect::TouchIssue(id) => {
            let mut tx = store.begin().await?;
            tx.touch_issue(id, Utc::now()).await?;
            tx.commit().await?;
            debug!(issue = %id, "Touched issue");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::error::Error;
    use crate::storage::in_memory::InMemoryStore;
    use crate::storage::test_support::{issue, project};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(String, bool)>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn issue_changed(&self, _actor: &UserId, issue: &Issue, is_new: bool) -> Result<()> {
            self.0.lock().unwrap().push((issue.id.0.clone(), is_new));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn issue_changed(&self, _: &UserId, _: &Issue, _: bool) -> Result<()> {
            Err(Error::Config("push unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn runs_queued_effects_before_shutdown_returns() {
        let store = Arc::new(InMemoryStore::new());
        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project("p1", &[("alice", Role::Owner)]))
            .await
            .unwrap();
        let parent = issue("parent", "p1", None, 0);
        tx.insert_issue(&parent).await.unwrap();
        tx.commit().await.unwrap();

        let notifier = Arc::new(Recording::default());
        let dispatcher = Dispatcher::spawn(store.clone(), notifier.clone(), 8);
        dispatcher.dispatch(SideEffect::Notify {
            actor: UserId::new("alice"),
            issue: Box::new(parent.clone()),
            is_new: true,
        });
        dispatcher.dispatch(SideEffect::TouchIssue(parent.id.clone()));
        dispatcher.shutdown().await;

        assert_eq!(
            *notifier.0.lock().unwrap(),
            vec![("parent".to_string(), true)]
        );
        let mut tx = store.begin().await.unwrap();
        let touched = tx.get_issue(&parent.id).await.unwrap().unwrap();
        assert!(touched.updated_at > parent.updated_at);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_worker() {
        let store = Arc::new(InMemoryStore::new());
        let dispatcher = Dispatcher::spawn(store, Arc::new(Failing), 4);

        // Neither the failing notifier nor the missing issue stops the queue.
        dispatcher.dispatch(SideEffect::TouchIssue(IssueId::new("missing")));
        dispatcher.dispatch(SideEffect::Notify {
            actor: UserId::new("alice"),
            issue: Box::new(issue("i1", "p1", None, 0)),
            is_new: false,
        });
        dispatcher.dispatch(SideEffect::TouchIssue(IssueId::new("missing")));
        dispatcher.shutdown().await;
    }
}
