//! In-memory storage backend.
//!
//! This module provides a fast, **ephemeral** storage implementation where all data
//! is held in RAM and **lost when the process exits**. It is suitable for:
//!
//! - Testing and development
//! - Embedding the engine in a short-lived process
//!
//! # Transactions
//!
//! The whole state sits behind one `tokio::sync::Mutex`. Beginning a
//! transaction takes the lock and clones the state into a working copy; every
//! read and write of the transaction goes to that copy. `commit()` swaps the
//! working copy in, while dropping the transaction simply discards it. The
//! lock is held for the life of the transaction, so transactions are fully
//! serialized.
//!
//! # Performance Characteristics
//!
//! - Begin: O(n) clone of the state
//! - Issue lookup: O(1)
//! - Scope listing: O(n log n) over the project's issues

mod inner;
mod trait_impl;

use inner::StoreState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe in-memory store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    fail_activity_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create a new, empty store.
    ///
    /// # Example
    ///
    /// ```
    /// use stint::storage::in_memory::InMemoryStore;
    /// use stint::storage::Store;
    ///
    /// let store = InMemoryStore::new();
    /// assert_eq!(store.backend_name(), "memory");
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent activity insert fail, to exercise rollback.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_activity_writes(&self, fail: bool) {
        self.fail_activity_writes.store(fail, Ordering::SeqCst);
    }

    fn activity_writes_fail(&self) -> bool {
        self.fail_activity_writes.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("fail_activity_writes", &self.activity_writes_fail())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::exercise_contract;

    #[tokio::test]
    async fn satisfies_the_store_contract() {
        let store = InMemoryStore::new();
        exercise_contract(&store).await;
    }
}
