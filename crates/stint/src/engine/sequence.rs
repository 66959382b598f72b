//! Positional ordering of issues within a scope.
//!
//! Every scope keeps its positions as the contiguous sequence `0..n-1`.
//! New issues are appended with [`next_position`]; moves go through
//! [`reorder`], which splices the issue to its target index and rewrites the
//! whole scope in one bulk statement.

use crate::domain::{Issue, IssueId, MoveDirection, Scope};
use crate::error::{Result, StorageContext, StorageError};
use crate::storage::Transaction;

/// Outcome of a [`reorder`].
#[derive(Debug)]
pub(crate) struct Reordered {
    /// The scope in its new order, positions already updated.
    pub(crate) issues: Vec<Issue>,

    /// Whether any position was written.
    pub(crate) changed: bool,

    /// Whether the issue changed places relative to its siblings. `false`
    /// for a move that only closed gaps in the scope.
    pub(crate) moved: bool,
}

impl Reordered {
    /// Position the moved issue ended up at.
    pub(crate) fn position_of(&self, id: &IssueId) -> Option<i64> {
        self.issues.iter().find(|i| &i.id == id).map(|i| i.order)
    }
}

/// Position for an issue appended to `scope`: one past the highest, or 0.
pub(crate) async fn next_position(tx: &mut dyn Transaction, scope: &Scope) -> Result<i64> {
    Ok(tx.max_order(scope).await?.map_or(0, |max| max + 1))
}

/// Index an issue at `current` lands on when moved in a scope of `len`.
pub fn target_index(current: usize, len: usize, direction: MoveDirection) -> usize {
    let last = len.saturating_sub(1);
    match direction {
        MoveDirection::Top => 0,
        MoveDirection::Up => current.saturating_sub(1),
        MoveDirection::Down => (current + 1).min(last),
        MoveDirection::Bottom => last,
    }
}

fn position(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

/// `true` when the issues, in listing order, sit at exactly `0..n-1`.
pub(crate) fn is_contiguous(issues: &[Issue]) -> bool {
    issues
        .iter()
        .enumerate()
        .all(|(index, issue)| issue.order == position(index))
}

/// Renumber `issues` to their listing index and return the new positions.
fn renumber(issues: &mut [Issue]) -> Vec<(IssueId, i64)> {
    issues
        .iter_mut()
        .enumerate()
        .map(|(index, issue)| {
            issue.order = position(index);
            (issue.id.clone(), issue.order)
        })
        .collect()
}

/// Move `id` within `scope` in `direction`.
///
/// When the target index equals the current one and the scope is already
/// contiguous, nothing is written and the scope is returned as read.
/// Otherwise every position of the scope is rewritten; with the index
/// unchanged that only closes gaps, and [`Reordered::moved`] stays `false`.
pub(crate) async fn reorder(
    tx: &mut dyn Transaction,
    scope: &Scope,
    id: &IssueId,
    direction: MoveDirection,
) -> Result<Reordered> {
    let mut issues = tx.scope_issues(scope).await?;
    let Some(current) = issues.iter().position(|i| &i.id == id) else {
        return Err(StorageError::MissingRow {
            table: "issues",
            id: id.to_string(),
        })
        .context(&format!("reordering scope {scope}"));
    };

    let target = target_index(current, issues.len(), direction);
    if target == current && is_contiguous(&issues) {
        return Ok(Reordered {
            issues,
            changed: false,
            moved: false,
        });
    }

    let moved = issues.remove(current);
    issues.insert(target, moved);
    let positions = renumber(&mut issues);
    tx.rewrite_positions(&positions).await?;

    tracing::debug!(%scope, issue = %id, from = current, to = target, "Reordered scope");
    Ok(Reordered {
        issues,
        changed: true,
        moved: target != current,
    })
}

/// Renumber `scope` to `0..n-1` keeping its relative order.
///
/// Returns how many issues were rewritten; 0 when the scope was already
/// contiguous.
pub(crate) async fn compact(tx: &mut dyn Transaction, scope: &Scope) -> Result<usize> {
    let mut issues = tx.scope_issues(scope).await?;
    if is_contiguous(&issues) {
        return Ok(0);
    }
    let positions = renumber(&mut issues);
    tx.rewrite_positions(&positions).await?;
    tracing::debug!(%scope, rewritten = positions.len(), "Compacted scope");
    Ok(positions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProjectId, Role};
    use crate::storage::in_memory::InMemoryStore;
    use crate::storage::test_support::{issue, project};
    use crate::storage::Store;
    use proptest::prelude::*;
    use rstest::rstest;

    async fn seeded(orders: &[i64]) -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_project(&project("p1", &[("alice", Role::Owner)]))
            .await
            .unwrap();
        for (i, order) in orders.iter().enumerate() {
            tx.insert_issue(&issue(&format!("i{i}"), "p1", None, *order))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();
        store
    }

    fn root() -> Scope {
        Scope::root(ProjectId::new("p1"))
    }

    fn ids(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn next_position_of_empty_scope_is_zero() {
        let store = seeded(&[]).await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(next_position(tx.as_mut(), &root()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn next_position_follows_the_last_issue() {
        let store = seeded(&[0, 1, 2]).await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(next_position(tx.as_mut(), &root()).await.unwrap(), 3);
    }

    #[rstest]
    #[case(2, 5, MoveDirection::Top, 0)]
    #[case(2, 5, MoveDirection::Up, 1)]
    #[case(0, 5, MoveDirection::Up, 0)]
    #[case(2, 5, MoveDirection::Down, 3)]
    #[case(4, 5, MoveDirection::Down, 4)]
    #[case(1, 5, MoveDirection::Bottom, 4)]
    #[case(0, 1, MoveDirection::Bottom, 0)]
    fn target_index_clamps_to_scope(
        #[case] current: usize,
        #[case] len: usize,
        #[case] direction: MoveDirection,
        #[case] expected: usize,
    ) {
        assert_eq!(target_index(current, len, direction), expected);
    }

    #[tokio::test]
    async fn moving_up_swaps_with_previous_sibling() {
        let store = seeded(&[0, 1, 2]).await;
        let mut tx = store.begin().await.unwrap();

        let result = reorder(tx.as_mut(), &root(), &IssueId::new("i1"), MoveDirection::Up)
            .await
            .unwrap();

        assert!(result.changed);
        assert!(result.moved);
        assert_eq!(ids(&result.issues), ["i1", "i0", "i2"]);
        assert_eq!(result.position_of(&IssueId::new("i1")), Some(0));
        let stored = tx.scope_issues(&root()).await.unwrap();
        assert_eq!(ids(&stored), ["i1", "i0", "i2"]);
    }

    #[tokio::test]
    async fn moving_the_first_issue_up_writes_nothing() {
        let store = seeded(&[0, 1, 2]).await;
        let mut tx = store.begin().await.unwrap();

        let result = reorder(tx.as_mut(), &root(), &IssueId::new("i0"), MoveDirection::Up)
            .await
            .unwrap();

        assert!(!result.changed);
        assert!(!result.moved);
        assert_eq!(ids(&result.issues), ["i0", "i1", "i2"]);
    }

    #[tokio::test]
    async fn gapped_scope_is_normalized_even_without_a_move() {
        let store = seeded(&[0, 4, 9]).await;
        let mut tx = store.begin().await.unwrap();

        let result = reorder(
            tx.as_mut(),
            &root(),
            &IssueId::new("i2"),
            MoveDirection::Bottom,
        )
        .await
        .unwrap();

        assert!(result.changed);
        assert!(!result.moved);
        let orders: Vec<i64> = tx
            .scope_issues(&root())
            .await
            .unwrap()
            .iter()
            .map(|i| i.order)
            .collect();
        assert_eq!(orders, [0, 1, 2]);
    }

    #[tokio::test]
    async fn compact_closes_gaps_and_keeps_order() {
        let store = seeded(&[0, 2, 5]).await;
        let mut tx = store.begin().await.unwrap();

        assert_eq!(compact(tx.as_mut(), &root()).await.unwrap(), 3);
        assert_eq!(compact(tx.as_mut(), &root()).await.unwrap(), 0);

        let stored = tx.scope_issues(&root()).await.unwrap();
        assert_eq!(ids(&stored), ["i0", "i1", "i2"]);
        assert!(is_contiguous(&stored));
    }

    fn direction() -> impl Strategy<Value = MoveDirection> {
        prop_oneof![
            Just(MoveDirection::Top),
            Just(MoveDirection::Up),
            Just(MoveDirection::Down),
            Just(MoveDirection::Bottom),
        ]
    }

    proptest! {
        #[test]
        fn moves_keep_scope_contiguous(
            len in 1usize..10,
            moves in prop::collection::vec((0usize..10, direction()), 1..12),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let orders: Vec<i64> = (0..len).map(position).collect();
                let store = seeded(&orders).await;
                let mut expected: Vec<String> = (0..len).map(|i| format!("i{i}")).collect();
                expected.sort();

                for (pick, direction) in moves {
                    let id = IssueId::new(format!("i{}", pick % len));
                    let mut tx = store.begin().await.unwrap();
                    reorder(tx.as_mut(), &root(), &id, direction).await.unwrap();
                    tx.commit().await.unwrap();

                    let mut tx = store.begin().await.unwrap();
                    let scope = tx.scope_issues(&root()).await.unwrap();
                    assert!(is_contiguous(&scope));
                    let mut seen: Vec<String> = scope.into_iter().map(|i| i.id.0).collect();
                    seen.sort();
                    assert_eq!(seen, expected);
                }
            });
        }
    }
}
