//! Property tests: any sequence of engine operations leaves every scope
//! numbered `0..n-1` and every child under a root issue of its own project.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use stint::domain::{IssueId, MoveDirection, NewIssue, Project, ProjectSettings, UserId};
use stint::engine::Engine;
use stint::storage::in_memory::InMemoryStore;

#[derive(Debug, Clone)]
enum Op {
    CreateRoot,
    CreateChild(usize),
    Move(usize, MoveDirection),
    Reparent(usize, usize),
    RemoveParent(usize),
    Delete(usize),
}

fn direction() -> impl Strategy<Value = MoveDirection> {
    prop_oneof![
        Just(MoveDirection::Top),
        Just(MoveDirection::Up),
        Just(MoveDirection::Down),
        Just(MoveDirection::Bottom),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::CreateRoot),
        3 => any::<usize>().prop_map(Op::CreateChild),
        4 => (any::<usize>(), direction()).prop_map(|(i, d)| Op::Move(i, d)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(i, p)| Op::Reparent(i, p)),
        1 => any::<usize>().prop_map(Op::RemoveParent),
        1 => any::<usize>().prop_map(Op::Delete),
    ]
}

fn owner() -> UserId {
    UserId::new("owner")
}

fn pick(ids: &[IssueId], n: usize) -> Option<&IssueId> {
    if ids.is_empty() {
        None
    } else {
        ids.get(n % ids.len())
    }
}

async fn apply(engine: &Engine, project: &Project, op: &Op, counter: &mut usize) {
    let issues = engine.project_issues(&owner(), &project.id).await.unwrap();
    let all: Vec<_> = issues.iter().map(|i| i.id.clone()).collect();
    let roots: Vec<_> = issues
        .iter()
        .filter(|i| i.is_root())
        .map(|i| i.id.clone())
        .collect();
    *counter += 1;
    let title = format!("issue {counter}");

    // Rejections (unchanged, not found, ...) are fine; the invariants must
    // hold either way.
    match op {
        Op::CreateRoot => {
            let new = NewIssue {
                project_id: project.id.clone(),
                title,
                description: Some("details".to_string()),
                ..NewIssue::default()
            };
            let _ = engine.create_issue(&owner(), new).await;
        }
        Op::CreateChild(n) => {
            if let Some(parent) = pick(&roots, *n) {
                let new = NewIssue {
                    project_id: project.id.clone(),
                    title,
                    parent_id: Some(parent.clone()),
                    ..NewIssue::default()
                };
                let _ = engine.create_issue(&owner(), new).await;
            }
        }
        Op::Move(n, direction) => {
            if let Some(id) = pick(&all, *n) {
                let _ = engine.move_issue(&owner(), id, *direction).await;
            }
        }
        Op::Reparent(n, p) => {
            if let (Some(id), Some(parent)) = (pick(&all, *n), pick(&roots, *p)) {
                // Only childless issues keep the hierarchy one level deep.
                let has_children = issues.iter().any(|i| i.parent_id.as_ref() == Some(id));
                if !has_children {
                    let _ = engine.reparent(&owner(), id, parent).await;
                }
            }
        }
        Op::RemoveParent(n) => {
            if let Some(id) = pick(&all, *n) {
                let _ = engine.remove_parent(&owner(), id).await;
            }
        }
        Op::Delete(n) => {
            if let Some(id) = pick(&all, *n) {
                let _ = engine.delete_issue(&owner(), id).await;
            }
        }
    }
}

async fn assert_invariants(engine: &Engine, project: &Project) {
    let issues = engine.project_issues(&owner(), &project.id).await.unwrap();

    let mut scopes: HashMap<Option<IssueId>, Vec<i64>> = HashMap::new();
    for issue in &issues {
        scopes
            .entry(issue.parent_id.clone())
            .or_default()
            .push(issue.order);
    }
    for (parent, mut orders) in scopes {
        orders.sort_unstable();
        let expected: Vec<i64> = (0..i64::try_from(orders.len()).unwrap()).collect();
        assert_eq!(orders, expected, "scope under {parent:?} is not contiguous");

        if let Some(parent) = parent {
            let parent = issues
                .iter()
                .find(|i| i.id == parent)
                .expect("children never outlive their parent");
            assert!(parent.is_root(), "nesting is one level deep");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn scopes_stay_contiguous(ops in prop::collection::vec(op(), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let engine = Engine::new(Arc::new(InMemoryStore::new()));
            let project = engine
                .create_project(&owner(), "Property", ProjectSettings::default())
                .await
                .unwrap();

            let mut counter = 0;
            for op in &ops {
                apply(&engine, &project, op, &mut counter).await;
                assert_invariants(&engine, &project).await;
            }
            engine.shutdown().await;
        });
    }
}
