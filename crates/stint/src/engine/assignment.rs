//! Auto-assignment policies.

use crate::domain::{AssignmentMethod, Member, Project, UserId};
use crate::error::Result;
use crate::storage::Transaction;
use rand::Rng;

/// Pick the assignee of a new issue.
///
/// An explicit, non-blank assignee always wins. Otherwise nothing is picked
/// unless the project has auto-assignment on, in which case its method
/// chooses among the members. Round robin persists its cursor through `tx`,
/// so the pick and the cursor commit or roll back together.
pub(crate) async fn resolve_assignee(
    tx: &mut dyn Transaction,
    project: &Project,
    explicit: Option<UserId>,
) -> Result<Option<UserId>> {
    if let Some(user) = explicit.filter(|u| !u.is_empty()) {
        return Ok(Some(user));
    }
    if !project.settings.auto_assignment || project.members.is_empty() {
        return Ok(None);
    }

    let picked = match project.settings.assignment_method {
        AssignmentMethod::Random => random(&project.members),
        AssignmentMethod::RoundRobin => round_robin(tx, project).await?,
        AssignmentMethod::LeastBusy => least_busy(tx, &project.members).await?,
    };
    tracing::debug!(
        project = %project.id,
        method = %project.settings.assignment_method,
        assignee = %picked,
        "Auto-assigned issue"
    );
    Ok(Some(picked))
}

fn random(members: &[Member]) -> UserId {
    let index = rand::rng().random_range(0..members.len());
    members[index].user_id.clone()
}

async fn round_robin(tx: &mut dyn Transaction, project: &Project) -> Result<UserId> {
    let count = i64::try_from(project.members.len()).unwrap_or(i64::MAX);
    let next = (project.last_assigned_index.unwrap_or(-1) + 1).rem_euclid(count);
    tx.set_last_assigned(&project.id, next).await?;

    let index = usize::try_from(next).unwrap_or_default();
    Ok(project.members[index].user_id.clone())
}

async fn least_busy(tx: &mut dyn Transaction, members: &[Member]) -> Result<UserId> {
    let mut best: Option<(&Member, u64)> = None;
    for member in members {
        let open = tx.count_open_assigned(&member.user_id).await?;
        // Strictly fewer: ties keep the earlier member.
        if best.is_none_or(|(_, fewest)| open < fewest) {
            best = Some((member, open));
        }
    }
    Ok(best
        .map(|(member, _)| member.user_id.clone())
        .unwrap_or_default())
}
