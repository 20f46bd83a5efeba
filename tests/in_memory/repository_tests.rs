//! In-memory integration tests for the assignment repository contract.

use crate::test_helpers::ManualClock;
use chrono::Duration;
use rstest::{fixture, rstest};
use taskflow::assignment::{
    adapters::memory::InMemoryAssignmentRepository,
    domain::{Assignment, AssignmentStatus, ManualChange, Revision, RuleId, UserId},
    ports::{AssignmentRepository, AssignmentRepositoryError, ConflictError},
};

#[fixture]
fn repo() -> InMemoryAssignmentRepository {
    InMemoryAssignmentRepository::new()
}

#[fixture]
fn clock() -> ManualClock {
    ManualClock::new()
}

fn assignment_for(rule: u64, user: u64, clock: &ManualClock) -> Result<Assignment, eyre::Report> {
    Ok(Assignment::new(RuleId::new(rule)?, UserId::new(user)?, None, clock))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn store_and_find_by_rule_and_user(
    repo: InMemoryAssignmentRepository,
    clock: ManualClock,
) -> Result<(), eyre::Report> {
    let assignment = assignment_for(8, 21, &clock)?;
    repo.store(&assignment).await?;

    let found = repo
        .find_by_rule_and_user(RuleId::new(8)?, UserId::new(21)?)
        .await?;
    let missing = repo
        .find_by_rule_and_user(RuleId::new(8)?, UserId::new(22)?)
        .await?;

    eyre::ensure!(found.as_ref() == Some(&assignment), "stored assignment not found");
    eyre::ensure!(missing.is_none(), "unexpected assignment for other user");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn storing_same_id_twice_is_rejected(
    repo: InMemoryAssignmentRepository,
    clock: ManualClock,
) -> Result<(), eyre::Report> {
    let assignment = assignment_for(1, 1, &clock)?;
    repo.store(&assignment).await?;

    let result = repo.store(&assignment).await;

    eyre::ensure!(
        matches!(result, Err(AssignmentRepositoryError::DuplicateId(id)) if id == assignment.id()),
        "expected DuplicateId, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_with_current_revision_succeeds(
    repo: InMemoryAssignmentRepository,
    clock: ManualClock,
) -> Result<(), eyre::Report> {
    let mut assignment = assignment_for(1, 1, &clock)?;
    repo.store(&assignment).await?;
    let expected = assignment.revision();

    assignment.apply_manual_change(ManualChange::new(AssignmentStatus::Reprimand, false), &clock);
    repo.update(&assignment, expected).await?;

    let stored = repo
        .find_by_id(assignment.id())
        .await?
        .ok_or_else(|| eyre::eyre!("assignment missing after update"))?;
    eyre::ensure!(stored.status() == AssignmentStatus::Reprimand, "status not persisted");
    eyre::ensure!(stored.revision() == Revision::new(2), "revision not advanced");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_with_stale_revision_reports_conflict(
    repo: InMemoryAssignmentRepository,
    clock: ManualClock,
) -> Result<(), eyre::Report> {
    let mut assignment = assignment_for(1, 1, &clock)?;
    repo.store(&assignment).await?;

    assignment.apply_manual_change(ManualChange::new(AssignmentStatus::Paused, true), &clock);
    repo.update(&assignment, Revision::INITIAL).await?;
    let result = repo.update(&assignment, Revision::INITIAL).await;

    let expected_conflict = ConflictError {
        assignment_id: assignment.id(),
        expected: Revision::INITIAL,
        actual: Revision::new(2),
    };
    eyre::ensure!(
        matches!(result, Err(AssignmentRepositoryError::Conflict(conflict)) if conflict == expected_conflict),
        "expected conflict, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_of_unknown_assignment_is_not_found(
    repo: InMemoryAssignmentRepository,
    clock: ManualClock,
) -> Result<(), eyre::Report> {
    let assignment = assignment_for(1, 1, &clock)?;

    let result = repo.update(&assignment, Revision::INITIAL).await;

    eyre::ensure!(
        matches!(result, Err(AssignmentRepositoryError::NotFound(_))),
        "expected NotFound, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_active_excludes_terminal_and_orders_oldest_first(
    repo: InMemoryAssignmentRepository,
    clock: ManualClock,
) -> Result<(), eyre::Report> {
    let oldest = assignment_for(1, 10, &clock)?;
    clock.advance(Duration::seconds(5));
    let mut finished = assignment_for(2, 10, &clock)?;
    finished.apply_manual_change(ManualChange::new(AssignmentStatus::DroppedOut, false), &clock);
    clock.advance(Duration::seconds(5));
    let newest = assignment_for(3, 11, &clock)?;

    for assignment in [&newest, &finished, &oldest] {
        repo.store(assignment).await?;
    }

    let active: Vec<_> = repo
        .list_active()
        .await?
        .iter()
        .map(Assignment::id)
        .collect();

    eyre::ensure!(
        active == vec![oldest.id(), newest.id()],
        "unexpected active assignments: {active:?}"
    );
    Ok(())
}
