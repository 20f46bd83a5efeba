//! In-memory repository for assignment status tests and embedding.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::assignment::{
    domain::{Assignment, AssignmentId, Revision, RuleId, UserId},
    ports::{
        AssignmentRepository, AssignmentRepositoryError, AssignmentRepositoryResult,
        ConflictError,
    },
};

/// Thread-safe in-memory assignment repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssignmentRepository {
    state: Arc<RwLock<InMemoryAssignmentState>>,
}

#[derive(Debug, Default)]
struct InMemoryAssignmentState {
    assignments: HashMap<AssignmentId, Assignment>,
    rule_user_index: HashMap<(RuleId, UserId), AssignmentId>,
}

impl InMemoryAssignmentRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> AssignmentRepositoryError {
    AssignmentRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

/// Collects assignments matching `predicate`, oldest first.
fn collect_sorted(
    state: &InMemoryAssignmentState,
    predicate: impl Fn(&Assignment) -> bool,
) -> Vec<Assignment> {
    let mut found: Vec<Assignment> = state
        .assignments
        .values()
        .filter(|assignment| predicate(assignment))
        .cloned()
        .collect();
    found.sort_by_key(|assignment| (assignment.created_at(), assignment.id().into_inner()));
    found
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn store(&self, assignment: &Assignment) -> AssignmentRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.assignments.contains_key(&assignment.id()) {
            return Err(AssignmentRepositoryError::DuplicateId(assignment.id()));
        }

        let key = (assignment.rule_id(), assignment.user_id());
        if state.rule_user_index.contains_key(&key) {
            return Err(AssignmentRepositoryError::DuplicateAssignment {
                rule_id: key.0,
                user_id: key.1,
            });
        }

        state.rule_user_index.insert(key, assignment.id());
        state
            .assignments
            .insert(assignment.id(), assignment.clone());
        Ok(())
    }

    async fn update(
        &self,
        assignment: &Assignment,
        expected: Revision,
    ) -> AssignmentRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = state
            .assignments
            .get_mut(&assignment.id())
            .ok_or(AssignmentRepositoryError::NotFound(assignment.id()))?;

        if stored.revision() != expected {
            return Err(ConflictError {
                assignment_id: assignment.id(),
                expected,
                actual: stored.revision(),
            }
            .into());
        }

        *stored = assignment.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: AssignmentId) -> AssignmentRepositoryResult<Option<Assignment>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.assignments.get(&id).cloned())
    }

    async fn find_by_rule_and_user(
        &self,
        rule_id: RuleId,
        user_id: UserId,
    ) -> AssignmentRepositoryResult<Option<Assignment>> {
        let state = self.state.read().map_err(poisoned)?;
        let assignment = state
            .rule_user_index
            .get(&(rule_id, user_id))
            .and_then(|id| state.assignments.get(id))
            .cloned();
        Ok(assignment)
    }

    async fn find_by_user(&self, user_id: UserId) -> AssignmentRepositoryResult<Vec<Assignment>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(collect_sorted(&state, |assignment| {
            assignment.user_id() == user_id
        }))
    }

    async fn list_active(&self) -> AssignmentRepositoryResult<Vec<Assignment>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(collect_sorted(&state, |assignment| {
            !assignment.status().is_terminal()
        }))
    }
}
