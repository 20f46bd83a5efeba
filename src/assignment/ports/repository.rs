//! Repository port for assignment persistence with optimistic concurrency.

use crate::assignment::domain::{Assignment, AssignmentId, Revision, RuleId, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for assignment repository operations.
pub type AssignmentRepositoryResult<T> = Result<T, AssignmentRepositoryError>;

/// Assignment persistence contract.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Stores a new assignment.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentRepositoryError::DuplicateId`] when the identifier
    /// already exists or [`AssignmentRepositoryError::DuplicateAssignment`]
    /// when the rule already assigned the user.
    async fn store(&self, assignment: &Assignment) -> AssignmentRepositoryResult<()>;

    /// Persists an updated assignment if the stored revision still equals
    /// `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentRepositoryError::NotFound`] when the assignment does
    /// not exist and [`AssignmentRepositoryError::Conflict`] when another
    /// writer advanced the revision first.
    async fn update(
        &self,
        assignment: &Assignment,
        expected: Revision,
    ) -> AssignmentRepositoryResult<()>;

    /// Finds an assignment by identifier.
    ///
    /// Returns `None` when the assignment does not exist.
    async fn find_by_id(&self, id: AssignmentId) -> AssignmentRepositoryResult<Option<Assignment>>;

    /// Finds the assignment a rule created for a user.
    async fn find_by_rule_and_user(
        &self,
        rule_id: RuleId,
        user_id: UserId,
    ) -> AssignmentRepositoryResult<Option<Assignment>>;

    /// Returns every assignment of a user, oldest first.
    async fn find_by_user(&self, user_id: UserId) -> AssignmentRepositoryResult<Vec<Assignment>>;

    /// Returns every assignment whose status is not terminal, oldest first.
    async fn list_active(&self) -> AssignmentRepositoryResult<Vec<Assignment>>;
}

/// Concurrent modification detected during a read-modify-write.
///
/// Callers recover by reloading the assignment and retrying.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("assignment {assignment_id} was modified concurrently: expected {expected}, found {actual}")]
pub struct ConflictError {
    /// Assignment whose write was rejected.
    pub assignment_id: AssignmentId,
    /// Revision the writer read.
    pub expected: Revision,
    /// Revision currently stored.
    pub actual: Revision,
}

/// Errors returned by assignment repository implementations.
#[derive(Debug, Clone, Error)]
pub enum AssignmentRepositoryError {
    /// An assignment with the same identifier already exists.
    #[error("duplicate assignment identifier: {0}")]
    DuplicateId(AssignmentId),

    /// The rule already created an assignment for the user.
    #[error("rule {rule_id} already assigned user {user_id}")]
    DuplicateAssignment {
        /// Owning rule.
        rule_id: RuleId,
        /// Assigned learner.
        user_id: UserId,
    },

    /// The assignment was not found.
    #[error("assignment not found: {0}")]
    NotFound(AssignmentId),

    /// The stored revision differs from the expected one.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl AssignmentRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns `true` when the failure is a revision conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
