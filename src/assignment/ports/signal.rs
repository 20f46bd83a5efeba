//! Completion signal port consumed by reconciliation.
//!
//! External systems (booking completion, rule evaluation) decide which status
//! an assignment should have. Reconciliation asks this port and then applies
//! the precedence rules of the domain.

use crate::assignment::domain::{Assignment, AssignmentId, AssignmentStatus};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Source of computed statuses for reconciliation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionSignalSource: Send + Sync {
    /// Computes the status the external signals imply for `assignment`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconciliationSourceUnavailable`] when the external data
    /// could not be obtained. Reconciliation skips the assignment for this
    /// cycle.
    async fn computed_status(
        &self,
        assignment: &Assignment,
    ) -> Result<AssignmentStatus, ReconciliationSourceUnavailable>;
}

/// The external completion signal could not be obtained.
#[derive(Debug, Clone, Error)]
#[error("completion source unavailable for assignment {assignment_id}: {source}")]
pub struct ReconciliationSourceUnavailable {
    /// Assignment the signal was requested for.
    pub assignment_id: AssignmentId,
    /// Underlying failure.
    pub source: Arc<dyn std::error::Error + Send + Sync>,
}

impl ReconciliationSourceUnavailable {
    /// Wraps a source failure for the given assignment.
    pub fn new(
        assignment_id: AssignmentId,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            assignment_id,
            source: Arc::new(err),
        }
    }
}
