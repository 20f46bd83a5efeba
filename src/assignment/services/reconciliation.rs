//! Scheduled reconciliation of due assignments.
//!
//! The external scheduler calls [`ReconciliationScheduler::run_cycle`] on its
//! own cadence. A cycle never fails because of a single assignment: source
//! outages and exhausted conflicts are counted, logged and left for the next
//! cycle.

use super::status::{AssignmentServiceResult, AssignmentStatusService, DueGuard, GuardedReconcile};
use crate::assignment::ports::{AssignmentRepository, CompletionSignalSource};
use crate::config::ReconciliationConfig;
use chrono::Duration;
use mockable::Clock;
use std::sync::Arc;
use tracing::{info, warn};

/// Counters describing one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Due assignments looked at.
    pub examined: usize,
    /// Assignments whose status changed.
    pub applied: usize,
    /// Assignments whose status was kept.
    pub preserved: usize,
    /// Assignments changed by someone else since the cycle started.
    pub superseded: usize,
    /// Assignments skipped because the completion source failed.
    pub source_unavailable: usize,
    /// Assignments skipped after exhausting conflict retries.
    pub conflicts: usize,
    /// Assignments skipped because of other persistence failures.
    pub failed: usize,
}

/// Periodic reconciliation driver.
pub struct ReconciliationScheduler<R, S, C>
where
    R: AssignmentRepository,
    S: CompletionSignalSource,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    source: Arc<S>,
    clock: Arc<C>,
    service: AssignmentStatusService<R, C>,
    interval: Duration,
}

impl<R, S, C> ReconciliationScheduler<R, S, C>
where
    R: AssignmentRepository,
    S: CompletionSignalSource,
    C: Clock + Send + Sync,
{
    /// Creates a scheduler.
    #[must_use]
    pub fn new(
        repository: Arc<R>,
        source: Arc<S>,
        clock: Arc<C>,
        config: &ReconciliationConfig,
    ) -> Self {
        let service =
            AssignmentStatusService::with_config(Arc::clone(&repository), Arc::clone(&clock), config);
        Self {
            repository,
            source,
            clock,
            service,
            interval: config.interval(),
        }
    }

    /// Returns the minimum time between writes before an assignment is due.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Reconciles every due, non-terminal assignment once.
    ///
    /// # Errors
    ///
    /// Returns [`super::AssignmentServiceError::Repository`] only when the
    /// list of candidates cannot be loaded. Per-assignment failures are
    /// reported in the returned [`ReconciliationReport`].
    pub async fn run_cycle(&self) -> AssignmentServiceResult<ReconciliationReport> {
        let now = self.clock.utc();
        let guard = DueGuard {
            now,
            interval: self.interval,
        };
        let candidates = self.repository.list_active().await?;
        let mut report = ReconciliationReport::default();

        for assignment in candidates
            .iter()
            .filter(|assignment| assignment.is_due(now, self.interval))
        {
            report.examined = report.examined.saturating_add(1);
            let assignment_id = assignment.id();

            let computed = match self.source.computed_status(assignment).await {
                Ok(status) => status,
                Err(err) => {
                    warn!(assignment_id = %assignment_id, error = %err, "completion source unavailable");
                    report.source_unavailable = report.source_unavailable.saturating_add(1);
                    continue;
                }
            };

            match self
                .service
                .reconcile_guarded(assignment_id, computed, Some(guard))
                .await
            {
                Ok(GuardedReconcile::Written(reconciled)) if reconciled.outcome.is_applied() => {
                    report.applied = report.applied.saturating_add(1);
                }
                Ok(GuardedReconcile::Written(_)) => {
                    report.preserved = report.preserved.saturating_add(1);
                }
                Ok(GuardedReconcile::NotDue | GuardedReconcile::Superseded) => {
                    report.superseded = report.superseded.saturating_add(1);
                }
                Err(err) if err.is_conflict() => {
                    report.conflicts = report.conflicts.saturating_add(1);
                }
                Err(err) => {
                    warn!(assignment_id = %assignment_id, error = %err, "reconciliation failed");
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }

        info!(
            examined = report.examined,
            applied = report.applied,
            preserved = report.preserved,
            superseded = report.superseded,
            source_unavailable = report.source_unavailable,
            conflicts = report.conflicts,
            failed = report.failed,
            "reconciliation cycle finished"
        );
        Ok(report)
    }
}
