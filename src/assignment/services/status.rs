//! Service layer for assignment creation, manual changes and reconciliation.

use crate::assignment::{
    domain::{
        Assignment, AssignmentDomainError, AssignmentId, AssignmentStatus, InvalidStatusError,
        ChangeSource, ManualChange, ReconcileOutcome, RuleId, UserId,
    },
    ports::{AssignmentRepository, AssignmentRepositoryError, ReconciliationSourceUnavailable},
};
use crate::config::ReconciliationConfig;
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Status value as submitted by a form or computed by an external source.
///
/// Parsing into [`AssignmentStatus`] happens inside the service so invalid
/// values are rejected before any state is loaded or mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedStatus {
    /// Numeric status code.
    Code(i64),
    /// Status name or stringified code.
    Name(String),
    /// Already validated status.
    Status(AssignmentStatus),
}

impl SubmittedStatus {
    /// Validates the submitted value against the closed status set.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStatusError`] for codes or names outside the set.
    pub fn parse(&self) -> Result<AssignmentStatus, InvalidStatusError> {
        match self {
            Self::Code(code) => AssignmentStatus::from_code(*code),
            Self::Name(name) => AssignmentStatus::try_from(name.as_str()),
            Self::Status(status) => Ok(*status),
        }
    }
}

impl From<i64> for SubmittedStatus {
    fn from(value: i64) -> Self {
        Self::Code(value)
    }
}

impl From<&str> for SubmittedStatus {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for SubmittedStatus {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<AssignmentStatus> for SubmittedStatus {
    fn from(value: AssignmentStatus) -> Self {
        Self::Status(value)
    }
}

/// Request payload sent by the rule engine when a learner matches a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRequest {
    rule_id: u64,
    user_id: u64,
    due_date: Option<DateTime<Utc>>,
}

impl AssignRequest {
    /// Creates a request for the given rule and user.
    #[must_use]
    pub const fn new(rule_id: u64, user_id: u64) -> Self {
        Self {
            rule_id,
            user_id,
            due_date: None,
        }
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Request payload submitted by the manual-change form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualChangeRequest {
    assignment_id: AssignmentId,
    status: SubmittedStatus,
    keep_changes: bool,
    comment: Option<String>,
    due_date: Option<DateTime<Utc>>,
    overdue_counter: Option<u32>,
    prolonged_counter: Option<u32>,
    changed_by: Option<u64>,
}

impl ManualChangeRequest {
    /// Creates a request setting `status` and the keep-changes flag.
    #[must_use]
    pub fn new(
        assignment_id: AssignmentId,
        status: impl Into<SubmittedStatus>,
        keep_changes: bool,
    ) -> Self {
        Self {
            assignment_id,
            status: status.into(),
            keep_changes,
            comment: None,
            due_date: None,
            overdue_counter: None,
            prolonged_counter: None,
            changed_by: None,
        }
    }

    /// Sets the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the overdue counter.
    #[must_use]
    pub const fn with_overdue_counter(mut self, counter: u32) -> Self {
        self.overdue_counter = Some(counter);
        self
    }

    /// Sets the prolonged counter.
    #[must_use]
    pub const fn with_prolonged_counter(mut self, counter: u32) -> Self {
        self.prolonged_counter = Some(counter);
        self
    }

    /// Records the submitting operator.
    #[must_use]
    pub const fn changed_by(mut self, operator: u64) -> Self {
        self.changed_by = Some(operator);
        self
    }

    fn into_domain(self) -> Result<(AssignmentId, ManualChange), AssignmentDomainError> {
        let Self {
            assignment_id,
            status,
            keep_changes,
            comment,
            due_date,
            overdue_counter,
            prolonged_counter,
            changed_by,
        } = self;

        let mut change = ManualChange::new(status.parse()?, keep_changes);
        if let Some(text) = comment {
            change = change.with_comment(text);
        }
        if let Some(date) = due_date {
            change = change.with_due_date(date);
        }
        if let Some(counter) = overdue_counter {
            change = change.with_overdue_counter(counter);
        }
        if let Some(counter) = prolonged_counter {
            change = change.with_prolonged_counter(counter);
        }
        if let Some(operator) = changed_by {
            change = change.changed_by(UserId::new(operator)?);
        }
        Ok((assignment_id, change))
    }
}

/// Assignment after reconciliation together with the policy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Persisted assignment.
    pub assignment: Assignment,
    /// Decision taken by the precedence policy.
    pub outcome: ReconcileOutcome,
}

/// Service-level errors for assignment operations.
#[derive(Debug, Error)]
pub enum AssignmentServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] AssignmentDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] AssignmentRepositoryError),
    /// No assignment exists with the given identifier.
    #[error("assignment {0} not found")]
    NotFound(AssignmentId),
    /// The external completion source could not be reached.
    #[error(transparent)]
    SourceUnavailable(#[from] ReconciliationSourceUnavailable),
    /// An operator changed the assignment while reconciliation was writing.
    #[error("assignment {0} was changed manually during reconciliation")]
    Superseded(AssignmentId),
}

impl From<InvalidStatusError> for AssignmentServiceError {
    fn from(err: InvalidStatusError) -> Self {
        Self::Domain(err.into())
    }
}

impl AssignmentServiceError {
    /// Returns `true` when the operation may succeed if simply retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Repository(AssignmentRepositoryError::Conflict(_)) | Self::SourceUnavailable(_)
        )
    }

    /// Returns `true` when a concurrent write was detected.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Repository(AssignmentRepositoryError::Conflict(_)))
    }

    /// Returns `true` when a manual change won over reconciliation.
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded(_))
    }
}

/// Result type for assignment service operations.
pub type AssignmentServiceResult<T> = Result<T, AssignmentServiceError>;

/// Due-ness check re-applied to freshly loaded state inside retries.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DueGuard {
    pub(crate) now: DateTime<Utc>,
    pub(crate) interval: Duration,
}

/// Result of a reconciliation attempt that may stop without writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GuardedReconcile {
    /// The reconciled assignment was persisted.
    Written(Reconciled),
    /// The freshly loaded assignment was no longer due.
    NotDue,
    /// A manual change landed after the first read.
    Superseded,
}

/// Assignment status orchestration service.
#[derive(Clone)]
pub struct AssignmentStatusService<R, C>
where
    R: AssignmentRepository,
    C: Clock + Send + Sync,
{
    repository: Arc<R>,
    clock: Arc<C>,
    max_conflict_retries: u32,
}

impl<R, C> AssignmentStatusService<R, C>
where
    R: AssignmentRepository,
    C: Clock + Send + Sync,
{
    /// Creates a service with default reconciliation settings.
    #[must_use]
    pub fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self::with_config(repository, clock, &ReconciliationConfig::default())
    }

    /// Creates a service using the given reconciliation settings.
    #[must_use]
    pub const fn with_config(
        repository: Arc<R>,
        clock: Arc<C>,
        config: &ReconciliationConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            max_conflict_retries: config.max_conflict_retries,
        }
    }

    /// Creates an assignment in the `assigned` status.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentServiceError::Domain`] for invalid identifiers and
    /// [`AssignmentServiceError::Repository`] when the rule already assigned
    /// the user or persistence fails.
    pub async fn assign(&self, request: AssignRequest) -> AssignmentServiceResult<Assignment> {
        let rule_id = RuleId::new(request.rule_id)?;
        let user_id = UserId::new(request.user_id)?;
        let assignment = Assignment::new(rule_id, user_id, request.due_date, &*self.clock);
        self.repository.store(&assignment).await?;
        info!(
            assignment_id = %assignment.id(),
            rule_id = %rule_id,
            user_id = %user_id,
            "assignment created"
        );
        Ok(assignment)
    }

    /// Applies an operator's manual status change.
    ///
    /// The submitted status is validated before anything is loaded. A
    /// concurrent write is reported as a retryable conflict rather than
    /// retried, so the operator sees the fresh state.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentServiceError::Domain`] for an invalid status or
    /// operator id, [`AssignmentServiceError::NotFound`] for an unknown
    /// assignment and [`AssignmentServiceError::Repository`] on conflicts or
    /// persistence failures.
    pub async fn apply_manual_change(
        &self,
        request: ManualChangeRequest,
    ) -> AssignmentServiceResult<Assignment> {
        let (assignment_id, change) = request.into_domain()?;
        let mut assignment = self.find_or_error(assignment_id).await?;
        let expected = assignment.revision();
        let previous = assignment.status();

        assignment.apply_manual_change(change, &*self.clock);
        self.repository.update(&assignment, expected).await?;

        info!(
            assignment_id = %assignment_id,
            from = %previous,
            to = %assignment.status(),
            keep_changes = assignment.keep_changes(),
            "manual status change applied"
        );
        Ok(assignment)
    }

    /// Reconciles an assignment against an externally computed status.
    ///
    /// Conflicting writes are reloaded and retried up to the configured
    /// limit; each retry re-runs the precedence policy on fresh state. A
    /// retry stops without writing once a manual change shows up in the
    /// reloaded history, since `computed` was derived before that edit.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentServiceError::Domain`] for an invalid computed
    /// status, [`AssignmentServiceError::NotFound`] for an unknown
    /// assignment, [`AssignmentServiceError::Superseded`] when an operator
    /// edit landed mid-reconciliation and [`AssignmentServiceError::Repository`]
    /// when conflicts persist or persistence fails.
    pub async fn reconcile(
        &self,
        assignment_id: AssignmentId,
        computed: impl Into<SubmittedStatus>,
    ) -> AssignmentServiceResult<Reconciled> {
        let status = computed.into().parse()?;
        match self.reconcile_guarded(assignment_id, status, None).await? {
            GuardedReconcile::Written(reconciled) => Ok(reconciled),
            GuardedReconcile::NotDue | GuardedReconcile::Superseded => {
                Err(AssignmentServiceError::Superseded(assignment_id))
            }
        }
    }

    /// Reconciles with an optional due-ness re-check.
    ///
    /// The history length seen on the first load is the baseline: any
    /// manual entry past it on a reload means the operator wrote in between.
    pub(crate) async fn reconcile_guarded(
        &self,
        assignment_id: AssignmentId,
        computed: AssignmentStatus,
        guard: Option<DueGuard>,
    ) -> AssignmentServiceResult<GuardedReconcile> {
        let mut attempt: u32 = 0;
        let mut baseline: Option<usize> = None;
        loop {
            let mut assignment = self.find_or_error(assignment_id).await?;
            match baseline {
                Some(seen) if manual_change_since(&assignment, seen) => {
                    info!(
                        assignment_id = %assignment_id,
                        computed = %computed,
                        "manual change landed during reconciliation, skipping"
                    );
                    return Ok(GuardedReconcile::Superseded);
                }
                Some(_) => {}
                None => baseline = Some(assignment.history().len()),
            }
            if let Some(DueGuard { now, interval }) = guard {
                if !assignment.is_due(now, interval) {
                    debug!(assignment_id = %assignment_id, "assignment no longer due");
                    return Ok(GuardedReconcile::NotDue);
                }
            }

            let expected = assignment.revision();
            let outcome = assignment.reconcile(computed, &*self.clock);
            match self.repository.update(&assignment, expected).await {
                Ok(()) => {
                    log_outcome(assignment_id, computed, outcome);
                    return Ok(GuardedReconcile::Written(Reconciled {
                        assignment,
                        outcome,
                    }));
                }
                Err(AssignmentRepositoryError::Conflict(conflict))
                    if attempt < self.max_conflict_retries =>
                {
                    attempt = attempt.saturating_add(1);
                    debug!(
                        assignment_id = %assignment_id,
                        attempt,
                        expected = %conflict.expected,
                        actual = %conflict.actual,
                        "reconciliation conflict, reloading"
                    );
                }
                Err(err) => {
                    if err.is_conflict() {
                        warn!(
                            assignment_id = %assignment_id,
                            attempts = attempt.saturating_add(1),
                            "reconciliation conflict retries exhausted"
                        );
                    }
                    return Err(err.into());
                }
            }
        }
    }

    /// Finds an assignment by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentServiceError::Repository`] when persistence lookup
    /// fails.
    pub async fn find_by_id(
        &self,
        assignment_id: AssignmentId,
    ) -> AssignmentServiceResult<Option<Assignment>> {
        Ok(self.repository.find_by_id(assignment_id).await?)
    }

    /// Returns every assignment of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentServiceError::Domain`] for an invalid user id or
    /// [`AssignmentServiceError::Repository`] when persistence lookup fails.
    pub async fn find_by_user(&self, user_id: u64) -> AssignmentServiceResult<Vec<Assignment>> {
        let validated = UserId::new(user_id)?;
        Ok(self.repository.find_by_user(validated).await?)
    }

    async fn find_or_error(&self, assignment_id: AssignmentId) -> AssignmentServiceResult<Assignment> {
        self.repository
            .find_by_id(assignment_id)
            .await?
            .ok_or(AssignmentServiceError::NotFound(assignment_id))
    }
}

fn manual_change_since(assignment: &Assignment, seen: usize) -> bool {
    assignment
        .history()
        .iter()
        .skip(seen)
        .any(|change| matches!(change.source(), ChangeSource::Manual { .. }))
}

fn log_outcome(assignment_id: AssignmentId, computed: AssignmentStatus, outcome: ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::Applied { from, to } => info!(
            assignment_id = %assignment_id,
            %from,
            %to,
            "reconciled status applied"
        ),
        ReconcileOutcome::Preserved(reason) => debug!(
            assignment_id = %assignment_id,
            computed = %computed,
            %reason,
            "reconciled status preserved"
        ),
    }
}
