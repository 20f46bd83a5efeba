//! Assignment aggregate root and manual-change payload.

use super::{
    AssignmentId, AssignmentStatus, ChangeSource, PreserveReason, ReconcileInput, Resolution,
    Revision, RuleId, StatusChange, UserId, resolve,
};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Operator-submitted status override and the accompanying form fields.
///
/// Optional fields left unset keep the value already stored on the
/// assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualChange {
    status: AssignmentStatus,
    keep_changes: bool,
    comment: Option<String>,
    due_date: Option<DateTime<Utc>>,
    overdue_counter: Option<u32>,
    prolonged_counter: Option<u32>,
    changed_by: Option<UserId>,
}

impl ManualChange {
    /// Creates a manual change that sets `status` and the keep-changes flag.
    #[must_use]
    pub const fn new(status: AssignmentStatus, keep_changes: bool) -> Self {
        Self {
            status,
            keep_changes,
            comment: None,
            due_date: None,
            overdue_counter: None,
            prolonged_counter: None,
            changed_by: None,
        }
    }

    /// Sets the comment. A blank comment clears the stored one.
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

    /// Records the operator submitting the change.
    #[must_use]
    pub const fn changed_by(mut self, operator: UserId) -> Self {
        self.changed_by = Some(operator);
        self
    }

    /// Returns the submitted status.
    #[must_use]
    pub const fn status(&self) -> AssignmentStatus {
        self.status
    }

    /// Returns the submitted keep-changes flag.
    #[must_use]
    pub const fn keep_changes(&self) -> bool {
        self.keep_changes
    }
}

/// Result of reconciling an assignment against a computed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The computed status replaced the stored one.
    Applied {
        /// Status before reconciliation.
        from: AssignmentStatus,
        /// Status after reconciliation.
        to: AssignmentStatus,
    },
    /// The stored status was kept.
    Preserved(PreserveReason),
}

impl ReconcileOutcome {
    /// Returns `true` when the status changed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// A learner's tracked obligation under a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    id: AssignmentId,
    rule_id: RuleId,
    user_id: UserId,
    status: AssignmentStatus,
    due_date: Option<DateTime<Utc>>,
    overdue_counter: u32,
    prolonged_counter: u32,
    comment: Option<String>,
    keep_changes: bool,
    computed_status: Option<AssignmentStatus>,
    revision: Revision,
    history: Vec<StatusChange>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAssignmentData {
    /// Persisted assignment identifier.
    pub id: AssignmentId,
    /// Owning rule.
    pub rule_id: RuleId,
    /// Assigned learner.
    pub user_id: UserId,
    /// Current status.
    pub status: AssignmentStatus,
    /// Due date, if any.
    pub due_date: Option<DateTime<Utc>>,
    /// Number of times the assignment became overdue.
    pub overdue_counter: u32,
    /// Number of times the assignment was prolonged.
    pub prolonged_counter: u32,
    /// Free-text operator comment.
    pub comment: Option<String>,
    /// Keep-changes flag.
    pub keep_changes: bool,
    /// Computed status recorded by the last reconciliation.
    pub computed_status: Option<AssignmentStatus>,
    /// Stored revision.
    pub revision: Revision,
    /// Status history.
    pub history: Vec<StatusChange>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    /// Creates a new assignment in the `assigned` status.
    #[must_use]
    pub fn new(
        rule_id: RuleId,
        user_id: UserId,
        due_date: Option<DateTime<Utc>>,
        clock: &impl Clock,
    ) -> Self {
        let timestamp = clock.utc();
        Self {
            id: AssignmentId::new(),
            rule_id,
            user_id,
            status: AssignmentStatus::Assigned,
            due_date,
            overdue_counter: 0,
            prolonged_counter: 0,
            comment: None,
            keep_changes: false,
            computed_status: None,
            revision: Revision::INITIAL,
            history: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs an assignment from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedAssignmentData) -> Self {
        Self {
            id: data.id,
            rule_id: data.rule_id,
            user_id: data.user_id,
            status: data.status,
            due_date: data.due_date,
            overdue_counter: data.overdue_counter,
            prolonged_counter: data.prolonged_counter,
            comment: data.comment,
            keep_changes: data.keep_changes,
            computed_status: data.computed_status,
            revision: data.revision,
            history: data.history,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the assignment identifier.
    #[must_use]
    pub const fn id(&self) -> AssignmentId {
        self.id
    }

    /// Returns the owning rule.
    #[must_use]
    pub const fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    /// Returns the assigned learner.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> AssignmentStatus {
        self.status
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    /// Returns how many times the assignment became overdue.
    #[must_use]
    pub const fn overdue_counter(&self) -> u32 {
        self.overdue_counter
    }

    /// Returns how many times the assignment was prolonged.
    #[must_use]
    pub const fn prolonged_counter(&self) -> u32 {
        self.prolonged_counter
    }

    /// Returns the operator comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the keep-changes flag.
    #[must_use]
    pub const fn keep_changes(&self) -> bool {
        self.keep_changes
    }

    /// Returns the computed status recorded by the last reconciliation.
    #[must_use]
    pub const fn computed_status(&self) -> Option<AssignmentStatus> {
        self.computed_status
    }

    /// Returns the stored revision.
    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Returns the status history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last write timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` when reconciliation should look at this assignment.
    ///
    /// Terminal assignments are never due. Others are due once `interval`
    /// has elapsed since the last write.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        !self.status.is_terminal() && now.signed_duration_since(self.updated_at) >= interval
    }

    /// Applies an operator's manual change.
    ///
    /// The submitted status is set unconditionally and the keep-changes flag
    /// is stored alongside it.
    pub fn apply_manual_change(&mut self, change: ManualChange, clock: &impl Clock) {
        let ManualChange {
            status,
            keep_changes,
            comment,
            due_date,
            overdue_counter,
            prolonged_counter,
            changed_by,
        } = change;

        let previous = self.status;
        self.status = status;
        self.keep_changes = keep_changes;
        if let Some(raw) = comment {
            self.comment = normalize_comment(raw);
        }
        if let Some(date) = due_date {
            self.due_date = Some(date);
        }
        if let Some(counter) = overdue_counter {
            self.overdue_counter = counter;
        }
        if let Some(counter) = prolonged_counter {
            self.prolonged_counter = counter;
        }

        let timestamp = self.touch(clock);
        let source = ChangeSource::Manual {
            changed_by,
            keep_changes,
        };
        self.history.push(
            StatusChange::new(previous, status, source, timestamp).with_comment(self.comment.clone()),
        );
    }

    /// Reconciles the stored status against a freshly computed one.
    ///
    /// The computed status is always recorded. Whether it also replaces the
    /// stored status is decided by [`resolve`].
    pub fn reconcile(&mut self, computed: AssignmentStatus, clock: &impl Clock) -> ReconcileOutcome {
        let resolution = resolve(ReconcileInput {
            current: self.status,
            keep_changes: self.keep_changes,
            previous_computed: self.computed_status,
            computed,
        });
        self.computed_status = Some(computed);
        let timestamp = self.touch(clock);

        match resolution {
            Resolution::Preserve(reason) => ReconcileOutcome::Preserved(reason),
            Resolution::Apply(next) => {
                let previous = self.status;
                self.status = next;
                match next {
                    AssignmentStatus::Overdue => {
                        self.overdue_counter = self.overdue_counter.saturating_add(1);
                    }
                    AssignmentStatus::Prolonged => {
                        self.prolonged_counter = self.prolonged_counter.saturating_add(1);
                    }
                    _ => {}
                }
                self.history.push(StatusChange::new(
                    previous,
                    next,
                    ChangeSource::Reconciliation,
                    timestamp,
                ));
                ReconcileOutcome::Applied {
                    from: previous,
                    to: next,
                }
            }
        }
    }

    /// Advances the revision and `updated_at`, returning the new timestamp.
    fn touch(&mut self, clock: &impl Clock) -> DateTime<Utc> {
        let timestamp = clock.utc();
        self.updated_at = timestamp;
        self.revision = self.revision.next();
        timestamp
    }
}

fn normalize_comment(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == raw.len() {
        Some(raw)
    } else {
        Some(trimmed.to_owned())
    }
}
