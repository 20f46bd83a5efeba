//! Reconciliation precedence between manual and computed statuses.
//!
//! The policy is a pure function of the current status, the keep-changes
//! flag, the previously recorded computed status and the freshly computed
//! one. Rules are evaluated in order:
//!
//! 1. An unchanged external signal never overwrites anything.
//! 2. Terminal statuses are never left.
//! 3. Escalation statuses only move to a strictly more severe status.
//! 4. Initial and progress statuses follow the computed status unless the
//!    keep-changes flag is set.

use super::{AssignmentStatus, StatusCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why reconciliation left the status untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreserveReason {
    /// The computed status equals the one recorded by the previous run.
    SignalUnchanged,
    /// The computed status equals the current status.
    AlreadyCurrent,
    /// An operator asked for the manual status to be kept.
    KeepChanges,
    /// The current status is terminal.
    Terminal,
    /// The current escalation status is at least as severe as the computed one.
    NoEscalation,
}

impl PreserveReason {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignalUnchanged => "signal_unchanged",
            Self::AlreadyCurrent => "already_current",
            Self::KeepChanges => "keep_changes",
            Self::Terminal => "terminal",
            Self::NoEscalation => "no_escalation",
        }
    }
}

impl fmt::Display for PreserveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision produced by [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The computed status replaces the current one.
    Apply(AssignmentStatus),
    /// The current status stays in place.
    Preserve(PreserveReason),
}

/// Inputs for a single reconciliation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileInput {
    /// Status currently stored on the assignment.
    pub current: AssignmentStatus,
    /// Whether the operator asked to keep the manual status.
    pub keep_changes: bool,
    /// Computed status recorded by the previous reconciliation, if any.
    pub previous_computed: Option<AssignmentStatus>,
    /// Freshly computed status.
    pub computed: AssignmentStatus,
}

/// Decides whether `input.computed` replaces `input.current`.
#[must_use]
pub fn resolve(input: ReconcileInput) -> Resolution {
    let ReconcileInput {
        current,
        keep_changes,
        previous_computed,
        computed,
    } = input;

    if previous_computed == Some(computed) {
        return Resolution::Preserve(PreserveReason::SignalUnchanged);
    }
    if computed == current {
        return Resolution::Preserve(PreserveReason::AlreadyCurrent);
    }

    match current.category() {
        StatusCategory::Terminal => Resolution::Preserve(PreserveReason::Terminal),
        StatusCategory::Escalation if computed.is_more_severe_than(current) => {
            Resolution::Apply(computed)
        }
        StatusCategory::Escalation => Resolution::Preserve(PreserveReason::NoEscalation),
        StatusCategory::Initial | StatusCategory::Progress if keep_changes => {
            Resolution::Preserve(PreserveReason::KeepChanges)
        }
        StatusCategory::Initial | StatusCategory::Progress => Resolution::Apply(computed),
    }
}
