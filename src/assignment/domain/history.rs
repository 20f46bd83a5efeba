//! Audit trail entries for assignment status changes.

use super::{AssignmentStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered a recorded status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeSource {
    /// An operator submitted the manual-change form.
    Manual {
        /// Operator who submitted the change, when known.
        changed_by: Option<UserId>,
        /// Keep-changes flag submitted with the change.
        keep_changes: bool,
    },
    /// The scheduled reconciliation recomputed the status.
    Reconciliation,
}

/// One entry in an assignment's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    from: AssignmentStatus,
    to: AssignmentStatus,
    source: ChangeSource,
    changed_at: DateTime<Utc>,
    comment: Option<String>,
}

impl StatusChange {
    /// Creates a history entry.
    #[must_use]
    pub const fn new(
        from: AssignmentStatus,
        to: AssignmentStatus,
        source: ChangeSource,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from,
            to,
            source,
            changed_at,
            comment: None,
        }
    }

    /// Attaches the comment submitted with the change.
    #[must_use]
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Status before the change.
    #[must_use]
    pub const fn from(&self) -> AssignmentStatus {
        self.from
    }

    /// Status after the change.
    #[must_use]
    pub const fn to(&self) -> AssignmentStatus {
        self.to
    }

    /// What triggered the change.
    #[must_use]
    pub const fn source(&self) -> ChangeSource {
        self.source
    }

    /// When the change was applied.
    #[must_use]
    pub const fn changed_at(&self) -> DateTime<Utc> {
        self.changed_at
    }

    /// Comment submitted with the change, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}
