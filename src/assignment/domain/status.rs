//! Assignment status codes and their categories.

use super::InvalidStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a status that drives reconciliation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    /// The learner has been assigned but nothing has happened yet.
    Initial,
    /// Work is underway and the status may still move in any direction.
    Progress,
    /// The learner has been formally reprimanded or sanctioned.
    Escalation,
    /// The assignment is finished.
    Terminal,
}

impl StatusCategory {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Progress => "progress",
            Self::Escalation => "escalation",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a learner's assignment.
///
/// Variants are declared in severity order, so the derived [`Ord`] matches
/// the ordering of the numeric [`code`](Self::code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// The rule engine assigned the learner.
    Assigned,
    /// The learner is enrolled in a matching booking option.
    Enrolled,
    /// Work on the assignment is paused.
    Paused,
    /// The due date has been extended.
    Prolonged,
    /// Some but not all required completions were recorded.
    PartiallyCompleted,
    /// The due date passed without completion.
    Overdue,
    /// The learner received a reprimand.
    Reprimand,
    /// The learner received a sanction.
    Sanction,
    /// The assignment was completed.
    Completed,
    /// The learner dropped out.
    #[serde(rename = "droppedout", alias = "dropped_out")]
    DroppedOut,
}

impl AssignmentStatus {
    /// Every status in severity order.
    pub const ALL: [Self; 10] = [
        Self::Assigned,
        Self::Enrolled,
        Self::Paused,
        Self::Prolonged,
        Self::PartiallyCompleted,
        Self::Overdue,
        Self::Reprimand,
        Self::Sanction,
        Self::Completed,
        Self::DroppedOut,
    ];

    /// Returns the numeric status code used by persistence and the form layer.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Assigned => 0,
            Self::Enrolled => 3,
            Self::Paused => 4,
            Self::Prolonged => 5,
            Self::PartiallyCompleted => 7,
            Self::Overdue => 10,
            Self::Reprimand => 11,
            Self::Sanction => 12,
            Self::Completed => 15,
            Self::DroppedOut => 16,
        }
    }

    /// Looks up a status by its numeric code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStatusError::UnknownCode`] for codes outside the
    /// closed set.
    pub const fn from_code(code: i64) -> Result<Self, InvalidStatusError> {
        match code {
            0 => Ok(Self::Assigned),
            3 => Ok(Self::Enrolled),
            4 => Ok(Self::Paused),
            5 => Ok(Self::Prolonged),
            7 => Ok(Self::PartiallyCompleted),
            10 => Ok(Self::Overdue),
            11 => Ok(Self::Reprimand),
            12 => Ok(Self::Sanction),
            15 => Ok(Self::Completed),
            16 => Ok(Self::DroppedOut),
            _ => Err(InvalidStatusError::UnknownCode(code)),
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Enrolled => "enrolled",
            Self::Paused => "paused",
            Self::Prolonged => "prolonged",
            Self::PartiallyCompleted => "partially_completed",
            Self::Overdue => "overdue",
            Self::Reprimand => "reprimand",
            Self::Sanction => "sanction",
            Self::Completed => "completed",
            Self::DroppedOut => "droppedout",
        }
    }

    /// Returns the policy category of this status.
    #[must_use]
    pub const fn category(self) -> StatusCategory {
        match self {
            Self::Assigned => StatusCategory::Initial,
            Self::Enrolled
            | Self::Paused
            | Self::Prolonged
            | Self::PartiallyCompleted
            | Self::Overdue => StatusCategory::Progress,
            Self::Reprimand | Self::Sanction => StatusCategory::Escalation,
            Self::Completed | Self::DroppedOut => StatusCategory::Terminal,
        }
    }

    /// Returns `true` for statuses reconciliation never leaves.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self.category(), StatusCategory::Terminal)
    }

    /// Returns `true` when this status is strictly more severe than `other`.
    #[must_use]
    pub const fn is_more_severe_than(self, other: Self) -> bool {
        self.code() > other.code()
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for AssignmentStatus {
    type Error = InvalidStatusError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_code(value)
    }
}

impl TryFrom<&str> for AssignmentStatus {
    type Error = InvalidStatusError;

    /// Parses either a status name or its numeric code.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        if let Ok(code) = normalized.parse::<i64>() {
            return Self::from_code(code);
        }
        match normalized.as_str() {
            "assigned" => Ok(Self::Assigned),
            "enrolled" => Ok(Self::Enrolled),
            "paused" => Ok(Self::Paused),
            "prolonged" => Ok(Self::Prolonged),
            "partially_completed" => Ok(Self::PartiallyCompleted),
            "overdue" => Ok(Self::Overdue),
            "reprimand" => Ok(Self::Reprimand),
            "sanction" => Ok(Self::Sanction),
            "completed" => Ok(Self::Completed),
            "droppedout" | "dropped_out" => Ok(Self::DroppedOut),
            _ => Err(InvalidStatusError::UnknownName(value.to_owned())),
        }
    }
}
