//! Error types for assignment domain validation and parsing.

use thiserror::Error;

/// Error returned when a status code or name is outside the closed set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidStatusError {
    /// The numeric status code is not defined.
    #[error("unknown assignment status code: {0}")]
    UnknownCode(i64),

    /// The status name is not defined.
    #[error("unknown assignment status: {0}")]
    UnknownName(String),
}

/// Errors returned while constructing assignment domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssignmentDomainError {
    /// The submitted or computed status is invalid.
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusError),

    /// The rule identifier is invalid.
    #[error("invalid rule id {0}, expected a positive integer")]
    InvalidRuleId(u64),

    /// The user identifier is invalid.
    #[error("invalid user id {0}, expected a positive integer")]
    InvalidUserId(u64),
}
