//! Port contracts for assignment status tracking.
//!
//! Ports define infrastructure-agnostic interfaces used by assignment
//! services.

pub mod repository;
pub mod signal;

pub use repository::{
    AssignmentRepository, AssignmentRepositoryError, AssignmentRepositoryResult, ConflictError,
};
pub use signal::{CompletionSignalSource, ReconciliationSourceUnavailable};

#[cfg(test)]
pub use signal::MockCompletionSignalSource;
