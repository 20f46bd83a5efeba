//! Domain model for assignment status tracking.
//!
//! The assignment domain owns the closed set of status codes, the precedence
//! between manual overrides and reconciled statuses, and the assignment
//! aggregate. Infrastructure concerns stay outside the domain boundary.

mod assignment;
mod error;
mod history;
mod ids;
mod policy;
mod status;

pub use assignment::{Assignment, ManualChange, PersistedAssignmentData, ReconcileOutcome};
pub use error::{AssignmentDomainError, InvalidStatusError};
pub use history::{ChangeSource, StatusChange};
pub use ids::{AssignmentId, Revision, RuleId, UserId};
pub use policy::{PreserveReason, ReconcileInput, Resolution, resolve};
pub use status::{AssignmentStatus, StatusCategory};
