//! Application services for assignment status orchestration.

mod reconciliation;
mod status;

pub use reconciliation::{ReconciliationReport, ReconciliationScheduler};
pub use status::{
    AssignRequest, AssignmentServiceError, AssignmentServiceResult, AssignmentStatusService,
    ManualChangeRequest, Reconciled, SubmittedStatus,
};
