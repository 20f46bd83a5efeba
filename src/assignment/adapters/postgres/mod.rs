//! `PostgreSQL` adapters for assignment persistence.

mod models;
mod repository;
mod schema;

pub use repository::{AssignmentPgPool, PostgresAssignmentRepository};

#[cfg(test)]
pub(crate) use models::AssignmentRow;
#[cfg(test)]
pub(crate) use repository::{row_to_assignment, to_new_row};
