//! In-memory adapters for assignment persistence.

mod assignment;

pub use assignment::InMemoryAssignmentRepository;
