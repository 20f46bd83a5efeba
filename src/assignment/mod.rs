//! Assignment status tracking for taskflow.
//!
//! An assignment is a learner's obligation under a rule. Its status is
//! driven from two directions: operators submit manual changes, and a
//! scheduled reconciliation recomputes the status from external completion
//! signals. This module decides how the two interact and serializes them
//! through optimistic revisions. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
