//! Taskflow: assignment status engine.
//!
//! This crate tracks the lifecycle status of learning-rule assignments and
//! reconciles manual operator edits with statuses computed from external
//! completion signals.
//!
//! # Architecture
//!
//! Taskflow follows hexagonal architecture principles:
//!
//! - **Domain**: Status set, precedence policy and the assignment aggregate
//! - **Ports**: Repository and completion-signal traits
//! - **Adapters**: In-memory and `PostgreSQL` repositories
//!
//! # Modules
//!
//! - [`assignment`]: Assignment status tracking and reconciliation
//! - [`config`]: Layered engine configuration

pub mod assignment;
pub mod config;
