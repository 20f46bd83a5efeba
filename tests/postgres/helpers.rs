//! Shared fixtures for `PostgreSQL` assignment tests.

pub use super::cluster::{BoxError, PostgresCluster, postgres_cluster};
use super::cluster::ManagedCluster;
use crate::test_helpers::ManualClock;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use rstest::fixture;
use std::sync::Arc;
use taskflow::assignment::{
    adapters::postgres::{AssignmentPgPool, PostgresAssignmentRepository},
    domain::{Assignment, RuleId, UserId},
};
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

/// SQL creating the assignments table and its indexes.
pub const CREATE_ASSIGNMENTS_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_assignments/up.sql");

/// Template database name for the pre-migrated schema.
pub const TEMPLATE_DB: &str = "taskflow_test_template";

/// Builds the single-threaded runtime tests drive the repository with.
pub fn test_runtime() -> Result<Runtime, BoxError> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| Box::new(err) as BoxError)
}

/// Ensures the template database exists with the schema applied.
pub fn ensure_template(cluster: &ManagedCluster) -> Result<(), BoxError> {
    let connection = cluster.connection();
    cluster.ensure_template_exists(TEMPLATE_DB, move |db_name| {
        apply_migrations(&connection.database_url(db_name))
    })
}

fn apply_migrations(url: &str) -> Result<(), BoxError> {
    let mut conn = PgConnection::establish(url).map_err(|err| Box::new(err) as BoxError)?;
    conn.batch_execute(CREATE_ASSIGNMENTS_SQL)
        .map_err(|err| Box::new(err) as BoxError)
}

/// Creates `db_name` from the template and opens a repository on it.
pub fn setup_repository(
    cluster: &ManagedCluster,
    db_name: &str,
) -> Result<PostgresAssignmentRepository, BoxError> {
    cluster.create_database_from_template(db_name, TEMPLATE_DB)?;
    let manager = ConnectionManager::<PgConnection>::new(cluster.connection().database_url(db_name));
    let pool: AssignmentPgPool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(PostgresAssignmentRepository::new(pool))
}

/// Drops the test database when the test finishes, even on panic.
pub struct CleanupGuard {
    cluster: PostgresCluster,
    db_name: String,
}

impl CleanupGuard {
    pub const fn new(cluster: PostgresCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        drop(self.cluster.drop_database(&self.db_name));
    }
}

/// Repository on a fresh database plus the runtime and clock to drive it.
///
/// Fields drop in declaration order, so the pool closes before the guard
/// drops the database.
pub struct PgContext {
    pub repository: Arc<PostgresAssignmentRepository>,
    pub clock: Arc<ManualClock>,
    pub rt: Runtime,
    _guard: CleanupGuard,
}

impl PgContext {
    /// Creates an unsaved assignment stamped with the context clock.
    pub fn assignment_for(&self, rule: u64, user: u64) -> Result<Assignment, BoxError> {
        Ok(Assignment::new(
            RuleId::new(rule)?,
            UserId::new(user)?,
            None,
            &*self.clock,
        ))
    }
}

/// Provides a migrated database, or `None` when no cluster is available.
#[fixture]
pub fn pg_context(postgres_cluster: Option<PostgresCluster>) -> Option<PgContext> {
    let cluster = postgres_cluster?;
    let context = build_context(cluster);
    match context {
        Ok(context) => Some(context),
        Err(err) => panic!("test database setup failed: {err}"),
    }
}

fn build_context(cluster: PostgresCluster) -> Result<PgContext, BoxError> {
    ensure_template(cluster)?;
    let db_name = format!("taskflow_test_{}", Uuid::new_v4().simple());
    let guard = CleanupGuard::new(cluster, db_name.clone());
    let repository = setup_repository(cluster, &db_name)?;
    Ok(PgContext {
        repository: Arc::new(repository),
        clock: Arc::new(ManualClock::new()),
        rt: test_runtime()?,
        _guard: guard,
    })
}
