//! `PostgreSQL` repository implementation for assignment storage.

use super::{
    models::{AssignmentChangeset, AssignmentRow, NewAssignmentRow},
    schema::assignments,
};
use crate::assignment::{
    domain::{
        Assignment, AssignmentId, AssignmentStatus, PersistedAssignmentData, Revision, RuleId,
        StatusChange, UserId,
    },
    ports::{
        AssignmentRepository, AssignmentRepositoryError, AssignmentRepositoryResult,
        ConflictError,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by assignment adapters.
pub type AssignmentPgPool = Pool<ConnectionManager<PgConnection>>;

const RULE_USER_UNIQUE_INDEX: &str = "idx_assignments_rule_user_unique";

/// `PostgreSQL`-backed assignment repository.
#[derive(Debug, Clone)]
pub struct PostgresAssignmentRepository {
    pool: AssignmentPgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: AssignmentPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> AssignmentRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> AssignmentRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(AssignmentRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(AssignmentRepositoryError::persistence)?
    }
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn store(&self, assignment: &Assignment) -> AssignmentRepositoryResult<()> {
        let assignment_id = assignment.id();
        let rule_id = assignment.rule_id();
        let user_id = assignment.user_id();
        let new_row = to_new_row(assignment)?;

        self.run_blocking(move |connection| {
            diesel::insert_into(assignments::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_rule_user_unique_violation(info.as_ref()) =>
                    {
                        AssignmentRepositoryError::DuplicateAssignment { rule_id, user_id }
                    }
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        AssignmentRepositoryError::DuplicateId(assignment_id)
                    }
                    _ => AssignmentRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(
        &self,
        assignment: &Assignment,
        expected: Revision,
    ) -> AssignmentRepositoryResult<()> {
        let assignment_id = assignment.id();
        let changeset = AssignmentChangeset::from(to_new_row(assignment)?);
        let expected_value = revision_to_db(expected)?;

        self.run_blocking(move |connection| {
            let affected = diesel::update(
                assignments::table
                    .filter(assignments::id.eq(assignment_id.into_inner()))
                    .filter(assignments::revision.eq(expected_value)),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(AssignmentRepositoryError::persistence)?;

            if affected > 0 {
                return Ok(());
            }

            let current = assignments::table
                .filter(assignments::id.eq(assignment_id.into_inner()))
                .select(assignments::revision)
                .first::<i64>(connection)
                .optional()
                .map_err(AssignmentRepositoryError::persistence)?;

            match current {
                None => Err(AssignmentRepositoryError::NotFound(assignment_id)),
                Some(actual) => Err(ConflictError {
                    assignment_id,
                    expected,
                    actual: revision_from_db(actual)?,
                }
                .into()),
            }
        })
        .await
    }

    async fn find_by_id(&self, id: AssignmentId) -> AssignmentRepositoryResult<Option<Assignment>> {
        self.run_blocking(move |connection| {
            let row = assignments::table
                .filter(assignments::id.eq(id.into_inner()))
                .select(AssignmentRow::as_select())
                .first::<AssignmentRow>(connection)
                .optional()
                .map_err(AssignmentRepositoryError::persistence)?;
            row.map(row_to_assignment).transpose()
        })
        .await
    }

    async fn find_by_rule_and_user(
        &self,
        rule_id: RuleId,
        user_id: UserId,
    ) -> AssignmentRepositoryResult<Option<Assignment>> {
        let rule_value = id_to_db(rule_id.value())?;
        let user_value = id_to_db(user_id.value())?;
        self.run_blocking(move |connection| {
            let row = assignments::table
                .filter(assignments::rule_id.eq(rule_value))
                .filter(assignments::user_id.eq(user_value))
                .select(AssignmentRow::as_select())
                .first::<AssignmentRow>(connection)
                .optional()
                .map_err(AssignmentRepositoryError::persistence)?;
            row.map(row_to_assignment).transpose()
        })
        .await
    }

    async fn find_by_user(&self, user_id: UserId) -> AssignmentRepositoryResult<Vec<Assignment>> {
        let user_value = id_to_db(user_id.value())?;
        self.run_blocking(move |connection| {
            let rows = assignments::table
                .filter(assignments::user_id.eq(user_value))
                .order((assignments::created_at.asc(), assignments::id.asc()))
                .select(AssignmentRow::as_select())
                .load::<AssignmentRow>(connection)
                .map_err(AssignmentRepositoryError::persistence)?;
            rows.into_iter().map(row_to_assignment).collect()
        })
        .await
    }

    async fn list_active(&self) -> AssignmentRepositoryResult<Vec<Assignment>> {
        let terminal_codes: Vec<i16> = AssignmentStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .map(status_to_db)
            .collect();
        self.run_blocking(move |connection| {
            let rows = assignments::table
                .filter(diesel::dsl::not(assignments::status.eq_any(terminal_codes)))
                .order((assignments::created_at.asc(), assignments::id.asc()))
                .select(AssignmentRow::as_select())
                .load::<AssignmentRow>(connection)
                .map_err(AssignmentRepositoryError::persistence)?;
            rows.into_iter().map(row_to_assignment).collect()
        })
        .await
    }
}

/// Converts an assignment into its insert row.
pub(crate) fn to_new_row(assignment: &Assignment) -> AssignmentRepositoryResult<NewAssignmentRow> {
    let history =
        serde_json::to_value(assignment.history()).map_err(AssignmentRepositoryError::persistence)?;

    Ok(NewAssignmentRow {
        id: assignment.id().into_inner(),
        rule_id: id_to_db(assignment.rule_id().value())?,
        user_id: id_to_db(assignment.user_id().value())?,
        status: status_to_db(assignment.status()),
        due_date: assignment.due_date(),
        overdue_counter: counter_to_db(assignment.overdue_counter()),
        prolonged_counter: counter_to_db(assignment.prolonged_counter()),
        comment: assignment.comment().map(str::to_owned),
        keep_changes: assignment.keep_changes(),
        computed_status: assignment.computed_status().map(status_to_db),
        revision: revision_to_db(assignment.revision())?,
        history,
        created_at: assignment.created_at(),
        updated_at: assignment.updated_at(),
    })
}

/// Reconstructs an assignment from a stored row.
pub(crate) fn row_to_assignment(row: AssignmentRow) -> AssignmentRepositoryResult<Assignment> {
    let AssignmentRow {
        id,
        rule_id,
        user_id,
        status,
        due_date,
        overdue_counter,
        prolonged_counter,
        comment,
        keep_changes,
        computed_status,
        revision,
        history,
        created_at,
        updated_at,
    } = row;

    let history = serde_json::from_value::<Vec<StatusChange>>(history)
        .map_err(AssignmentRepositoryError::persistence)?;

    let data = PersistedAssignmentData {
        id: AssignmentId::from_uuid(id),
        rule_id: RuleId::new(id_from_db(rule_id)?).map_err(AssignmentRepositoryError::persistence)?,
        user_id: UserId::new(id_from_db(user_id)?).map_err(AssignmentRepositoryError::persistence)?,
        status: status_from_db(status)?,
        due_date,
        overdue_counter: counter_from_db(overdue_counter)?,
        prolonged_counter: counter_from_db(prolonged_counter)?,
        comment,
        keep_changes,
        computed_status: computed_status.map(status_from_db).transpose()?,
        revision: revision_from_db(revision)?,
        history,
        created_at,
        updated_at,
    };
    Ok(Assignment::from_persisted(data))
}

fn status_to_db(status: AssignmentStatus) -> i16 {
    i16::from(status.code())
}

fn status_from_db(code: i16) -> AssignmentRepositoryResult<AssignmentStatus> {
    AssignmentStatus::from_code(i64::from(code)).map_err(AssignmentRepositoryError::persistence)
}

fn id_to_db(value: u64) -> AssignmentRepositoryResult<i64> {
    i64::try_from(value).map_err(AssignmentRepositoryError::persistence)
}

fn id_from_db(value: i64) -> AssignmentRepositoryResult<u64> {
    u64::try_from(value).map_err(AssignmentRepositoryError::persistence)
}

fn counter_to_db(value: u32) -> i64 {
    i64::from(value)
}

fn counter_from_db(value: i64) -> AssignmentRepositoryResult<u32> {
    u32::try_from(value).map_err(AssignmentRepositoryError::persistence)
}

fn revision_to_db(revision: Revision) -> AssignmentRepositoryResult<i64> {
    i64::try_from(revision.value()).map_err(AssignmentRepositoryError::persistence)
}

fn revision_from_db(value: i64) -> AssignmentRepositoryResult<Revision> {
    u64::try_from(value)
        .map(Revision::new)
        .map_err(AssignmentRepositoryError::persistence)
}

fn is_rule_user_unique_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == RULE_USER_UNIQUE_INDEX)
}
