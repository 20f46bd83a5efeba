//! Diesel row models for assignment persistence.

use super::schema::assignments;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for assignment records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = assignments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AssignmentRow {
    /// Internal assignment identifier.
    pub id: uuid::Uuid,
    /// Owning rule identifier.
    pub rule_id: i64,
    /// Assigned learner identifier.
    pub user_id: i64,
    /// Numeric status code.
    pub status: i16,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Overdue counter.
    pub overdue_counter: i64,
    /// Prolonged counter.
    pub prolonged_counter: i64,
    /// Operator comment.
    pub comment: Option<String>,
    /// Keep-changes flag.
    pub keep_changes: bool,
    /// Last computed status code.
    pub computed_status: Option<i16>,
    /// Optimistic concurrency revision.
    pub revision: i64,
    /// History JSON payload.
    pub history: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for assignment records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = assignments)]
pub struct NewAssignmentRow {
    /// Internal assignment identifier.
    pub id: uuid::Uuid,
    /// Owning rule identifier.
    pub rule_id: i64,
    /// Assigned learner identifier.
    pub user_id: i64,
    /// Numeric status code.
    pub status: i16,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Overdue counter.
    pub overdue_counter: i64,
    /// Prolonged counter.
    pub prolonged_counter: i64,
    /// Operator comment.
    pub comment: Option<String>,
    /// Keep-changes flag.
    pub keep_changes: bool,
    /// Last computed status code.
    pub computed_status: Option<i16>,
    /// Optimistic concurrency revision.
    pub revision: i64,
    /// History JSON payload.
    pub history: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Mutable columns written by revision-checked updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = assignments)]
#[diesel(treat_none_as_null = true)]
pub struct AssignmentChangeset {
    /// Numeric status code.
    pub status: i16,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Overdue counter.
    pub overdue_counter: i64,
    /// Prolonged counter.
    pub prolonged_counter: i64,
    /// Operator comment.
    pub comment: Option<String>,
    /// Keep-changes flag.
    pub keep_changes: bool,
    /// Last computed status code.
    pub computed_status: Option<i16>,
    /// New revision.
    pub revision: i64,
    /// History JSON payload.
    pub history: Value,
    /// Last write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<NewAssignmentRow> for AssignmentChangeset {
    fn from(row: NewAssignmentRow) -> Self {
        Self {
            status: row.status,
            due_date: row.due_date,
            overdue_counter: row.overdue_counter,
            prolonged_counter: row.prolonged_counter,
            comment: row.comment,
            keep_changes: row.keep_changes,
            computed_status: row.computed_status,
            revision: row.revision,
            history: row.history,
            updated_at: row.updated_at,
        }
    }
}
