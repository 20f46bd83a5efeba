//! Diesel schema for assignment persistence.

diesel::table! {
    /// Learner assignments with status, counters and revision.
    assignments (id) {
        /// Internal assignment identifier.
        id -> Uuid,
        /// Owning rule identifier.
        rule_id -> Int8,
        /// Assigned learner identifier.
        user_id -> Int8,
        /// Numeric status code.
        status -> Int2,
        /// Optional due date.
        due_date -> Nullable<Timestamptz>,
        /// Number of times the assignment became overdue.
        overdue_counter -> Int8,
        /// Number of times the assignment was prolonged.
        prolonged_counter -> Int8,
        /// Free-text operator comment.
        comment -> Nullable<Text>,
        /// Whether reconciliation must keep the manual status.
        keep_changes -> Bool,
        /// Status computed by the last reconciliation.
        computed_status -> Nullable<Int2>,
        /// Optimistic concurrency revision.
        revision -> Int8,
        /// Status change history as a JSON array.
        history -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last write timestamp.
        updated_at -> Timestamptz,
    }
}
