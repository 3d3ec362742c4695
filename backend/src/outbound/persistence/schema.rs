//! Diesel table definitions for the booking schema.
//!
//! Must match `backend/migrations` exactly; regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Saved per-teacher availability policies; absent rows mean defaults.
    availability_policies (teacher_id) {
        teacher_id -> Uuid,
        booking_horizon_days -> Int4,
        buffer_minutes -> Int4,
        cancellation_deadline_hours -> Int4,
        frequent_cancellation_limit -> Nullable<Int4>,
        late_cancellation -> Varchar,
        cancellation_limit_enforcement -> Varchar,
        payment_grace_minutes -> Int4,
        utc_offset_minutes -> Int4,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Read-only projection of the course catalogue.
    courses (id) {
        id -> Uuid,
        teacher_id -> Uuid,
        duration_minutes -> Int4,
        price -> Int8,
        is_active -> Bool,
    }
}

diesel::table! {
    /// Bookings; date and times are in the teacher's canonical offset.
    bookings (id) {
        id -> Uuid,
        student_id -> Uuid,
        teacher_id -> Uuid,
        course_id -> Uuid,
        booking_date -> Date,
        start_time -> Time,
        end_time -> Time,
        status -> Varchar,
        notes -> Nullable<Text>,
        amount_due -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only audit of confirmed-to-cancelled transitions.
    booking_cancellations (id) {
        id -> Uuid,
        booking_id -> Uuid,
        teacher_id -> Uuid,
        actor_id -> Uuid,
        actor_role -> Varchar,
        cancelled_at -> Timestamptz,
        late -> Bool,
    }
}

diesel::table! {
    /// Append-only payment ledger.
    booking_payments (id) {
        id -> Uuid,
        booking_id -> Uuid,
        amount -> Int8,
        recorded_at -> Timestamptz,
        recorded_by -> Uuid,
        recorded_by_role -> Varchar,
    }
}

diesel::joinable!(booking_cancellations -> bookings (booking_id));
diesel::joinable!(booking_payments -> bookings (booking_id));

diesel::allow_tables_to_appear_in_same_query!(
    availability_policies,
    booking_cancellations,
    booking_payments,
    bookings,
    courses,
);
