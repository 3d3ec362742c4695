//! Internal Diesel row structs and their conversion to domain types.
//!
//! Rows never leave the persistence layer. Decoding goes through the domain
//! constructors so stored data that violates an invariant surfaces as an
//! error instead of an invalid aggregate.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::CourseDetails;
use crate::domain::{
    Actor, ActorRole, AvailabilityPolicy, AvailabilityPolicyDraft, Booking, BookingDraft,
    BookingId, BookingStatus, BookingValidationError, CancellationRecord, CourseId,
    ParseActorRoleError, ParseBookingStatusError, ParsePolicyModeError, PaymentRecord,
    PolicyValidationError, StudentId, TeacherId,
};

use super::schema::{
    availability_policies, booking_cancellations, booking_payments, bookings, courses,
};

/// Stored data that cannot be turned back into a domain value.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RowDecodeError {
    #[error(transparent)]
    Status(#[from] ParseBookingStatusError),
    #[error(transparent)]
    Role(#[from] ParseActorRoleError),
    #[error(transparent)]
    PolicyMode(#[from] ParsePolicyModeError),
    #[error(transparent)]
    Booking(#[from] BookingValidationError),
    #[error(transparent)]
    Policy(#[from] PolicyValidationError),
    #[error("column {column} holds out-of-range value {value}")]
    OutOfRange { column: &'static str, value: i64 },
}

fn non_negative(column: &'static str, value: i32) -> Result<u32, RowDecodeError> {
    u32::try_from(value).map_err(|_| RowDecodeError::OutOfRange {
        column,
        value: i64::from(value),
    })
}

fn to_column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Bookings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BookingRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
    pub notes: Option<String>,
    pub amount_due: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRow {
    pub(crate) fn into_domain(self) -> Result<Booking, RowDecodeError> {
        Ok(Booking::new(BookingDraft {
            id: BookingId::from_uuid(self.id),
            student_id: StudentId::from_uuid(self.student_id),
            teacher_id: TeacherId::from_uuid(self.teacher_id),
            course_id: CourseId::from_uuid(self.course_id),
            date: self.booking_date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status.parse::<BookingStatus>()?,
            notes: self.notes,
            amount_due: self.amount_due,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })?)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub(crate) struct NewBookingRow<'a> {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub course_id: Uuid,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: &'a str,
    pub notes: Option<&'a str>,
    pub amount_due: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Booking> for NewBookingRow<'a> {
    fn from(booking: &'a Booking) -> Self {
        Self {
            id: *booking.id().as_uuid(),
            student_id: *booking.student_id().as_uuid(),
            teacher_id: *booking.teacher_id().as_uuid(),
            course_id: *booking.course_id().as_uuid(),
            booking_date: booking.date(),
            start_time: booking.start_time(),
            end_time: booking.end_time(),
            status: booking.status().as_str(),
            notes: booking.notes(),
            amount_due: booking.amount_due(),
            created_at: booking.created_at(),
            updated_at: booking.updated_at(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_cancellations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CancellationRow {
    pub booking_id: Uuid,
    pub teacher_id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: String,
    pub cancelled_at: DateTime<Utc>,
    pub late: bool,
}

impl CancellationRow {
    pub(crate) fn into_domain(self) -> Result<CancellationRecord, RowDecodeError> {
        Ok(CancellationRecord {
            booking_id: BookingId::from_uuid(self.booking_id),
            teacher_id: TeacherId::from_uuid(self.teacher_id),
            actor: Actor {
                id: self.actor_id,
                role: self.actor_role.parse::<ActorRole>()?,
            },
            cancelled_at: self.cancelled_at,
            late: self.late,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_cancellations)]
pub(crate) struct NewCancellationRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub teacher_id: Uuid,
    pub actor_id: Uuid,
    pub actor_role: &'static str,
    pub cancelled_at: DateTime<Utc>,
    pub late: bool,
}

impl From<&CancellationRecord> for NewCancellationRow {
    fn from(record: &CancellationRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: *record.booking_id.as_uuid(),
            teacher_id: *record.teacher_id.as_uuid(),
            actor_id: record.actor.id,
            actor_role: record.actor.role.as_str(),
            cancelled_at: record.cancelled_at,
            late: record.late,
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub recorded_by_role: String,
}

impl PaymentRow {
    pub(crate) fn into_domain(self) -> Result<PaymentRecord, RowDecodeError> {
        Ok(PaymentRecord {
            id: self.id,
            booking_id: BookingId::from_uuid(self.booking_id),
            amount: self.amount,
            recorded_at: self.recorded_at,
            recorded_by: Actor {
                id: self.recorded_by,
                role: self.recorded_by_role.parse::<ActorRole>()?,
            },
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_payments)]
pub(crate) struct NewPaymentRow {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub recorded_by_role: &'static str,
}

impl From<&PaymentRecord> for NewPaymentRow {
    fn from(record: &PaymentRecord) -> Self {
        Self {
            id: record.id,
            booking_id: *record.booking_id.as_uuid(),
            amount: record.amount,
            recorded_at: record.recorded_at,
            recorded_by: record.recorded_by.id,
            recorded_by_role: record.recorded_by.role.as_str(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policies and courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = availability_policies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PolicyRow {
    pub booking_horizon_days: i32,
    pub buffer_minutes: i32,
    pub cancellation_deadline_hours: i32,
    pub frequent_cancellation_limit: Option<i32>,
    pub late_cancellation: String,
    pub cancellation_limit_enforcement: String,
    pub payment_grace_minutes: i32,
    pub utc_offset_minutes: i32,
}

impl PolicyRow {
    pub(crate) fn into_domain(self) -> Result<AvailabilityPolicy, RowDecodeError> {
        let draft = AvailabilityPolicyDraft {
            booking_horizon_days: non_negative("booking_horizon_days", self.booking_horizon_days)?,
            buffer_minutes: non_negative("buffer_minutes", self.buffer_minutes)?,
            cancellation_deadline_hours: non_negative(
                "cancellation_deadline_hours",
                self.cancellation_deadline_hours,
            )?,
            frequent_cancellation_limit: self
                .frequent_cancellation_limit
                .map(|limit| non_negative("frequent_cancellation_limit", limit))
                .transpose()?,
            late_cancellation: self.late_cancellation.parse()?,
            cancellation_limit_enforcement: self.cancellation_limit_enforcement.parse()?,
            payment_grace_minutes: non_negative(
                "payment_grace_minutes",
                self.payment_grace_minutes,
            )?,
            utc_offset_minutes: self.utc_offset_minutes,
        };
        Ok(AvailabilityPolicy::try_from(draft)?)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = availability_policies)]
pub(crate) struct PolicyUpsertRow {
    pub teacher_id: Uuid,
    pub booking_horizon_days: i32,
    pub buffer_minutes: i32,
    pub cancellation_deadline_hours: i32,
    pub frequent_cancellation_limit: Option<i32>,
    pub late_cancellation: &'static str,
    pub cancellation_limit_enforcement: &'static str,
    pub payment_grace_minutes: i32,
    pub utc_offset_minutes: i32,
    pub updated_at: DateTime<Utc>,
}

impl PolicyUpsertRow {
    pub(crate) fn new(teacher_id: &TeacherId, policy: &AvailabilityPolicy) -> Self {
        let draft = AvailabilityPolicyDraft::from(policy);
        Self {
            teacher_id: *teacher_id.as_uuid(),
            booking_horizon_days: to_column(draft.booking_horizon_days),
            buffer_minutes: to_column(draft.buffer_minutes),
            cancellation_deadline_hours: to_column(draft.cancellation_deadline_hours),
            frequent_cancellation_limit: draft.frequent_cancellation_limit.map(to_column),
            late_cancellation: draft.late_cancellation.as_str(),
            cancellation_limit_enforcement: draft.cancellation_limit_enforcement.as_str(),
            payment_grace_minutes: to_column(draft.payment_grace_minutes),
            utc_offset_minutes: draft.utc_offset_minutes,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub duration_minutes: i32,
    pub price: i64,
    pub is_active: bool,
}

impl CourseRow {
    pub(crate) fn into_domain(self) -> Result<CourseDetails, RowDecodeError> {
        Ok(CourseDetails {
            id: CourseId::from_uuid(self.id),
            teacher_id: TeacherId::from_uuid(self.teacher_id),
            duration_minutes: non_negative("duration_minutes", self.duration_minutes)?,
            price: self.price,
            is_active: self.is_active,
        })
    }
}
