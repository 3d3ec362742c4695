//! Errors raised by the booking services.
//!
//! Each variant carries the context a presentation layer needs to explain the
//! rejection. [`BookingError::kind`] is the stable machine-readable name and
//! the `From<BookingError> for Error` conversion chooses the transport code.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};

use crate::domain::booking::lifecycle::{BookingAction, TransitionError};
use crate::domain::payments::PaymentRejection;
use crate::domain::ports::{
    AvailabilityPolicyRepositoryError, BookingRepositoryError, CourseCatalogError,
    PaymentLedgerRepositoryError,
};
use crate::domain::{
    BookingId, BookingStatus, CourseId, Error, LockTimeout, SlotError, SlotInterval, TeacherId,
};

/// Storage failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryFailure {
    /// The store could not be reached.
    Connection,
    /// A query or mutation failed.
    Query,
}

/// Booking service error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    /// The requested slot does not form a valid single-day interval.
    #[error("invalid slot: {0}")]
    InvalidInterval(SlotError),
    /// Request payload failed validation.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// Validation message.
        message: String,
    },
    /// The requested date is beyond the booking horizon.
    #[error("{requested} is beyond the booking horizon (latest bookable date {latest})")]
    HorizonExceeded {
        /// Requested date.
        requested: NaiveDate,
        /// Latest bookable date.
        latest: NaiveDate,
    },
    /// The requested slot does not start in the future.
    #[error("slot starting {start} is not in the future")]
    SlotInPast {
        /// Requested local start.
        start: NaiveDateTime,
    },
    /// The course is inactive, unknown, or owned by another teacher.
    #[error("course {course_id} is not available for booking with this teacher")]
    CourseUnavailable {
        /// Requested course.
        course_id: CourseId,
    },
    /// The slot overlaps an active booking once buffers are applied.
    #[error("slot conflicts with booking {conflicting_booking_id} ({conflicting_interval})")]
    SlotConflict {
        /// Conflicting booking.
        conflicting_booking_id: BookingId,
        /// Interval held by the conflicting booking.
        conflicting_interval: SlotInterval,
    },
    /// The cancellation missed the deadline and late cancellations are refused.
    #[error("cancellation deadline of {deadline_hours}h before start has passed")]
    PastCancellationDeadline {
        /// Affected booking.
        booking_id: BookingId,
        /// Remaining minutes before start.
        lead_time_minutes: i64,
        /// Configured deadline in hours.
        deadline_hours: i64,
    },
    /// The actor's role cancelled late too often in the trailing window.
    #[error("cancellation limit of {limit} per 7 days exceeded ({recent} recent)")]
    CancellationLimitExceeded {
        /// Configured limit.
        limit: u32,
        /// Late cancellations counted in the window.
        recent: u32,
    },
    /// The payment would exceed the amount due.
    #[error("payment of {attempted} exceeds the outstanding amount ({already_paid} of {amount_due} paid)")]
    Overpayment {
        /// Affected booking.
        booking_id: BookingId,
        /// Amount due.
        amount_due: i64,
        /// Amount already paid.
        already_paid: i64,
        /// Rejected amount.
        attempted: i64,
    },
    /// The booking no longer accepts payments.
    #[error("booking {booking_id} is {status} and does not accept payments")]
    PaymentNotAccepted {
        /// Affected booking.
        booking_id: BookingId,
        /// Current status.
        status: BookingStatus,
    },
    /// Payment amounts must be positive.
    #[error("payment amount must be positive (got {amount})")]
    InvalidAmount {
        /// Rejected amount.
        amount: i64,
    },
    /// The action is not allowed from the booking's current status.
    #[error("cannot {action} booking {booking_id} while it is {from}")]
    InvalidTransition {
        /// Affected booking.
        booking_id: BookingId,
        /// Current status.
        from: BookingStatus,
        /// Requested action.
        action: BookingAction,
    },
    /// The actor may not perform this operation.
    #[error("not authorised to {operation}")]
    NotAuthorised {
        /// Operation name.
        operation: String,
    },
    /// The booking does not exist.
    #[error("booking {booking_id} not found")]
    NotFound {
        /// Requested booking.
        booking_id: BookingId,
    },
    /// The teacher lock could not be acquired in time.
    #[error("timed out waiting for teacher {teacher_id} after {waited_ms} ms")]
    ReservationTimeout {
        /// Teacher whose lock was contended.
        teacher_id: TeacherId,
        /// Configured wait.
        waited_ms: u64,
    },
    /// A storage adapter failed.
    #[error("repository failure: {message}")]
    Repository {
        /// Failure category.
        failure: RepositoryFailure,
        /// Adapter message.
        message: String,
    },
}

impl BookingError {
    /// Stable machine-readable name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInterval(_) => "invalid_interval",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::HorizonExceeded { .. } => "horizon_exceeded",
            Self::SlotInPast { .. } => "slot_in_past",
            Self::CourseUnavailable { .. } => "course_unavailable",
            Self::SlotConflict { .. } => "slot_conflict",
            Self::PastCancellationDeadline { .. } => "past_cancellation_deadline",
            Self::CancellationLimitExceeded { .. } => "cancellation_limit_exceeded",
            Self::Overpayment { .. } => "overpayment",
            Self::PaymentNotAccepted { .. } => "payment_not_accepted",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotAuthorised { .. } => "not_authorised",
            Self::NotFound { .. } => "not_found",
            Self::ReservationTimeout { .. } => "reservation_timeout",
            Self::Repository { .. } => "repository",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ReservationTimeout { .. }
                | Self::Repository {
                    failure: RepositoryFailure::Connection,
                    ..
                }
        )
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn not_authorised(operation: impl Into<String>) -> Self {
        Self::NotAuthorised {
            operation: operation.into(),
        }
    }

    pub(crate) fn from_transition(booking_id: BookingId, err: TransitionError) -> Self {
        match err {
            TransitionError::NotAuthorised { action } => {
                Self::not_authorised(format!("{action} this booking"))
            }
            TransitionError::InvalidTransition { from, action } => Self::InvalidTransition {
                booking_id,
                from,
                action,
            },
            TransitionError::NotYetDue { action, .. } => Self::InvalidTransition {
                booking_id,
                from: action.source(),
                action,
            },
        }
    }

    pub(crate) fn from_payment_rejection(
        booking_id: BookingId,
        amount: i64,
        rejection: PaymentRejection,
    ) -> Self {
        match rejection {
            PaymentRejection::NonPositiveAmount => Self::InvalidAmount { amount },
            PaymentRejection::Overpayment {
                amount_due,
                already_paid,
            } => Self::Overpayment {
                booking_id,
                amount_due,
                already_paid,
                attempted: amount,
            },
        }
    }

    fn details(&self) -> Value {
        let context = match self {
            Self::InvalidInterval(err) => json!({ "reason": err.to_string() }),
            Self::HorizonExceeded { requested, latest } => json!({
                "requestedDate": requested.to_string(),
                "latestBookableDate": latest.to_string(),
            }),
            Self::SlotInPast { start } => json!({ "start": start.to_string() }),
            Self::CourseUnavailable { course_id } => json!({ "courseId": course_id }),
            Self::SlotConflict {
                conflicting_booking_id,
                conflicting_interval,
            } => json!({
                "conflictingBookingId": conflicting_booking_id,
                "conflictingInterval": {
                    "date": conflicting_interval.start().date().to_string(),
                    "startTime": conflicting_interval.start().time().format("%H:%M").to_string(),
                    "endTime": conflicting_interval.end().time().format("%H:%M").to_string(),
                },
            }),
            Self::PastCancellationDeadline {
                booking_id,
                lead_time_minutes,
                deadline_hours,
            } => json!({
                "bookingId": booking_id,
                "leadTimeMinutes": lead_time_minutes,
                "deadlineHours": deadline_hours,
            }),
            Self::CancellationLimitExceeded { limit, recent } => {
                json!({ "limit": limit, "recentCancellations": recent })
            }
            Self::Overpayment {
                booking_id,
                amount_due,
                already_paid,
                attempted,
            } => json!({
                "bookingId": booking_id,
                "amountDue": amount_due,
                "amountPaid": already_paid,
                "attempted": attempted,
            }),
            Self::PaymentNotAccepted { booking_id, status } => json!({
                "bookingId": booking_id,
                "status": status,
            }),
            Self::InvalidAmount { amount } => json!({ "amount": amount }),
            Self::InvalidTransition {
                booking_id,
                from,
                action,
            } => json!({
                "bookingId": booking_id,
                "status": from,
                "action": action,
            }),
            Self::NotFound { booking_id } => json!({ "bookingId": booking_id }),
            Self::ReservationTimeout { teacher_id, .. } => json!({
                "teacherId": teacher_id,
                "retryable": true,
            }),
            Self::InvalidRequest { .. } | Self::NotAuthorised { .. } | Self::Repository { .. } => {
                json!({})
            }
        };
        let mut details = context;
        if let Value::Object(map) = &mut details {
            map.insert("kind".to_owned(), Value::String(self.kind().to_owned()));
        }
        details
    }
}

impl From<BookingError> for Error {
    fn from(value: BookingError) -> Self {
        let message = value.to_string();
        let error = match &value {
            BookingError::InvalidInterval(_)
            | BookingError::InvalidRequest { .. }
            | BookingError::InvalidAmount { .. } => Error::invalid_request(message),
            BookingError::SlotConflict { .. } | BookingError::Overpayment { .. } => {
                Error::conflict(message)
            }
            BookingError::HorizonExceeded { .. }
            | BookingError::SlotInPast { .. }
            | BookingError::CourseUnavailable { .. }
            | BookingError::PastCancellationDeadline { .. }
            | BookingError::CancellationLimitExceeded { .. }
            | BookingError::PaymentNotAccepted { .. }
            | BookingError::InvalidTransition { .. } => Error::unprocessable(message),
            BookingError::NotAuthorised { .. } => Error::forbidden(message),
            BookingError::NotFound { .. } => Error::not_found(message),
            BookingError::ReservationTimeout { .. }
            | BookingError::Repository {
                failure: RepositoryFailure::Connection,
                ..
            } => Error::service_unavailable(message),
            BookingError::Repository {
                failure: RepositoryFailure::Query,
                ..
            } => Error::internal(message),
        };
        error.with_details(value.details())
    }
}

impl From<LockTimeout> for BookingError {
    fn from(value: LockTimeout) -> Self {
        Self::ReservationTimeout {
            teacher_id: value.teacher_id,
            waited_ms: u64::try_from(value.waited.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl From<SlotError> for BookingError {
    fn from(value: SlotError) -> Self {
        Self::InvalidInterval(value)
    }
}

macro_rules! repository_error_conversion {
    ($($port_error:ident),* $(,)?) => {
        $(
            impl From<$port_error> for BookingError {
                fn from(value: $port_error) -> Self {
                    match value {
                        $port_error::Connection { message } => Self::Repository {
                            failure: RepositoryFailure::Connection,
                            message,
                        },
                        $port_error::Query { message } => Self::Repository {
                            failure: RepositoryFailure::Query,
                            message,
                        },
                    }
                }
            }
        )*
    };
}

repository_error_conversion!(
    BookingRepositoryError,
    AvailabilityPolicyRepositoryError,
    CourseCatalogError,
    PaymentLedgerRepositoryError,
);

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, TimeDelta};
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    fn interval() -> SlotInterval {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).expect("date");
        SlotInterval::on_date(
            date,
            NaiveTime::from_hms_opt(14, 0, 0).expect("time"),
            TimeDelta::hours(2),
        )
        .expect("interval")
    }

    #[rstest]
    #[case(BookingError::invalid_request("bad"), ErrorCode::InvalidRequest)]
    #[case(BookingError::InvalidAmount { amount: 0 }, ErrorCode::InvalidRequest)]
    #[case(
        BookingError::SlotConflict {
            conflicting_booking_id: BookingId::from_uuid(uuid::Uuid::nil()),
            conflicting_interval: interval(),
        },
        ErrorCode::Conflict
    )]
    #[case(BookingError::CancellationLimitExceeded { limit: 2, recent: 2 }, ErrorCode::Unprocessable)]
    #[case(BookingError::not_authorised("cancel"), ErrorCode::Forbidden)]
    #[case(
        BookingError::NotFound { booking_id: BookingId::from_uuid(uuid::Uuid::nil()) },
        ErrorCode::NotFound
    )]
    #[case(
        BookingError::ReservationTimeout { teacher_id: TeacherId::from_uuid(uuid::Uuid::nil()), waited_ms: 10 },
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        BookingError::Repository { failure: RepositoryFailure::Query, message: "boom".into() },
        ErrorCode::InternalError
    )]
    fn maps_to_transport_codes(#[case] err: BookingError, #[case] expected: ErrorCode) {
        let kind = err.kind();
        let mapped = Error::from(err);
        assert_eq!(mapped.code(), expected);
        assert_eq!(
            mapped.details().and_then(|d| d.get("kind")).and_then(Value::as_str),
            Some(kind)
        );
    }

    #[rstest]
    fn conflict_details_reference_the_existing_interval() {
        let id = BookingId::random();
        let err = Error::from(BookingError::SlotConflict {
            conflicting_booking_id: id,
            conflicting_interval: interval(),
        });
        let details = err.details().expect("details");
        assert_eq!(details["conflictingBookingId"], json!(id));
        assert_eq!(details["conflictingInterval"]["startTime"], "14:00");
        assert_eq!(details["conflictingInterval"]["endTime"], "16:00");
    }

    #[rstest]
    fn connection_failures_are_retryable() {
        let err = BookingError::from(BookingRepositoryError::connection("refused"));
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "repository");
    }
}
