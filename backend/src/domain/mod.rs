//! Booking domain: entities, pure rules, ports, and services.
//!
//! Purpose: keep the scheduling rules (slot arithmetic, status lifecycle,
//! cancellation policy, payment derivation) free of I/O so they can be
//! exercised directly, and express every dependency on storage or delivery
//! as a port trait.
//!
//! Public surface:
//! - [`Booking`], [`BookingStatus`], [`AvailabilityPolicy`] — aggregates.
//! - [`find_conflict`], [`booking::lifecycle::apply_transition`],
//!   [`derive_payment_status`] — pure rules.
//! - [`BookingService`] — implements the [`ports::BookingCommand`] and
//!   [`ports::BookingQuery`] driving ports.
//! - [`Error`] — transport-agnostic error payload.

pub mod booking;
pub mod booking_error;
pub mod booking_events;
pub mod booking_service;
pub mod error;
pub mod identity;
pub mod payments;
pub mod policy;
pub mod ports;
pub mod slots;
pub mod teacher_locks;
pub mod trace_id;

pub use self::booking::lifecycle::{
    BookingAction, Initiator, TransitionError, TransitionOutcome, apply_transition,
    due_time_based_action,
};
pub use self::booking::{
    Booking, BookingDraft, BookingStatus, BookingValidationError, DateRange, NOTES_MAX_CHARS,
    ParseBookingStatusError,
};
pub use self::booking_error::{BookingError, RepositoryFailure};
pub use self::booking_events::{BookingEvent, BookingEventKind};
pub use self::booking_service::{BookingService, BookingServiceConfig, BookingServicePorts};
pub use self::error::{Error, ErrorCode, TRACE_ID_HEADER};
pub use self::identity::{
    Actor, ActorRole, BookingId, CourseId, ParseActorRoleError, StudentId, TeacherId,
};
pub use self::payments::{
    PaymentRecord, PaymentRejection, PaymentStatus, PaymentSummary, derive_payment_status,
    ensure_within_amount_due, total_paid,
};
pub use self::policy::{
    AvailabilityPolicy, AvailabilityPolicyDraft, CANCELLATION_WINDOW_DAYS,
    CancellationAssessment, CancellationLimitEnforcement, CancellationRecord,
    LateCancellationRule, ParsePolicyModeError, PolicyValidationError,
};
pub use self::slots::{SlotError, SlotInterval, find_conflict};
pub use self::teacher_locks::{LockTimeout, TeacherLockGuard, TeacherLocks};
pub use self::trace_id::TraceId;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use booking_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
