//! Driving port for booking mutations.
//!
//! Every operation carries the acting principal; services authorise against
//! it before touching storage.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::domain::{
    Actor, AvailabilityPolicy, AvailabilityPolicyDraft, BookingError, BookingId, CourseId,
    StudentId, TeacherId,
};

use super::{BookingView, PaymentLedger};

/// Request to reserve a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveBookingRequest {
    /// Acting principal; the student themself or an administrator.
    pub actor: Actor,
    /// Student the booking is for.
    pub student_id: StudentId,
    /// Teacher to book.
    pub teacher_id: TeacherId,
    /// Course to book.
    pub course_id: CourseId,
    /// Date in the teacher's canonical timezone.
    pub date: NaiveDate,
    /// Start time in the teacher's canonical timezone.
    pub start_time: NaiveTime,
    /// Optional notes for the teacher.
    pub notes: Option<String>,
}

/// Request to act on an existing booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingActionRequest {
    /// Acting principal.
    pub actor: Actor,
    /// Target booking.
    pub booking_id: BookingId,
}

/// Request to record a received payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPaymentRequest {
    /// Acting principal; the booking's teacher or an administrator.
    pub actor: Actor,
    /// Target booking.
    pub booking_id: BookingId,
    /// Amount received in minor currency units.
    pub amount: i64,
}

/// Request to replace a teacher's availability policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateAvailabilityPolicyRequest {
    /// Acting principal; the teacher themself or an administrator.
    pub actor: Actor,
    /// Teacher whose policy is replaced.
    pub teacher_id: TeacherId,
    /// New settings.
    pub policy: AvailabilityPolicyDraft,
}

/// Result of a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// Booking after cancellation.
    pub booking: BookingView,
    /// Whether the cancellation missed the deadline.
    pub late: bool,
    /// Late cancellations by the actor's role in the trailing window, this one included.
    pub recent_cancellations: u32,
    /// Whether the actor has exceeded the frequent-cancellation limit.
    pub suspension_recommended: bool,
}

/// Driving port for booking mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingCommand: Send + Sync {
    /// Reserve a slot in `pending`.
    async fn reserve(&self, request: ReserveBookingRequest) -> Result<BookingView, BookingError>;

    /// Confirm a pending booking.
    async fn confirm(&self, request: BookingActionRequest) -> Result<BookingView, BookingError>;

    /// Decline a pending booking.
    async fn decline(&self, request: BookingActionRequest) -> Result<BookingView, BookingError>;

    /// Cancel a confirmed booking.
    async fn cancel(
        &self,
        request: BookingActionRequest,
    ) -> Result<CancellationOutcome, BookingError>;

    /// Record a payment against a booking.
    async fn record_payment(
        &self,
        request: RecordPaymentRequest,
    ) -> Result<PaymentLedger, BookingError>;

    /// Replace a teacher's availability policy.
    async fn update_availability_policy(
        &self,
        request: UpdateAvailabilityPolicyRequest,
    ) -> Result<AvailabilityPolicy, BookingError>;
}
