//! Driving port for booking reads.
//!
//! Reads settle due time-based transitions before answering, so callers
//! never observe a pending booking whose start has passed.

use async_trait::async_trait;

use crate::domain::{
    Actor, AvailabilityPolicy, Booking, BookingError, BookingId, DateRange, PaymentRecord,
    PaymentSummary, TeacherId,
};

/// Booking together with its derived payment summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingView {
    /// Booking state.
    pub booking: Booking,
    /// Derived payment totals.
    pub payment: PaymentSummary,
}

/// Payment records of one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLedger {
    /// Booking the records belong to.
    pub booking_id: BookingId,
    /// Records in recording order.
    pub records: Vec<PaymentRecord>,
    /// Derived totals.
    pub summary: PaymentSummary,
}

/// Request to list a teacher's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListTeacherBookingsRequest {
    /// Acting principal; the teacher themself or an administrator.
    pub actor: Actor,
    /// Teacher whose bookings are listed.
    pub teacher_id: TeacherId,
    /// Dates to include.
    pub range: DateRange,
}

/// Driving port for booking reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingQuery: Send + Sync {
    /// Fetch one booking visible to `actor`.
    async fn get_booking(
        &self,
        actor: Actor,
        booking_id: BookingId,
    ) -> Result<BookingView, BookingError>;

    /// List a teacher's bookings in a date range, ordered by start.
    async fn list_teacher_bookings(
        &self,
        request: ListTeacherBookingsRequest,
    ) -> Result<Vec<BookingView>, BookingError>;

    /// List the payment records of a booking.
    async fn list_payments(
        &self,
        actor: Actor,
        booking_id: BookingId,
    ) -> Result<PaymentLedger, BookingError>;

    /// The teacher's effective policy (defaults when none is saved).
    async fn availability_policy(
        &self,
        teacher_id: TeacherId,
    ) -> Result<AvailabilityPolicy, BookingError>;
}
