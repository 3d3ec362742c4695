//! Port for booking persistence.
//!
//! Adapters must make [`BookingRepository::commit_reservation`] and
//! [`BookingRepository::apply_transition`] atomic with respect to other
//! writers for the same teacher, even across service processes.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::{
    Booking, BookingId, BookingStatus, CancellationRecord, DateRange, TeacherId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by booking repository adapters.
    pub enum BookingRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "booking repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "booking repository query failed: {message}",
    }
}

/// Result of a guarded reservation insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationCommit {
    /// The booking was stored.
    Committed,
    /// An active booking overlaps the candidate; nothing was stored.
    Conflict(Booking),
}

/// Compare-and-set status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Booking in its new state.
    pub booking: Booking,
    /// Status the stored row must still have.
    pub expected: BookingStatus,
    /// Audit row appended in the same transaction for cancellations.
    pub cancellation: Option<CancellationRecord>,
}

/// Port for reading and writing bookings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Find a booking by id.
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, BookingRepositoryError>;

    /// List a teacher's bookings whose date falls in `range`, ordered by
    /// start. With `active_only`, only pending and confirmed bookings.
    async fn list_for_teacher(
        &self,
        teacher_id: &TeacherId,
        range: DateRange,
        active_only: bool,
    ) -> Result<Vec<Booking>, BookingRepositoryError>;

    /// Insert `booking` unless an active booking of the same teacher
    /// overlaps it after `buffer` padding. The check and insert are atomic.
    async fn commit_reservation(
        &self,
        booking: &Booking,
        buffer: TimeDelta,
    ) -> Result<ReservationCommit, BookingRepositoryError>;

    /// Store `update.booking` if the stored status still equals
    /// `update.expected`. Returns `false` when another writer got there first.
    async fn apply_transition(&self, update: &StatusUpdate)
    -> Result<bool, BookingRepositoryError>;

    /// Cancellations of the teacher's bookings recorded after `since`.
    async fn list_cancellations(
        &self,
        teacher_id: &TeacherId,
        since: DateTime<Utc>,
    ) -> Result<Vec<CancellationRecord>, BookingRepositoryError>;
}
