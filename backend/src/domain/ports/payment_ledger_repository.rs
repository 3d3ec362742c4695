//! Port for the append-only payment ledger.

use async_trait::async_trait;

use crate::domain::{BookingId, PaymentRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment ledger adapters.
    pub enum PaymentLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "payment ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "payment ledger query failed: {message}",
    }
}

/// Result of a guarded ledger append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAppend {
    /// The record was stored.
    Appended,
    /// Storing the record would push the total past the amount due.
    WouldOverpay {
        /// Total already recorded for the booking.
        already_paid: i64,
    },
}

/// Port for payment records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentLedgerRepository: Send + Sync {
    /// Records for a booking in recording order.
    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<PaymentRecord>, PaymentLedgerRepositoryError>;

    /// Append `record` only if the booking's total stays within
    /// `amount_due`. The sum and the append are atomic.
    async fn append_within_amount_due(
        &self,
        record: &PaymentRecord,
        amount_due: i64,
    ) -> Result<PaymentAppend, PaymentLedgerRepositoryError>;
}
