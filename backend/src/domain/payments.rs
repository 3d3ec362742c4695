//! Payment ledger view.
//!
//! Payment capture happens elsewhere; this module only keeps append-only
//! records of amounts received and derives a status from them.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Actor, Booking, BookingId, BookingStatus};

/// One recorded payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Record identifier.
    pub id: Uuid,
    /// Booking the payment applies to.
    pub booking_id: BookingId,
    /// Amount in minor currency units; always positive.
    pub amount: i64,
    /// When the payment was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Actor who recorded the payment.
    pub recorded_by: Actor,
}

/// Derived payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing received yet.
    Unpaid,
    /// Some but not all of the amount due received.
    PartiallyPaid,
    /// Amount due fully received.
    Paid,
    /// Not fully paid after the grace period elapsed.
    Overdue,
}

impl PaymentStatus {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived totals for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    /// Amount due in minor units.
    pub amount_due: i64,
    /// Sum of recorded payments.
    pub amount_paid: i64,
    /// Derived status.
    pub status: PaymentStatus,
}

/// Sum the amounts of `records`, saturating on overflow.
#[must_use]
pub fn total_paid(records: &[PaymentRecord]) -> i64 {
    records
        .iter()
        .fold(0_i64, |sum, record| sum.saturating_add(record.amount))
}

/// Derive the payment status of `booking` at teacher-local `now_local`.
///
/// Overdue applies only while the booking can still take place or has
/// taken place; declined and cancelled bookings are never overdue.
#[must_use]
pub fn derive_payment_status(
    booking: &Booking,
    records: &[PaymentRecord],
    now_local: NaiveDateTime,
    grace: TimeDelta,
) -> PaymentSummary {
    let amount_paid = total_paid(records);
    let amount_due = booking.amount_due();
    let status = if amount_paid >= amount_due {
        PaymentStatus::Paid
    } else if is_overdue(booking, now_local, grace) {
        PaymentStatus::Overdue
    } else if amount_paid > 0 {
        PaymentStatus::PartiallyPaid
    } else {
        PaymentStatus::Unpaid
    };
    PaymentSummary {
        amount_due,
        amount_paid,
        status,
    }
}

fn is_overdue(booking: &Booking, now_local: NaiveDateTime, grace: TimeDelta) -> bool {
    if matches!(
        booking.status(),
        BookingStatus::Declined | BookingStatus::Cancelled
    ) {
        return false;
    }
    booking
        .starts_at()
        .checked_add_signed(grace)
        .is_some_and(|due_by| now_local > due_by)
}

/// Reasons a new payment is refused before touching the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentRejection {
    /// Amount is zero or negative.
    NonPositiveAmount,
    /// The sum would exceed the amount due.
    Overpayment {
        /// Amount due.
        amount_due: i64,
        /// Amount already paid.
        already_paid: i64,
    },
}

/// Check that appending `amount` keeps the total within `amount_due`.
pub fn ensure_within_amount_due(
    amount_due: i64,
    already_paid: i64,
    amount: i64,
) -> Result<(), PaymentRejection> {
    if amount <= 0 {
        return Err(PaymentRejection::NonPositiveAmount);
    }
    match already_paid.checked_add(amount) {
        Some(total) if total <= amount_due => Ok(()),
        _ => Err(PaymentRejection::Overpayment {
            amount_due,
            already_paid,
        }),
    }
}
