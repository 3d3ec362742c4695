//! Domain events emitted after booking state changes commit.
//!
//! Events stay transport agnostic; publisher adapters decide how (and
//! whether) to forward them to notification delivery.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::booking::lifecycle::BookingAction;
use crate::domain::{Actor, Booking, BookingId, BookingStatus, StudentId, TeacherId, TraceId};

/// Kind of booking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BookingEventKind {
    /// A reservation was committed in `pending`.
    #[serde(rename = "booking.created")]
    Created,
    /// The teacher confirmed the booking.
    #[serde(rename = "booking.confirmed")]
    Confirmed,
    /// The teacher declined the booking.
    #[serde(rename = "booking.declined")]
    Declined,
    /// A pending booking expired unconfirmed.
    #[serde(rename = "booking.expired")]
    Expired,
    /// A confirmed booking was cancelled.
    #[serde(rename = "booking.cancelled")]
    Cancelled,
    /// A confirmed booking ended.
    #[serde(rename = "booking.completed")]
    Completed,
}

impl BookingEventKind {
    /// Dotted event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "booking.created",
            Self::Confirmed => "booking.confirmed",
            Self::Declined => "booking.declined",
            Self::Expired => "booking.expired",
            Self::Cancelled => "booking.cancelled",
            Self::Completed => "booking.completed",
        }
    }
}

impl From<BookingAction> for BookingEventKind {
    fn from(value: BookingAction) -> Self {
        match value {
            BookingAction::Confirm => Self::Confirmed,
            BookingAction::Decline => Self::Declined,
            BookingAction::Cancel => Self::Cancelled,
            BookingAction::Complete => Self::Completed,
            BookingAction::Expire => Self::Expired,
        }
    }
}

impl fmt::Display for BookingEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event published once a booking change has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    /// What happened.
    pub kind: BookingEventKind,
    /// Affected booking.
    pub booking_id: BookingId,
    /// Teacher owning the booking.
    pub teacher_id: TeacherId,
    /// Student attending the booking.
    pub student_id: StudentId,
    /// Status after the change.
    pub status: BookingStatus,
    /// Actor responsible, `None` for time-based transitions.
    pub actor: Option<Actor>,
    /// Whether a cancellation missed the deadline.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub late: bool,
    /// When the change was committed.
    pub occurred_at: DateTime<Utc>,
    /// Correlation identifier of the request that caused the change.
    #[serde(skip)]
    pub trace_id: Option<TraceId>,
}

impl BookingEvent {
    /// Build an event for `booking` in its current state.
    #[must_use]
    pub fn new(kind: BookingEventKind, booking: &Booking, actor: Option<Actor>) -> Self {
        Self {
            kind,
            booking_id: booking.id(),
            teacher_id: booking.teacher_id(),
            student_id: booking.student_id(),
            status: booking.status(),
            actor,
            late: false,
            occurred_at: booking.updated_at(),
            trace_id: TraceId::current(),
        }
    }

    /// Mark a cancellation event as late.
    #[must_use]
    pub fn with_late(mut self, late: bool) -> Self {
        self.late = late;
        self
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(BookingAction::Confirm, "booking.confirmed")]
    #[case(BookingAction::Decline, "booking.declined")]
    #[case(BookingAction::Cancel, "booking.cancelled")]
    #[case(BookingAction::Complete, "booking.completed")]
    #[case(BookingAction::Expire, "booking.expired")]
    fn actions_map_to_event_names(#[case] action: BookingAction, #[case] expected: &str) {
        let kind = BookingEventKind::from(action);
        assert_eq!(kind.as_str(), expected);
        assert_eq!(
            serde_json::to_value(kind).expect("serialise kind"),
            serde_json::Value::String(expected.to_owned())
        );
    }
}
