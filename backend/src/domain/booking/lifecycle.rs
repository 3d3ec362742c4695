//! Booking status transition table.
//!
//! ```text
//! pending   --confirm (teacher)-->        confirmed
//! pending   --decline (teacher)-->        declined
//! pending   --expire  (system, >= start)-> declined
//! confirmed --cancel  (student|teacher)-> cancelled
//! confirmed --complete (system, >= end)-> completed
//! ```
//!
//! Administrators may perform any participant action. Repeating an action
//! whose target status is already reached is a no-op; any other pair of
//! status and action is rejected.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Actor, Booking, BookingStatus};

/// Action requested against a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    /// Teacher accepts a pending booking.
    Confirm,
    /// Teacher rejects a pending booking.
    Decline,
    /// Student or teacher cancels a confirmed booking.
    Cancel,
    /// Time-based completion once the session has ended.
    Complete,
    /// Time-based decline of a pending booking whose start passed.
    Expire,
}

impl BookingAction {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Decline => "decline",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
            Self::Expire => "expire",
        }
    }

    /// Status the action starts from.
    #[must_use]
    pub const fn source(&self) -> BookingStatus {
        match self {
            Self::Confirm | Self::Decline | Self::Expire => BookingStatus::Pending,
            Self::Cancel | Self::Complete => BookingStatus::Confirmed,
        }
    }

    /// Status the action leads to.
    #[must_use]
    pub const fn target(&self) -> BookingStatus {
        match self {
            Self::Confirm => BookingStatus::Confirmed,
            Self::Decline | Self::Expire => BookingStatus::Declined,
            Self::Cancel => BookingStatus::Cancelled,
            Self::Complete => BookingStatus::Completed,
        }
    }

    /// Whether only the system clock may trigger the action.
    #[must_use]
    pub const fn is_time_based(&self) -> bool {
        matches!(self, Self::Complete | Self::Expire)
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who triggers a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    /// An authenticated participant or administrator.
    Actor(Actor),
    /// The service itself, for time-based transitions.
    System,
}

/// Reasons a transition is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The initiator may not perform the action on this booking.
    NotAuthorised {
        /// Requested action.
        action: BookingAction,
    },
    /// The action is not in the transition table for the current status.
    InvalidTransition {
        /// Current status.
        from: BookingStatus,
        /// Requested action.
        action: BookingAction,
    },
    /// A time-based action was requested before it is due.
    NotYetDue {
        /// Requested action.
        action: BookingAction,
        /// Local instant from which the action is due.
        due_at: NaiveDateTime,
    },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthorised { action } => {
                write!(f, "not authorised to {action} this booking")
            }
            Self::InvalidTransition { from, action } => {
                write!(f, "cannot {action} a booking that is {from}")
            }
            Self::NotYetDue { action, due_at } => {
                write!(f, "{action} is not due before {due_at}")
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Result of applying an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Booking after the action.
    pub booking: Booking,
    /// Status before the action.
    pub previous: BookingStatus,
    /// `false` when the action was a re-entrant no-op.
    pub changed: bool,
}

fn is_authorised(booking: &Booking, action: BookingAction, initiator: &Initiator) -> bool {
    match (initiator, action) {
        (Initiator::System, action) => action.is_time_based(),
        (Initiator::Actor(_), action) if action.is_time_based() => false,
        (Initiator::Actor(actor), _) if actor.is_admin() => true,
        (Initiator::Actor(actor), BookingAction::Confirm | BookingAction::Decline) => {
            actor.is_teacher(&booking.teacher_id())
        }
        (Initiator::Actor(actor), _) => {
            actor.is_teacher(&booking.teacher_id()) || actor.is_student(&booking.student_id())
        }
    }
}

fn due_at(booking: &Booking, action: BookingAction) -> Option<NaiveDateTime> {
    match action {
        BookingAction::Expire => Some(booking.starts_at()),
        BookingAction::Complete => Some(booking.ends_at()),
        BookingAction::Confirm | BookingAction::Decline | BookingAction::Cancel => None,
    }
}

/// Apply `action` to `booking`.
///
/// `now_local` is the teacher-local wall-clock time used for time-based
/// preconditions; `now` stamps `updated_at`.
pub fn apply_transition(
    booking: &Booking,
    action: BookingAction,
    initiator: &Initiator,
    now_local: NaiveDateTime,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionError> {
    if !is_authorised(booking, action, initiator) {
        return Err(TransitionError::NotAuthorised { action });
    }

    let previous = booking.status();
    if previous == action.target() {
        return Ok(TransitionOutcome {
            booking: booking.clone(),
            previous,
            changed: false,
        });
    }
    if previous != action.source() {
        return Err(TransitionError::InvalidTransition {
            from: previous,
            action,
        });
    }
    if let Some(due_at) = due_at(booking, action).filter(|due_at| now_local < *due_at) {
        return Err(TransitionError::NotYetDue { action, due_at });
    }

    Ok(TransitionOutcome {
        booking: booking.with_status(action.target(), now),
        previous,
        changed: true,
    })
}

/// The time-based action due for `booking` at `now_local`, if any.
#[must_use]
pub fn due_time_based_action(booking: &Booking, now_local: NaiveDateTime) -> Option<BookingAction> {
    match booking.status() {
        BookingStatus::Pending if now_local >= booking.starts_at() => Some(BookingAction::Expire),
        BookingStatus::Confirmed if now_local >= booking.ends_at() => {
            Some(BookingAction::Complete)
        }
        _ => None,
    }
}
