//! Booking aggregate and status model.
//!
//! A booking is one scheduled session between one student and one teacher for
//! one course. Its status is a closed enum; every status change goes through
//! [`lifecycle::apply_transition`] so the transition table is enforced for
//! every caller.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BookingId, CourseId, SlotInterval, StudentId, TeacherId};

pub mod lifecycle;

/// Maximum length of free-text booking notes, in characters.
pub const NOTES_MAX_CHARS: usize = 2_000;

/// Booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Requested by a student, awaiting the teacher.
    Pending,
    /// Accepted by the teacher.
    Confirmed,
    /// Rejected by the teacher or expired unconfirmed.
    Declined,
    /// Cancelled after confirmation.
    Cancelled,
    /// Session took place.
    Completed,
}

impl BookingStatus {
    /// Stable lowercase name used in storage and payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Declined => "declined",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Whether a booking in this status occupies its slot.
    #[must_use]
    pub const fn holds_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Whether no further transition can leave this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Declined | Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking status: {0}")]
pub struct ParseBookingStatusError(pub String);

impl FromStr for BookingStatus {
    type Err = ParseBookingStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "declined" => Ok(Self::Declined),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(ParseBookingStatusError(other.to_owned())),
        }
    }
}

/// Validation errors raised by the booking constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingValidationError {
    /// The end time is not after the start time.
    EndNotAfterStart,
    /// The amount due is negative.
    NegativeAmountDue {
        /// Offending amount in minor units.
        amount: i64,
    },
    /// Notes exceed [`NOTES_MAX_CHARS`].
    NotesTooLong {
        /// Maximum allowed characters.
        max: usize,
    },
}

impl fmt::Display for BookingValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndNotAfterStart => write!(f, "booking end time must be after its start time"),
            Self::NegativeAmountDue { amount } => {
                write!(f, "booking amount due must not be negative (got {amount})")
            }
            Self::NotesTooLong { max } => {
                write!(f, "booking notes must be at most {max} characters")
            }
        }
    }
}

impl std::error::Error for BookingValidationError {}

/// Unvalidated booking fields, used by reservation and by persistence
/// adapters rehydrating stored rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingDraft {
    /// Booking identifier.
    pub id: BookingId,
    /// Student attending the session.
    pub student_id: StudentId,
    /// Teacher holding the session.
    pub teacher_id: TeacherId,
    /// Course being taught.
    pub course_id: CourseId,
    /// Calendar date in the teacher's canonical timezone.
    pub date: NaiveDate,
    /// Inclusive start time.
    pub start_time: NaiveTime,
    /// Exclusive end time.
    pub end_time: NaiveTime,
    /// Current status.
    pub status: BookingStatus,
    /// Optional free-text notes from the student.
    pub notes: Option<String>,
    /// Amount due in minor currency units.
    pub amount_due: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Validated booking aggregate.
///
/// ## Invariants
/// - `end_time > start_time` on the same calendar date.
/// - `amount_due >= 0`.
/// - Notes, when present, are non-blank and at most [`NOTES_MAX_CHARS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    id: BookingId,
    student_id: StudentId,
    teacher_id: TeacherId,
    course_id: CourseId,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    status: BookingStatus,
    notes: Option<String>,
    amount_due: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Booking {
    /// Validate a draft into a booking.
    pub fn new(draft: BookingDraft) -> Result<Self, BookingValidationError> {
        Self::try_from(draft)
    }

    /// Booking identifier.
    #[must_use]
    pub const fn id(&self) -> BookingId {
        self.id
    }

    /// Student attending the session.
    #[must_use]
    pub const fn student_id(&self) -> StudentId {
        self.student_id
    }

    /// Teacher holding the session.
    #[must_use]
    pub const fn teacher_id(&self) -> TeacherId {
        self.teacher_id
    }

    /// Course being taught.
    #[must_use]
    pub const fn course_id(&self) -> CourseId {
        self.course_id
    }

    /// Calendar date in the teacher's canonical timezone.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Inclusive start time.
    #[must_use]
    pub const fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    /// Exclusive end time.
    #[must_use]
    pub const fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> BookingStatus {
        self.status
    }

    /// Free-text notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Amount due in minor currency units.
    #[must_use]
    pub const fn amount_due(&self) -> i64 {
        self.amount_due
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Local start instant.
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// Local end instant.
    #[must_use]
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    /// The booked interval.
    #[must_use]
    pub fn interval(&self) -> SlotInterval {
        SlotInterval::new_unchecked(self.starts_at(), self.ends_at())
    }

    pub(crate) fn with_status(&self, status: BookingStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: at,
            ..self.clone()
        }
    }
}

impl TryFrom<BookingDraft> for Booking {
    type Error = BookingValidationError;

    fn try_from(value: BookingDraft) -> Result<Self, Self::Error> {
        if value.end_time <= value.start_time {
            return Err(BookingValidationError::EndNotAfterStart);
        }
        if value.amount_due < 0 {
            return Err(BookingValidationError::NegativeAmountDue {
                amount: value.amount_due,
            });
        }
        let notes = value
            .notes
            .map(|notes| notes.trim().to_owned())
            .filter(|notes| !notes.is_empty());
        if notes
            .as_deref()
            .is_some_and(|notes| notes.chars().count() > NOTES_MAX_CHARS)
        {
            return Err(BookingValidationError::NotesTooLong {
                max: NOTES_MAX_CHARS,
            });
        }

        Ok(Self {
            id: value.id,
            student_id: value.student_id,
            teacher_id: value.teacher_id,
            course_id: value.course_id,
            date: value.date,
            start_time: value.start_time,
            end_time: value.end_time,
            status: value.status,
            notes,
            amount_due: value.amount_due,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

impl From<&Booking> for BookingDraft {
    fn from(value: &Booking) -> Self {
        Self {
            id: value.id,
            student_id: value.student_id,
            teacher_id: value.teacher_id,
            course_id: value.course_id,
            date: value.date,
            start_time: value.start_time,
            end_time: value.end_time,
            status: value.status,
            notes: value.notes.clone(),
            amount_due: value.amount_due,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DateRange {
    /// Longest range accepted for listings, in days.
    pub const MAX_DAYS: i64 = 92;

    /// Build a range, rejecting reversed or overly long ranges.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        let span = (to - from).num_days();
        (0..=Self::MAX_DAYS).contains(&span).then_some(Self { from, to })
    }

    /// The range `date - days ..= date + days`.
    #[must_use]
    pub fn around(date: NaiveDate, days: u64) -> Self {
        let span = chrono::Days::new(days);
        Self {
            from: date.checked_sub_days(span).unwrap_or(date),
            to: date.checked_add_days(span).unwrap_or(date),
        }
    }

    /// First day (inclusive).
    #[must_use]
    pub const fn first_day(&self) -> NaiveDate {
        self.from
    }

    /// Last day (inclusive).
    #[must_use]
    pub const fn last_day(&self) -> NaiveDate {
        self.to
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}
