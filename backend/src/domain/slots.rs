//! Slot arithmetic and conflict detection.
//!
//! Intervals are half-open `[start, end)` in the teacher's canonical local
//! time. A candidate conflicts with an existing booking when it overlaps that
//! booking's interval after padding it by the buffer on both sides; touching
//! boundaries never conflict, so back-to-back bookings separated by exactly
//! the buffer are legal.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::domain::Booking;

/// Reasons a requested slot cannot form a valid interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// The duration is zero or negative.
    EmptyDuration {
        /// Requested duration in minutes.
        minutes: i64,
    },
    /// The interval would end on a later calendar date than it starts.
    CrossesMidnight {
        /// Requested date.
        date: NaiveDate,
        /// Requested start time.
        start: NaiveTime,
        /// Requested duration in minutes.
        minutes: i64,
    },
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDuration { minutes } => {
                write!(f, "slot duration must be positive (got {minutes} minutes)")
            }
            Self::CrossesMidnight {
                date,
                start,
                minutes,
            } => write!(
                f,
                "slot starting {date} {start} lasting {minutes} minutes crosses midnight"
            ),
        }
    }
}

impl std::error::Error for SlotError {}

/// Half-open time interval in teacher-local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotInterval {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl SlotInterval {
    /// Build a single-day interval from a date, start time, and duration.
    ///
    /// # Examples
    /// ```
    /// use booking_backend::domain::SlotInterval;
    /// use chrono::{NaiveDate, NaiveTime, TimeDelta};
    ///
    /// let date = NaiveDate::from_ymd_opt(2024, 1, 10).expect("date");
    /// let start = NaiveTime::from_hms_opt(23, 30, 0).expect("time");
    /// assert!(SlotInterval::on_date(date, start, TimeDelta::minutes(30)).is_err());
    /// assert!(SlotInterval::on_date(date, start, TimeDelta::minutes(29)).is_ok());
    /// ```
    pub fn on_date(
        date: NaiveDate,
        start: NaiveTime,
        duration: TimeDelta,
    ) -> Result<Self, SlotError> {
        let minutes = duration.num_minutes();
        if duration <= TimeDelta::zero() {
            return Err(SlotError::EmptyDuration { minutes });
        }
        let start_at = date.and_time(start);
        let end_at = start_at
            .checked_add_signed(duration)
            .filter(|end_at| end_at.date() == date)
            .ok_or(SlotError::CrossesMidnight {
                date,
                start,
                minutes,
            })?;
        Ok(Self {
            start: start_at,
            end: end_at,
        })
    }

    /// Caller guarantees `start < end`.
    pub(crate) const fn new_unchecked(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Inclusive start.
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Exclusive end.
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Length of the interval.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// The interval widened by `buffer` on both sides.
    #[must_use]
    pub fn padded(&self, buffer: TimeDelta) -> Self {
        Self {
            start: self.start.checked_sub_signed(buffer).unwrap_or(self.start),
            end: self.end.checked_add_signed(buffer).unwrap_or(self.end),
        }
    }

    /// Half-open overlap test: `[a,b)` and `[c,d)` overlap iff `a < d && c < b`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for SlotInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.start.date(),
            self.start.time().format("%H:%M"),
            self.end.time().format("%H:%M")
        )
    }
}

/// Find the first active booking whose buffer-padded interval overlaps
/// `candidate`.
///
/// Callers pass the teacher's bookings for the candidate date ±1 day so
/// buffer spill-over across midnight is caught. Bookings that are not
/// pending or confirmed never conflict.
pub fn find_conflict<'a, I>(
    existing: I,
    candidate: &SlotInterval,
    buffer: TimeDelta,
) -> Option<&'a Booking>
where
    I: IntoIterator<Item = &'a Booking>,
{
    existing.into_iter().find(|booking| {
        booking.status().holds_slot() && booking.interval().padded(buffer).overlaps(candidate)
    })
}

#[cfg(test)]
#[path = "slots_tests.rs"]
mod tests;
