//! Per-teacher availability policy and its pure evaluation rules.
//!
//! The policy answers four questions without touching storage: is a date
//! inside the booking horizon, how much lead time a free cancellation needs,
//! whether a given cancellation is late, and whether an actor has cancelled
//! too often in the trailing week.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Actor, Booking, BookingId, TeacherId};

/// Width of the rolling window used for frequent-cancellation counting.
pub const CANCELLATION_WINDOW_DAYS: i64 = 7;

const MAX_HORIZON_DAYS: u32 = 365;
const MAX_BUFFER_MINUTES: u32 = 24 * 60;
const MAX_DEADLINE_HOURS: u32 = 24 * 30;
const MAX_GRACE_MINUTES: u32 = 24 * 60 * 30;
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// What happens when a cancellation misses the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateCancellationRule {
    /// Allow the cancellation but count it as late.
    #[default]
    AllowWithPenalty,
    /// Refuse the cancellation outright.
    Reject,
}

/// What happens when an actor exceeds the frequent-cancellation limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationLimitEnforcement {
    /// Allow the cancellation and surface a suspension recommendation.
    #[default]
    Warn,
    /// Refuse a cancellation that would exceed the limit.
    Reject,
}

impl LateCancellationRule {
    /// Stable lowercase name used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AllowWithPenalty => "allow_with_penalty",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for LateCancellationRule {
    type Err = ParsePolicyModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow_with_penalty" => Ok(Self::AllowWithPenalty),
            "reject" => Ok(Self::Reject),
            other => Err(ParsePolicyModeError(other.to_owned())),
        }
    }
}

impl CancellationLimitEnforcement {
    /// Stable lowercase name used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for CancellationLimitEnforcement {
    type Err = ParsePolicyModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(ParsePolicyModeError(other.to_owned())),
        }
    }
}

/// Error returned when a stored policy mode is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown policy mode: {0}")]
pub struct ParsePolicyModeError(pub String);

/// Validation errors raised when building a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyValidationError {
    /// Horizon is larger than the supported maximum.
    HorizonTooLong {
        /// Maximum allowed days.
        max: u32,
    },
    /// Buffer is larger than the supported maximum.
    BufferTooLong {
        /// Maximum allowed minutes.
        max: u32,
    },
    /// Cancellation deadline is larger than the supported maximum.
    DeadlineTooLong {
        /// Maximum allowed hours.
        max: u32,
    },
    /// Payment grace period is larger than the supported maximum.
    GraceTooLong {
        /// Maximum allowed minutes.
        max: u32,
    },
    /// A cancellation limit of zero would block every cancellation.
    ZeroCancellationLimit,
    /// UTC offset is outside ±18 hours.
    OffsetOutOfRange {
        /// Offending offset in minutes.
        minutes: i32,
    },
}

impl fmt::Display for PolicyValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HorizonTooLong { max } => {
                write!(f, "booking horizon must be at most {max} days")
            }
            Self::BufferTooLong { max } => write!(f, "buffer must be at most {max} minutes"),
            Self::DeadlineTooLong { max } => {
                write!(f, "cancellation deadline must be at most {max} hours")
            }
            Self::GraceTooLong { max } => {
                write!(f, "payment grace period must be at most {max} minutes")
            }
            Self::ZeroCancellationLimit => {
                write!(f, "frequent cancellation limit must be at least 1 when set")
            }
            Self::OffsetOutOfRange { minutes } => {
                write!(f, "utc offset must be within ±18 hours (got {minutes} minutes)")
            }
        }
    }
}

impl std::error::Error for PolicyValidationError {}

/// Unvalidated policy settings as submitted by a teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPolicyDraft {
    /// Maximum days ahead a slot may be requested.
    pub booking_horizon_days: u32,
    /// Minimum idle minutes before and after every booking.
    pub buffer_minutes: u32,
    /// Minimum lead time, in hours, for a free cancellation.
    pub cancellation_deadline_hours: u32,
    /// Cancellations allowed per actor in the trailing 7 days.
    pub frequent_cancellation_limit: Option<u32>,
    /// Handling of cancellations that miss the deadline.
    #[serde(default)]
    pub late_cancellation: LateCancellationRule,
    /// Handling of actors exceeding the cancellation limit.
    #[serde(default)]
    pub cancellation_limit_enforcement: CancellationLimitEnforcement,
    /// Minutes after session start before an unpaid booking is overdue.
    #[serde(default)]
    pub payment_grace_minutes: u32,
    /// Teacher's canonical timezone as a fixed UTC offset in minutes.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Validated availability policy for one teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityPolicy {
    booking_horizon_days: u32,
    buffer_minutes: u32,
    cancellation_deadline_hours: u32,
    frequent_cancellation_limit: Option<u32>,
    late_cancellation: LateCancellationRule,
    cancellation_limit_enforcement: CancellationLimitEnforcement,
    payment_grace_minutes: u32,
    offset: FixedOffset,
}

impl Default for AvailabilityPolicy {
    fn default() -> Self {
        Self {
            booking_horizon_days: 14,
            buffer_minutes: 0,
            cancellation_deadline_hours: 24,
            frequent_cancellation_limit: None,
            late_cancellation: LateCancellationRule::default(),
            cancellation_limit_enforcement: CancellationLimitEnforcement::default(),
            payment_grace_minutes: 0,
            offset: Utc.fix(),
        }
    }
}

impl TryFrom<AvailabilityPolicyDraft> for AvailabilityPolicy {
    type Error = PolicyValidationError;

    fn try_from(value: AvailabilityPolicyDraft) -> Result<Self, Self::Error> {
        if value.booking_horizon_days > MAX_HORIZON_DAYS {
            return Err(PolicyValidationError::HorizonTooLong {
                max: MAX_HORIZON_DAYS,
            });
        }
        if value.buffer_minutes > MAX_BUFFER_MINUTES {
            return Err(PolicyValidationError::BufferTooLong {
                max: MAX_BUFFER_MINUTES,
            });
        }
        if value.cancellation_deadline_hours > MAX_DEADLINE_HOURS {
            return Err(PolicyValidationError::DeadlineTooLong {
                max: MAX_DEADLINE_HOURS,
            });
        }
        if value.payment_grace_minutes > MAX_GRACE_MINUTES {
            return Err(PolicyValidationError::GraceTooLong {
                max: MAX_GRACE_MINUTES,
            });
        }
        if value.frequent_cancellation_limit == Some(0) {
            return Err(PolicyValidationError::ZeroCancellationLimit);
        }
        let offset = (value.utc_offset_minutes.unsigned_abs() <= MAX_OFFSET_MINUTES.unsigned_abs())
            .then(|| FixedOffset::east_opt(value.utc_offset_minutes.saturating_mul(60)))
            .flatten()
            .ok_or(PolicyValidationError::OffsetOutOfRange {
                minutes: value.utc_offset_minutes,
            })?;

        Ok(Self {
            booking_horizon_days: value.booking_horizon_days,
            buffer_minutes: value.buffer_minutes,
            cancellation_deadline_hours: value.cancellation_deadline_hours,
            frequent_cancellation_limit: value.frequent_cancellation_limit,
            late_cancellation: value.late_cancellation,
            cancellation_limit_enforcement: value.cancellation_limit_enforcement,
            payment_grace_minutes: value.payment_grace_minutes,
            offset,
        })
    }
}

impl From<&AvailabilityPolicy> for AvailabilityPolicyDraft {
    fn from(value: &AvailabilityPolicy) -> Self {
        Self {
            booking_horizon_days: value.booking_horizon_days,
            buffer_minutes: value.buffer_minutes,
            cancellation_deadline_hours: value.cancellation_deadline_hours,
            frequent_cancellation_limit: value.frequent_cancellation_limit,
            late_cancellation: value.late_cancellation,
            cancellation_limit_enforcement: value.cancellation_limit_enforcement,
            payment_grace_minutes: value.payment_grace_minutes,
            utc_offset_minutes: value.utc_offset_minutes(),
        }
    }
}

/// Outcome of evaluating a cancellation against the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationAssessment {
    /// Whether the cancellation may proceed.
    pub allowed: bool,
    /// Whether the deadline was missed.
    pub late: bool,
    /// Time remaining until the session starts (negative once started).
    pub lead_time: TimeDelta,
    /// Configured minimum lead time for a free cancellation.
    pub deadline: TimeDelta,
}

/// Audit record written for every cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationRecord {
    /// Cancelled booking.
    pub booking_id: BookingId,
    /// Teacher owning the booking.
    pub teacher_id: TeacherId,
    /// Actor who cancelled.
    pub actor: Actor,
    /// When the cancellation was committed.
    pub cancelled_at: DateTime<Utc>,
    /// Whether the cancellation missed the deadline.
    pub late: bool,
}

impl AvailabilityPolicy {
    /// Maximum days ahead a slot may be requested.
    #[must_use]
    pub const fn booking_horizon_days(&self) -> u32 {
        self.booking_horizon_days
    }

    /// Buffer enforced before and after every booking.
    #[must_use]
    pub fn buffer(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.buffer_minutes))
    }

    /// Optional frequent-cancellation limit.
    #[must_use]
    pub const fn frequent_cancellation_limit(&self) -> Option<u32> {
        self.frequent_cancellation_limit
    }

    /// Handling of late cancellations.
    #[must_use]
    pub const fn late_cancellation(&self) -> LateCancellationRule {
        self.late_cancellation
    }

    /// Handling of actors over the cancellation limit.
    #[must_use]
    pub const fn cancellation_limit_enforcement(&self) -> CancellationLimitEnforcement {
        self.cancellation_limit_enforcement
    }

    /// Grace period after session start before unpaid bookings are overdue.
    #[must_use]
    pub fn payment_grace_period(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.payment_grace_minutes))
    }

    /// Canonical UTC offset in minutes.
    #[must_use]
    pub fn utc_offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Convert an instant into the teacher's local wall-clock time.
    #[must_use]
    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        now.with_timezone(&self.offset).naive_local()
    }

    /// Last calendar date a booking may be requested for at `now`.
    #[must_use]
    pub fn latest_bookable_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = self.local_time(now).date();
        today
            .checked_add_days(Days::new(u64::from(self.booking_horizon_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Whether `requested` lies within the booking horizon at `now`.
    ///
    /// # Examples
    /// ```
    /// use booking_backend::domain::AvailabilityPolicy;
    /// use chrono::{NaiveDate, TimeZone, Utc};
    ///
    /// let policy = AvailabilityPolicy::default();
    /// let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().expect("now");
    /// let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).expect("date");
    /// assert!(policy.is_within_booking_horizon(day(15), now));
    /// assert!(!policy.is_within_booking_horizon(day(16), now));
    /// ```
    #[must_use]
    pub fn is_within_booking_horizon(&self, requested: NaiveDate, now: DateTime<Utc>) -> bool {
        requested <= self.latest_bookable_date(now)
    }

    /// Minimum lead time before start at which cancellation is still free.
    #[must_use]
    pub fn minimum_cancellation_lead_time(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.cancellation_deadline_hours))
    }

    /// Evaluate cancelling `booking` at `now`.
    ///
    /// A cancellation is free iff `now + deadline <= start`. Late
    /// cancellations are allowed unless the policy rejects them.
    #[must_use]
    pub fn evaluate_cancellation(
        &self,
        booking: &Booking,
        now: DateTime<Utc>,
    ) -> CancellationAssessment {
        let deadline = self.minimum_cancellation_lead_time();
        let lead_time = booking.starts_at() - self.local_time(now);
        let late = lead_time < deadline;
        let allowed = !late || self.late_cancellation == LateCancellationRule::AllowWithPenalty;
        CancellationAssessment {
            allowed,
            late,
            lead_time,
            deadline,
        }
    }

    /// Count the penalised cancellations made in `actor`'s role within the
    /// trailing window ending at `now`.
    ///
    /// `history` is one teacher's cancellation history. Only late
    /// cancellations count; free ones carry no penalty. Administrator
    /// cancellations are never counted.
    #[must_use]
    pub fn recent_cancellation_count(
        &self,
        actor: &Actor,
        history: &[CancellationRecord],
        now: DateTime<Utc>,
    ) -> u32 {
        if actor.is_admin() {
            return 0;
        }
        let window_start = now - TimeDelta::days(CANCELLATION_WINDOW_DAYS);
        let count = history
            .iter()
            .filter(|record| record.late && record.actor.role == actor.role)
            .filter(|record| record.cancelled_at > window_start && record.cancelled_at <= now)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Whether `actor` has exceeded the frequent-cancellation limit.
    ///
    /// Always `false` when no limit is configured.
    #[must_use]
    pub fn has_exceeded_cancellation_limit(
        &self,
        actor: &Actor,
        history: &[CancellationRecord],
        now: DateTime<Utc>,
    ) -> bool {
        self.frequent_cancellation_limit
            .is_some_and(|limit| self.recent_cancellation_count(actor, history, now) > limit)
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
