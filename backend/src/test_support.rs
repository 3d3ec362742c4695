//! Test utilities for the booking crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`);
//! compiled for tests and when the `test-support` feature is enabled.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

/// Clock whose current instant tests can move forward.
///
/// # Examples
/// ```
/// use booking_backend::test_support::MutableClock;
/// use chrono::{TimeZone, Utc};
/// use mockable::Clock;
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().expect("instant");
/// let clock = MutableClock::new(start);
/// clock.advance_minutes(90);
/// assert_eq!(clock.utc(), start + chrono::TimeDelta::minutes(90));
/// ```
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    /// Move the clock forward by whole minutes.
    pub fn advance_minutes(&self, minutes: i64) {
        self.advance(TimeDelta::minutes(minutes));
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex poisoned"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}
