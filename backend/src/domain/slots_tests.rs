//! Tests for slot arithmetic and buffer-aware conflict detection.

use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use rstest::rstest;

use super::*;
use crate::domain::{BookingDraft, BookingId, BookingStatus, CourseId, StudentId, TeacherId};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
}

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

fn booking(date: NaiveDate, start: NaiveTime, end: NaiveTime, status: BookingStatus) -> Booking {
    let created = Utc
        .with_ymd_and_hms(2024, 5, 1, 8, 0, 0)
        .single()
        .expect("instant");
    Booking::new(BookingDraft {
        id: BookingId::random(),
        student_id: StudentId::random(),
        teacher_id: TeacherId::random(),
        course_id: CourseId::random(),
        date,
        start_time: start,
        end_time: end,
        status,
        notes: None,
        amount_due: 0,
        created_at: created,
        updated_at: created,
    })
    .expect("valid booking")
}

fn candidate(date: NaiveDate, start: NaiveTime, minutes: i64) -> SlotInterval {
    SlotInterval::on_date(date, start, TimeDelta::minutes(minutes)).expect("valid interval")
}

#[rstest]
fn rejects_non_positive_duration() {
    assert_eq!(
        SlotInterval::on_date(day(1), at(9, 0), TimeDelta::zero()),
        Err(SlotError::EmptyDuration { minutes: 0 })
    );
}

#[rstest]
fn interval_may_end_exactly_before_midnight() {
    let interval = candidate(day(1), at(23, 0), 59);
    assert_eq!(interval.end().time(), at(23, 59));
    assert_eq!(interval.duration(), TimeDelta::minutes(59));
}

#[rstest]
fn rejects_interval_reaching_midnight() {
    assert!(matches!(
        SlotInterval::on_date(day(1), at(23, 0), TimeDelta::minutes(60)),
        Err(SlotError::CrossesMidnight { .. })
    ));
}

#[rstest]
#[case(at(9, 0), 60, at(10, 0), 60, false)]
#[case(at(9, 0), 61, at(10, 0), 60, true)]
#[case(at(10, 30), 15, at(10, 0), 60, true)]
#[case(at(11, 0), 30, at(10, 0), 60, false)]
fn half_open_overlap(
    #[case] a_start: NaiveTime,
    #[case] a_minutes: i64,
    #[case] b_start: NaiveTime,
    #[case] b_minutes: i64,
    #[case] overlaps: bool,
) {
    let a = candidate(day(1), a_start, a_minutes);
    let b = candidate(day(1), b_start, b_minutes);
    assert_eq!(a.overlaps(&b), overlaps);
    assert_eq!(b.overlaps(&a), overlaps);
}

#[rstest]
#[case(at(16, 5), true)]
#[case(at(16, 9), true)]
#[case(at(16, 10), false)]
#[case(at(13, 0), false)]
#[case(at(13, 1), true)]
fn buffer_pads_existing_booking(#[case] start: NaiveTime, #[case] conflicts: bool) {
    let existing = [booking(day(1), at(14, 0), at(16, 0), BookingStatus::Confirmed)];
    let requested = candidate(day(1), start, 50);

    let found = find_conflict(&existing, &requested, TimeDelta::minutes(10));
    assert_eq!(found.is_some(), conflicts, "start {start}");
}

#[rstest]
#[case(BookingStatus::Declined)]
#[case(BookingStatus::Cancelled)]
#[case(BookingStatus::Completed)]
fn inactive_bookings_never_conflict(#[case] status: BookingStatus) {
    let existing = [booking(day(1), at(14, 0), at(16, 0), status)];
    let requested = candidate(day(1), at(14, 0), 60);

    assert!(find_conflict(&existing, &requested, TimeDelta::zero()).is_none());
}

#[rstest]
fn buffer_spills_across_midnight() {
    let existing = [booking(day(1), at(23, 0), at(23, 50), BookingStatus::Pending)];

    let early = candidate(day(2), at(0, 0), 30);
    assert!(find_conflict(&existing, &early, TimeDelta::minutes(15)).is_some());

    let later = candidate(day(2), at(0, 5), 30);
    assert!(find_conflict(&existing, &later, TimeDelta::minutes(15)).is_none());
}

#[rstest]
fn returns_the_overlapping_booking() {
    let first = booking(day(1), at(9, 0), at(10, 0), BookingStatus::Confirmed);
    let second = booking(day(1), at(14, 0), at(15, 0), BookingStatus::Pending);
    let existing = [first, second.clone()];

    let found = find_conflict(&existing, &candidate(day(1), at(14, 30), 30), TimeDelta::zero());
    assert_eq!(found.map(Booking::id), Some(second.id()));
}

#[rstest]
fn display_uses_hours_and_minutes() {
    assert_eq!(candidate(day(1), at(14, 0), 120).to_string(), "2024-05-01 14:00-16:00");
}
