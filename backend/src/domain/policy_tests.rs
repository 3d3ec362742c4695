//! Tests for availability policy evaluation.

use chrono::{NaiveTime, TimeZone};
use rstest::{fixture, rstest};
use uuid::Uuid;

use super::*;
use crate::domain::{BookingDraft, BookingStatus, CourseId, StudentId};

fn instant(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0)
        .single()
        .expect("instant")
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).expect("valid date")
}

#[fixture]
fn draft() -> AvailabilityPolicyDraft {
    AvailabilityPolicyDraft::from(&AvailabilityPolicy::default())
}

fn policy(draft: AvailabilityPolicyDraft) -> AvailabilityPolicy {
    AvailabilityPolicy::try_from(draft).expect("valid policy")
}

/// Confirmed booking on 2024-06-10 at 10:00 for one hour.
fn booking_at_ten() -> Booking {
    let created = instant(1, 8, 0);
    Booking::new(BookingDraft {
        id: BookingId::random(),
        student_id: StudentId::random(),
        teacher_id: TeacherId::random(),
        course_id: CourseId::random(),
        date: date(10),
        start_time: NaiveTime::from_hms_opt(10, 0, 0).expect("time"),
        end_time: NaiveTime::from_hms_opt(11, 0, 0).expect("time"),
        status: BookingStatus::Confirmed,
        notes: None,
        amount_due: 0,
        created_at: created,
        updated_at: created,
    })
    .expect("valid booking")
}

#[rstest]
fn defaults_match_documented_values() {
    let policy = AvailabilityPolicy::default();
    assert_eq!(policy.booking_horizon_days(), 14);
    assert_eq!(policy.buffer(), TimeDelta::zero());
    assert_eq!(policy.minimum_cancellation_lead_time(), TimeDelta::hours(24));
    assert_eq!(policy.frequent_cancellation_limit(), None);
    assert_eq!(policy.late_cancellation(), LateCancellationRule::AllowWithPenalty);
    assert_eq!(
        policy.cancellation_limit_enforcement(),
        CancellationLimitEnforcement::Warn
    );
    assert_eq!(policy.utc_offset_minutes(), 0);
}

#[rstest]
#[case(14, true)]
#[case(15, false)]
fn horizon_is_inclusive_of_last_day(#[case] requested_day: u32, #[case] allowed: bool) {
    let policy = AvailabilityPolicy::default();
    let now = instant(1, 9, 0);
    assert_eq!(
        policy.is_within_booking_horizon(date(1 + requested_day), now),
        allowed
    );
    assert_eq!(policy.latest_bookable_date(now), date(15));
}

#[rstest]
fn horizon_uses_teacher_local_date(mut draft: AvailabilityPolicyDraft) {
    draft.utc_offset_minutes = 120;
    let policy = policy(draft);
    // 23:30 UTC is already the next day at UTC+2.
    let now = instant(1, 23, 30);
    assert_eq!(policy.latest_bookable_date(now), date(16));
}

#[rstest]
#[case(AvailabilityPolicyDraft { booking_horizon_days: 366, ..draft() }, PolicyValidationError::HorizonTooLong { max: 365 })]
#[case(AvailabilityPolicyDraft { buffer_minutes: 24 * 60 + 1, ..draft() }, PolicyValidationError::BufferTooLong { max: 24 * 60 })]
#[case(AvailabilityPolicyDraft { frequent_cancellation_limit: Some(0), ..draft() }, PolicyValidationError::ZeroCancellationLimit)]
#[case(AvailabilityPolicyDraft { utc_offset_minutes: 19 * 60, ..draft() }, PolicyValidationError::OffsetOutOfRange { minutes: 19 * 60 })]
fn rejects_out_of_range_settings(
    #[case] input: AvailabilityPolicyDraft,
    #[case] expected: PolicyValidationError,
) {
    assert_eq!(AvailabilityPolicy::try_from(input), Err(expected));
}

#[rstest]
fn draft_conversion_preserves_settings(mut draft: AvailabilityPolicyDraft) {
    draft.buffer_minutes = 10;
    draft.frequent_cancellation_limit = Some(3);
    draft.late_cancellation = LateCancellationRule::Reject;
    draft.utc_offset_minutes = -300;
    let policy = policy(draft.clone());
    assert_eq!(AvailabilityPolicyDraft::from(&policy), draft);
}

#[rstest]
#[case(instant(9, 10, 0), false)]
#[case(instant(9, 10, 1), true)]
#[case(instant(9, 9, 59), false)]
fn deadline_boundary_is_free(#[case] now: DateTime<Utc>, #[case] late: bool) {
    let assessment = AvailabilityPolicy::default().evaluate_cancellation(&booking_at_ten(), now);
    assert_eq!(assessment.late, late);
    assert!(assessment.allowed);
}

#[rstest]
fn reject_rule_refuses_late_cancellation(mut draft: AvailabilityPolicyDraft) {
    draft.late_cancellation = LateCancellationRule::Reject;
    let assessment = policy(draft).evaluate_cancellation(&booking_at_ten(), instant(10, 8, 0));
    assert!(assessment.late);
    assert!(!assessment.allowed);
    assert_eq!(assessment.lead_time, TimeDelta::hours(2));
}

fn record(actor: Actor, cancelled_at: DateTime<Utc>, late: bool) -> CancellationRecord {
    CancellationRecord {
        booking_id: BookingId::random(),
        teacher_id: TeacherId::random(),
        actor,
        cancelled_at,
        late,
    }
}

#[rstest]
fn counts_late_cancellations_by_role_within_the_window(mut draft: AvailabilityPolicyDraft) {
    draft.frequent_cancellation_limit = Some(2);
    let policy = policy(draft);
    let student = Actor::student(StudentId::random());
    let classmate = Actor::student(StudentId::random());
    let teacher = Actor::teacher(TeacherId::random());
    let now = instant(20, 12, 0);
    let history = [
        record(student, instant(13, 12, 0), true),
        record(student, instant(13, 12, 1), true),
        record(classmate, instant(19, 9, 0), true),
        record(teacher, instant(19, 10, 0), true),
    ];

    assert_eq!(policy.recent_cancellation_count(&student, &history, now), 2);
    assert_eq!(policy.recent_cancellation_count(&teacher, &history, now), 1);
    assert!(!policy.has_exceeded_cancellation_limit(&student, &history, now));

    let mut more = history.to_vec();
    more.push(record(student, instant(20, 11, 0), true));
    assert!(policy.has_exceeded_cancellation_limit(&student, &more, now));
}

#[rstest]
fn free_cancellations_are_not_counted(mut draft: AvailabilityPolicyDraft) {
    draft.frequent_cancellation_limit = Some(1);
    let policy = policy(draft);
    let student = Actor::student(StudentId::random());
    let now = instant(20, 12, 0);
    let history = [
        record(student, instant(18, 9, 0), false),
        record(student, instant(19, 9, 0), false),
    ];

    assert_eq!(policy.recent_cancellation_count(&student, &history, now), 0);
    assert!(!policy.has_exceeded_cancellation_limit(&student, &history, now));
}

#[rstest]
fn administrators_are_never_counted() {
    let admin = Actor::admin(Uuid::new_v4());
    let now = instant(20, 12, 0);
    let history = [record(admin, instant(20, 9, 0), true)];
    assert_eq!(
        AvailabilityPolicy::default().recent_cancellation_count(&admin, &history, now),
        0
    );
}

#[rstest]
#[case("allow_with_penalty", Ok(LateCancellationRule::AllowWithPenalty))]
#[case("reject", Ok(LateCancellationRule::Reject))]
#[case("warn", Err(ParsePolicyModeError("warn".to_owned())))]
fn parses_late_cancellation_rule(
    #[case] raw: &str,
    #[case] expected: Result<LateCancellationRule, ParsePolicyModeError>,
) {
    assert_eq!(raw.parse::<LateCancellationRule>(), expected);
}
