//! Behavioural properties of reservations, lifecycle, and payments against
//! the in-memory adapters.

use std::sync::Arc;

use booking_backend::domain::ports::{
    BookingActionRequest, BookingCommand, BookingQuery, ListTeacherBookingsRequest,
    RecordPaymentRequest,
};
use booking_backend::domain::{
    Actor, BookingError, BookingEventKind, BookingStatus, DateRange, PaymentStatus, StudentId,
};
use std::time::Duration;

use chrono::TimeDelta;
use rstest::rstest;

mod support;

use support::{PRICE, World, date, time, utc};

const EVENT_WAIT: Duration = Duration::from_secs(2);

/// Active bookings of the world's teacher stay apart by at least `buffer`.
fn assert_no_overlaps(world: &World, buffer: TimeDelta) {
    let active: Vec<_> = world
        .store
        .bookings_for(&world.teacher)
        .into_iter()
        .filter(|booking| booking.status().holds_slot())
        .collect();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            assert!(
                !a.interval().padded(buffer).overlaps(&b.interval()),
                "{} is within {} minutes of {}",
                a.interval(),
                buffer.num_minutes(),
                b.interval()
            );
        }
    }
}

#[rstest]
#[tokio::test]
async fn buffer_and_cancellation_walkthrough() {
    // Monday 2024-04-01 09:00 UTC, 10 minute buffer, 24 h deadline.
    let world = World::new(utc(2024, 4, 1, 9, 0), 120);
    world.set_policy(|draft| draft.buffer_minutes = 10).await;
    let day = date(2024, 4, 4);

    let existing = world
        .try_reserve(StudentId::random(), day, time(14, 0))
        .await
        .expect("14:00 reserved");
    world.confirm(existing.id()).await;

    let rejected = world
        .try_reserve(StudentId::random(), day, time(16, 5))
        .await
        .expect_err("16:05 rejected");
    match &rejected {
        BookingError::SlotConflict {
            conflicting_booking_id,
            conflicting_interval,
        } => {
            assert_eq!(*conflicting_booking_id, existing.id());
            assert_eq!(conflicting_interval.start().time(), time(14, 0));
            assert_eq!(conflicting_interval.end().time(), time(16, 0));
        }
        other => panic!("expected slot conflict, got {other:?}"),
    }

    let accepted = world
        .try_reserve(StudentId::random(), day, time(16, 10))
        .await
        .expect("16:10 accepted");

    // 25 hours ahead of the 16:10 session: free.
    world.confirm(accepted.id()).await;
    world.clock.set(utc(2024, 4, 3, 15, 10));
    let student = Actor::student(accepted.student_id());
    let free = world
        .service
        .cancel(BookingActionRequest {
            actor: student,
            booking_id: accepted.id(),
        })
        .await
        .expect("free cancellation");
    assert!(!free.late);

    // 4 hours ahead of the 14:00 session: late but allowed and counted.
    world.clock.set(utc(2024, 4, 4, 10, 0));
    let late = world
        .service
        .cancel(BookingActionRequest {
            actor: Actor::student(existing.student_id()),
            booking_id: existing.id(),
        })
        .await
        .expect("late cancellation allowed");
    assert!(late.late);
    assert_eq!(late.recent_cancellations, 1);
    assert_eq!(late.booking.booking.status(), BookingStatus::Cancelled);
    assert_eq!(world.store.cancellations().len(), 2);
}

#[rstest]
#[case(time(10, 15), true)]
#[case(time(10, 14), false)]
#[tokio::test]
async fn buffer_boundary_is_exact(#[case] start: chrono::NaiveTime, #[case] accepted: bool) {
    let world = World::new(utc(2024, 4, 1, 7, 0), 60);
    world.set_policy(|draft| draft.buffer_minutes = 15).await;
    let day = date(2024, 4, 2);
    world
        .try_reserve(StudentId::random(), day, time(9, 0))
        .await
        .expect("09:00-10:00 reserved");

    let result = world.try_reserve(StudentId::random(), day, start).await;
    assert_eq!(result.is_ok(), accepted, "{result:?}");
}

#[rstest]
#[case(14, true)]
#[case(15, false)]
#[tokio::test]
async fn horizon_boundary(#[case] days_ahead: u64, #[case] accepted: bool) {
    let world = World::new(utc(2024, 4, 1, 9, 0), 60);
    let day = date(2024, 4, 1) + chrono::Days::new(days_ahead);

    let result = world.try_reserve(StudentId::random(), day, time(10, 0)).await;
    match (accepted, result) {
        (true, Ok(_)) => {}
        (false, Err(BookingError::HorizonExceeded { latest, .. })) => {
            assert_eq!(latest, date(2024, 4, 15));
        }
        (_, other) => panic!("unexpected outcome for day {days_ahead}: {other:?}"),
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_for_one_slot_yield_one_booking() {
    let world = Arc::new(World::new(utc(2024, 4, 1, 9, 0), 60));
    let day = date(2024, 4, 3);

    let mut handles = Vec::new();
    for i in 0..8 {
        let world = Arc::clone(&world);
        // Alternate between two service instances sharing one store.
        let service = if i % 2 == 0 {
            Arc::clone(&world.service)
        } else {
            world.sibling_service()
        };
        handles.push(tokio::spawn(async move {
            let start = time(10, 0) + TimeDelta::minutes(i * 5);
            service
                .reserve(world.request(StudentId::random(), day, start))
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => successes += 1,
            Err(BookingError::SlotConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
    assert_no_overlaps(&world, TimeDelta::zero());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_reservations_never_double_book() {
    let world = Arc::new(World::new(utc(2024, 4, 1, 6, 0), 45));
    world.set_policy(|draft| draft.buffer_minutes = 10).await;
    let day = date(2024, 4, 2);

    // Starts five minutes apart, so many candidates collide only through the
    // buffer.
    let mut handles = Vec::new();
    for i in 0..24 {
        let world = Arc::clone(&world);
        handles.push(tokio::spawn(async move {
            let start = time(8, 0) + TimeDelta::minutes(i * 5);
            world.try_reserve(StudentId::random(), day, start).await
        }));
    }
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task completes") {
            Ok(_) => {}
            Err(BookingError::SlotConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert!(!world.store.bookings_for(&world.teacher).is_empty());
    assert!(conflicts > 0);
    assert_no_overlaps(&world, TimeDelta::minutes(10));
}

#[rstest]
#[tokio::test]
async fn different_teachers_book_the_same_time() {
    let first = World::new(utc(2024, 4, 1, 9, 0), 60);
    let second = World::new(utc(2024, 4, 1, 9, 0), 60);
    let day = date(2024, 4, 3);

    first
        .try_reserve(StudentId::random(), day, time(10, 0))
        .await
        .expect("first teacher");
    second
        .try_reserve(StudentId::random(), day, time(10, 0))
        .await
        .expect("second teacher");
}

#[rstest]
#[tokio::test]
async fn stale_pending_bookings_expire_on_read() {
    let world = World::new(utc(2024, 4, 1, 9, 0), 60);
    let day = date(2024, 4, 2);
    let booking = world
        .try_reserve(StudentId::random(), day, time(10, 0))
        .await
        .expect("reserved");
    world.events.wait_for(1, EVENT_WAIT).await;

    world.clock.set(utc(2024, 4, 2, 10, 1));
    let views = world
        .service
        .list_teacher_bookings(ListTeacherBookingsRequest {
            actor: world.teacher_actor(),
            teacher_id: world.teacher,
            range: DateRange::new(day, day).expect("range"),
        })
        .await
        .expect("listing");

    assert_eq!(views.len(), 1);
    assert_eq!(views[0].booking.status(), BookingStatus::Declined);
    let kinds: Vec<_> = world
        .events
        .wait_for(2, EVENT_WAIT)
        .await
        .iter()
        .map(|event| event.kind)
        .collect();
    assert_eq!(kinds, [BookingEventKind::Created, BookingEventKind::Expired]);

    let again = world
        .service
        .confirm(BookingActionRequest {
            actor: world.teacher_actor(),
            booking_id: booking.id(),
        })
        .await
        .expect_err("expired booking cannot be confirmed");
    assert_eq!(again.kind(), "invalid_transition");
}

#[rstest]
#[tokio::test]
async fn repeated_actions_are_idempotent() {
    let world = World::new(utc(2024, 4, 1, 9, 0), 60);
    let booking = world
        .try_reserve(StudentId::random(), date(2024, 4, 5), time(10, 0))
        .await
        .expect("reserved");
    world.confirm(booking.id()).await;
    world.confirm(booking.id()).await;

    let request = BookingActionRequest {
        actor: Actor::student(booking.student_id()),
        booking_id: booking.id(),
    };
    world.service.cancel(request).await.expect("cancel");
    let repeat = world.service.cancel(request).await.expect("repeat cancel");
    assert!(!repeat.late);
    assert_eq!(repeat.booking.booking.status(), BookingStatus::Cancelled);
    assert_eq!(world.store.cancellations().len(), 1);
}

#[rstest]
#[tokio::test]
async fn overpayment_rejection_leaves_ledger_unchanged() {
    let world = World::new(utc(2024, 4, 1, 9, 0), 60);
    let booking = world
        .try_reserve(StudentId::random(), date(2024, 4, 5), time(10, 0))
        .await
        .expect("reserved");
    world.confirm(booking.id()).await;
    let pay = |amount| RecordPaymentRequest {
        actor: world.teacher_actor(),
        booking_id: booking.id(),
        amount,
    };

    world.service.record_payment(pay(PRICE - 500)).await.expect("partial");
    let err = world
        .service
        .record_payment(pay(501))
        .await
        .expect_err("overpayment");
    assert_eq!(err.kind(), "overpayment");

    let ledger = world
        .service
        .list_payments(world.teacher_actor(), booking.id())
        .await
        .expect("ledger");
    assert_eq!(ledger.records.len(), 1);
    assert_eq!(ledger.summary.amount_paid, PRICE - 500);
    assert_eq!(ledger.summary.status, PaymentStatus::PartiallyPaid);
}

#[rstest]
#[tokio::test]
async fn unpaid_booking_becomes_overdue_after_grace() {
    let world = World::new(utc(2024, 4, 1, 9, 0), 60);
    world.set_policy(|draft| draft.payment_grace_minutes = 30).await;
    let booking = world
        .try_reserve(StudentId::random(), date(2024, 4, 2), time(10, 0))
        .await
        .expect("reserved");
    world.confirm(booking.id()).await;

    world.clock.set(utc(2024, 4, 2, 10, 30));
    let ledger = world
        .service
        .list_payments(world.teacher_actor(), booking.id())
        .await
        .expect("ledger");
    assert_eq!(ledger.summary.status, PaymentStatus::Unpaid);

    world.clock.set(utc(2024, 4, 2, 10, 31));
    let ledger = world
        .service
        .list_payments(world.teacher_actor(), booking.id())
        .await
        .expect("ledger");
    assert_eq!(ledger.summary.status, PaymentStatus::Overdue);
}
