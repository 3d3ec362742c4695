//! Tests for booking, payment, and policy HTTP handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test as actix_test, web};
use chrono::{NaiveDate, NaiveTime, TimeDelta, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use uuid::Uuid;

use super::*;
use crate::domain::ports::{
    MockBookingCommand, MockBookingQuery, PaymentLedger, RecordPaymentRequest,
};
use crate::domain::{
    BookingDraft, BookingError, BookingStatus, PaymentStatus, SlotInterval,
};
use crate::inbound::http::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use crate::inbound::http::configure_api;

const STUDENT: &str = "11111111-1111-1111-1111-111111111111";
const TEACHER: &str = "22222222-2222-2222-2222-222222222222";
const COURSE: &str = "33333333-3333-3333-3333-333333333333";
const BOOKING: &str = "44444444-4444-4444-4444-444444444444";

fn uuid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).expect("fixture uuid")
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).expect("fixture date")
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("fixture time")
}

#[fixture]
fn booking() -> Booking {
    let now = Utc::now();
    Booking::new(BookingDraft {
        id: BookingId::from_uuid(uuid(BOOKING)),
        student_id: StudentId::from_uuid(uuid(STUDENT)),
        teacher_id: TeacherId::from_uuid(uuid(TEACHER)),
        course_id: CourseId::from_uuid(uuid(COURSE)),
        date: date(),
        start_time: time(16, 10),
        end_time: time(17, 10),
        status: BookingStatus::Pending,
        notes: None,
        amount_due: 4_000,
        created_at: now,
        updated_at: now,
    })
    .expect("valid booking")
}

fn view(booking: Booking) -> BookingView {
    let amount_due = booking.amount_due();
    BookingView {
        booking,
        payment: PaymentSummary {
            amount_due,
            amount_paid: 0,
            status: PaymentStatus::Unpaid,
        },
    }
}

fn app(
    command: MockBookingCommand,
    query: MockBookingQuery,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let state = HttpState::new(Arc::new(command), Arc::new(query));
    App::new()
        .app_data(web::Data::new(state))
        .service(web::scope("/api/v1").configure(configure_api))
}

fn as_student(req: actix_test::TestRequest) -> actix_test::TestRequest {
    req.insert_header((ACTOR_ID_HEADER, STUDENT))
        .insert_header((ACTOR_ROLE_HEADER, "student"))
}

fn as_teacher(req: actix_test::TestRequest) -> actix_test::TestRequest {
    req.insert_header((ACTOR_ID_HEADER, TEACHER))
        .insert_header((ACTOR_ROLE_HEADER, "teacher"))
}

fn detail<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.get("details").and_then(|details| details.get(key))
}

#[rstest]
#[actix_web::test]
async fn reserve_defaults_student_to_caller(booking: Booking) {
    let mut command = MockBookingCommand::new();
    let created = view(booking);
    command
        .expect_reserve()
        .withf(|request| {
            request.student_id == StudentId::from_uuid(uuid(STUDENT))
                && request.teacher_id == TeacherId::from_uuid(uuid(TEACHER))
                && request.start_time == time(16, 10)
                && request.notes.as_deref() == Some("grammar review")
        })
        .times(1)
        .return_once(move |_| Ok(created));
    let app = actix_test::init_service(app(command, MockBookingQuery::new())).await;

    let req = as_student(actix_test::TestRequest::post().uri("/api/v1/bookings"))
        .set_json(json!({
            "teacherId": TEACHER,
            "courseId": COURSE,
            "date": "2024-03-04",
            "startTime": "16:10",
            "notes": "grammar review",
        }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("status").and_then(Value::as_str), Some("pending"));
    assert_eq!(body.get("startTime").and_then(Value::as_str), Some("16:10"));
    assert_eq!(body.get("endTime").and_then(Value::as_str), Some("17:10"));
    assert_eq!(
        body.pointer("/payment/status").and_then(Value::as_str),
        Some("unpaid")
    );
}

#[rstest]
#[case(json!({"courseId": COURSE, "date": "2024-03-04", "startTime": "16:10"}), "teacherId")]
#[case(json!({"teacherId": TEACHER, "courseId": COURSE, "date": "04/03/2024", "startTime": "16:10"}), "date")]
#[case(json!({"teacherId": TEACHER, "courseId": "nope", "date": "2024-03-04", "startTime": "16:10"}), "courseId")]
#[actix_web::test]
async fn reserve_rejects_malformed_payloads(#[case] payload: Value, #[case] field: &str) {
    let app =
        actix_test::init_service(app(MockBookingCommand::new(), MockBookingQuery::new())).await;

    let req = as_student(actix_test::TestRequest::post().uri("/api/v1/bookings"))
        .set_json(payload)
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(detail(&body, "field").and_then(Value::as_str), Some(field));
}

#[rstest]
#[actix_web::test]
async fn reserve_conflict_reports_existing_interval() {
    let mut command = MockBookingCommand::new();
    command.expect_reserve().return_once(|_| {
        Err(BookingError::SlotConflict {
            conflicting_booking_id: BookingId::from_uuid(uuid(BOOKING)),
            conflicting_interval: SlotInterval::new_unchecked(
                date().and_time(time(14, 0)),
                date().and_time(time(16, 0)),
            ),
        })
    });
    let app = actix_test::init_service(app(command, MockBookingQuery::new())).await;

    let req = as_student(actix_test::TestRequest::post().uri("/api/v1/bookings"))
        .set_json(json!({
            "teacherId": TEACHER,
            "courseId": COURSE,
            "date": "2024-03-04",
            "startTime": "16:05",
        }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("code").and_then(Value::as_str), Some("conflict"));
    assert_eq!(
        body.pointer("/details/conflictingInterval/startTime")
            .and_then(Value::as_str),
        Some("14:00")
    );
    assert_eq!(
        body.pointer("/details/conflictingInterval/endTime")
            .and_then(Value::as_str),
        Some("16:00")
    );
}

#[rstest]
#[actix_web::test]
async fn requests_without_identity_are_unauthorised() {
    let app =
        actix_test::init_service(app(MockBookingCommand::new(), MockBookingQuery::new())).await;

    let req = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/bookings/{BOOKING}"))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[actix_web::test]
async fn confirm_by_student_is_forbidden() {
    let mut command = MockBookingCommand::new();
    command
        .expect_confirm()
        .return_once(|_| Err(BookingError::not_authorised("confirm this booking")));
    let app = actix_test::init_service(app(command, MockBookingQuery::new())).await;

    let req = as_student(
        actix_test::TestRequest::post().uri(&format!("/api/v1/bookings/{BOOKING}/confirm")),
    )
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_web::test]
async fn cancel_reports_late_flag(booking: Booking) {
    let mut command = MockBookingCommand::new();
    let cancelled = booking.with_status(BookingStatus::Cancelled, Utc::now());
    command
        .expect_cancel()
        .withf(|request| request.booking_id == BookingId::from_uuid(uuid(BOOKING)))
        .return_once(move |_| {
            Ok(CancellationOutcome {
                booking: view(cancelled),
                late: true,
                recent_cancellations: 2,
                suspension_recommended: false,
            })
        });
    let app = actix_test::init_service(app(command, MockBookingQuery::new())).await;

    let req = as_teacher(
        actix_test::TestRequest::post().uri(&format!("/api/v1/bookings/{BOOKING}/cancel")),
    )
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.get("late").and_then(Value::as_bool), Some(true));
    assert_eq!(body.get("recentCancellations").and_then(Value::as_u64), Some(2));
    assert_eq!(
        body.pointer("/booking/status").and_then(Value::as_str),
        Some("cancelled")
    );
}

#[rstest]
#[actix_web::test]
async fn list_rejects_reversed_range() {
    let app =
        actix_test::init_service(app(MockBookingCommand::new(), MockBookingQuery::new())).await;

    let req = as_teacher(actix_test::TestRequest::get().uri(&format!(
        "/api/v1/teachers/{TEACHER}/bookings?from=2024-03-10&to=2024-03-01"
    )))
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[rstest]
#[actix_web::test]
async fn list_passes_range_to_query(booking: Booking) {
    let mut query = MockBookingQuery::new();
    let listed = vec![view(booking)];
    query
        .expect_list_teacher_bookings()
        .withf(|request| {
            request.range.first_day() == date()
                && request.range.last_day() == date() + TimeDelta::days(6)
        })
        .return_once(move |_| Ok(listed));
    let app = actix_test::init_service(app(MockBookingCommand::new(), query)).await;

    let req = as_teacher(actix_test::TestRequest::get().uri(&format!(
        "/api/v1/teachers/{TEACHER}/bookings?from=2024-03-04&to=2024-03-10"
    )))
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[rstest]
#[actix_web::test]
async fn overpayment_is_a_conflict() {
    let mut command = MockBookingCommand::new();
    command
        .expect_record_payment()
        .withf(|request: &RecordPaymentRequest| request.amount == 5_000)
        .return_once(|request| {
            Err(BookingError::Overpayment {
                booking_id: request.booking_id,
                amount_due: 4_000,
                already_paid: 0,
                attempted: request.amount,
            })
        });
    let app = actix_test::init_service(app(command, MockBookingQuery::new())).await;

    let req = as_teacher(
        actix_test::TestRequest::post().uri(&format!("/api/v1/bookings/{BOOKING}/payments")),
    )
    .set_json(json!({"amount": 5_000}))
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(
        detail(&body, "kind").and_then(Value::as_str),
        Some("overpayment")
    );
}

#[rstest]
#[actix_web::test]
async fn payment_ledger_lists_records(booking: Booking) {
    let mut query = MockBookingQuery::new();
    let booking_id = booking.id();
    query.expect_list_payments().return_once(move |actor, _| {
        Ok(PaymentLedger {
            booking_id,
            records: vec![crate::domain::PaymentRecord {
                id: Uuid::nil(),
                booking_id,
                amount: 1_500,
                recorded_at: Utc::now(),
                recorded_by: actor,
            }],
            summary: PaymentSummary {
                amount_due: 4_000,
                amount_paid: 1_500,
                status: PaymentStatus::PartiallyPaid,
            },
        })
    });
    let app = actix_test::init_service(app(MockBookingCommand::new(), query)).await;

    let req = as_teacher(
        actix_test::TestRequest::get().uri(&format!("/api/v1/bookings/{BOOKING}/payments")),
    )
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(
        body.pointer("/summary/status").and_then(Value::as_str),
        Some("partially_paid")
    );
    assert_eq!(
        body.pointer("/records/0/recordedByRole").and_then(Value::as_str),
        Some("teacher")
    );
}

#[rstest]
#[actix_web::test]
async fn repository_failures_are_redacted() {
    let mut query = MockBookingQuery::new();
    query.expect_get_booking().return_once(|_, _| {
        Err(BookingError::Repository {
            failure: crate::domain::RepositoryFailure::Query,
            message: "relation \"bookings\" does not exist".to_owned(),
        })
    });
    let app = actix_test::init_service(app(MockBookingCommand::new(), query)).await;

    let req = as_student(
        actix_test::TestRequest::get().uri(&format!("/api/v1/bookings/{BOOKING}")),
    )
    .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(
        body.get("message").and_then(Value::as_str),
        Some("Internal server error")
    );
}

#[rstest]
#[actix_web::test]
async fn reservation_timeout_is_service_unavailable() {
    let mut command = MockBookingCommand::new();
    command.expect_reserve().return_once(|_| {
        Err(BookingError::ReservationTimeout {
            teacher_id: TeacherId::from_uuid(uuid(TEACHER)),
            waited_ms: 2_000,
        })
    });
    let app = actix_test::init_service(app(command, MockBookingQuery::new())).await;

    let req = as_student(actix_test::TestRequest::post().uri("/api/v1/bookings"))
        .set_json(json!({
            "teacherId": TEACHER,
            "courseId": COURSE,
            "date": "2024-03-04",
            "startTime": "16:10",
        }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(
        body.get("code").and_then(Value::as_str),
        Some("service_unavailable")
    );
    assert_eq!(detail(&body, "retryable"), Some(&Value::Bool(true)));
    assert_eq!(
        detail(&body, "kind").and_then(Value::as_str),
        Some("reservation_timeout")
    );
}
