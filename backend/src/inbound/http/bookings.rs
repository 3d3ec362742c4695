//! Booking HTTP handlers.
//!
//! ```text
//! POST /api/v1/bookings
//! GET  /api/v1/bookings/{bookingId}
//! POST /api/v1/bookings/{bookingId}/confirm
//! POST /api/v1/bookings/{bookingId}/decline
//! POST /api/v1/bookings/{bookingId}/cancel
//! GET  /api/v1/teachers/{teacherId}/bookings?from=YYYY-MM-DD&to=YYYY-MM-DD
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    BookingActionRequest, BookingView, CancellationOutcome, ListTeacherBookingsRequest,
    ReserveBookingRequest,
};
use crate::domain::{
    Actor, ActorRole, Booking, BookingId, CourseId, Error, PaymentSummary, StudentId, TeacherId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::actor::ActorContext;
use crate::inbound::http::error::booking_failure;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, missing_field_error, parse_date, parse_range, parse_time, parse_uuid, require,
};

/// Request payload for reserving a slot.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReserveBookingBody {
    /// Student to book for; defaults to the calling student.
    pub student_id: Option<String>,
    pub teacher_id: Option<String>,
    pub course_id: Option<String>,
    /// Session date in the teacher's timezone, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Session start in the teacher's timezone, `HH:MM`.
    pub start_time: Option<String>,
    pub notes: Option<String>,
}

/// Derived payment state embedded in booking responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummaryResponse {
    pub amount_due: i64,
    pub amount_paid: i64,
    /// One of `unpaid`, `partially_paid`, `paid`, `overdue`.
    pub status: String,
}

impl From<PaymentSummary> for PaymentSummaryResponse {
    fn from(value: PaymentSummary) -> Self {
        Self {
            amount_due: value.amount_due,
            amount_paid: value.amount_paid,
            status: value.status.as_str().to_owned(),
        }
    }
}

/// Booking as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub course_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// One of `pending`, `confirmed`, `declined`, `cancelled`, `completed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub payment: PaymentSummaryResponse,
    pub created_at: String,
    pub updated_at: String,
}

impl BookingResponse {
    fn from_booking(booking: &Booking, payment: PaymentSummary) -> Self {
        Self {
            id: booking.id().to_string(),
            student_id: booking.student_id().to_string(),
            teacher_id: booking.teacher_id().to_string(),
            course_id: booking.course_id().to_string(),
            date: booking.date().format("%Y-%m-%d").to_string(),
            start_time: booking.start_time().format("%H:%M").to_string(),
            end_time: booking.end_time().format("%H:%M").to_string(),
            status: booking.status().as_str().to_owned(),
            notes: booking.notes().map(str::to_owned),
            payment: PaymentSummaryResponse::from(payment),
            created_at: booking.created_at().to_rfc3339(),
            updated_at: booking.updated_at().to_rfc3339(),
        }
    }
}

impl From<BookingView> for BookingResponse {
    fn from(value: BookingView) -> Self {
        Self::from_booking(&value.booking, value.payment)
    }
}

/// Result of a cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResponse {
    pub booking: BookingResponse,
    /// Whether the cancellation missed the teacher's deadline.
    pub late: bool,
    /// Late cancellations by the caller's role for the teacher in the last 7 days.
    pub recent_cancellations: u32,
    /// Set when the caller is over the teacher's limit in warn mode.
    pub suspension_recommended: bool,
}

impl From<CancellationOutcome> for CancellationResponse {
    fn from(value: CancellationOutcome) -> Self {
        Self {
            booking: BookingResponse::from(value.booking),
            late: value.late,
            recent_cancellations: value.recent_cancellations,
            suspension_recommended: value.suspension_recommended,
        }
    }
}

/// Inclusive date window for teacher listings.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// First day, `YYYY-MM-DD`.
    pub from: Option<String>,
    /// Last day, `YYYY-MM-DD`.
    pub to: Option<String>,
}

fn parse_reserve_body(actor: Actor, body: ReserveBookingBody) -> Result<ReserveBookingRequest, Error> {
    let student_id = match body.student_id {
        Some(raw) => StudentId::from_uuid(parse_uuid(&raw, FieldName::new("studentId"))?),
        None if actor.role == ActorRole::Student => StudentId::from_uuid(actor.id),
        None => return Err(missing_field_error(FieldName::new("studentId"))),
    };
    let teacher_id = require(body.teacher_id, FieldName::new("teacherId"))?;
    let course_id = require(body.course_id, FieldName::new("courseId"))?;
    let date = require(body.date, FieldName::new("date"))?;
    let start_time = require(body.start_time, FieldName::new("startTime"))?;

    Ok(ReserveBookingRequest {
        actor,
        student_id,
        teacher_id: TeacherId::from_uuid(parse_uuid(&teacher_id, FieldName::new("teacherId"))?),
        course_id: CourseId::from_uuid(parse_uuid(&course_id, FieldName::new("courseId"))?),
        date: parse_date(&date, FieldName::new("date"))?,
        start_time: parse_time(&start_time, FieldName::new("startTime"))?,
        notes: body.notes,
    })
}

pub(crate) fn parse_booking_id(raw: &str) -> Result<BookingId, Error> {
    parse_uuid(raw, FieldName::new("bookingId")).map(BookingId::from_uuid)
}

fn action_request(actor: &ActorContext, raw_id: &str) -> Result<BookingActionRequest, Error> {
    Ok(BookingActionRequest {
        actor: actor.actor(),
        booking_id: parse_booking_id(raw_id)?,
    })
}

/// Reserve a slot with a teacher.
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    request_body = ReserveBookingBody,
    responses(
        (status = 201, description = "Booking created as pending", body = BookingResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Caller may not book for this student", body = ErrorSchema),
        (status = 409, description = "Slot conflicts with an existing booking", body = ErrorSchema),
        (status = 422, description = "Outside horizon, in the past, or course unavailable", body = ErrorSchema),
        (status = 503, description = "Teacher calendar busy; retry", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "reserveBooking"
)]
#[post("/bookings")]
pub async fn reserve_booking(
    state: web::Data<HttpState>,
    actor: ActorContext,
    payload: web::Json<ReserveBookingBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_reserve_body(actor.actor(), payload.into_inner())?;
    let view = state
        .bookings
        .reserve(request)
        .await
        .map_err(booking_failure)?;
    Ok(HttpResponse::Created().json(BookingResponse::from(view)))
}

/// Fetch a booking with its payment summary.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_id}",
    params(("booking_id" = String, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Booking", body = BookingResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema),
        (status = 404, description = "Unknown booking", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "getBooking"
)]
#[get("/bookings/{booking_id}")]
pub async fn get_booking(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<BookingResponse>> {
    let booking_id = parse_booking_id(&path.into_inner())?;
    let view = state
        .bookings_query
        .get_booking(actor.actor(), booking_id)
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(BookingResponse::from(view)))
}

/// Teacher accepts a pending booking.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/confirm",
    params(("booking_id" = String, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Booking confirmed", body = BookingResponse),
        (status = 403, description = "Only the teacher may confirm", body = ErrorSchema),
        (status = 422, description = "Booking is no longer pending", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "confirmBooking"
)]
#[post("/bookings/{booking_id}/confirm")]
pub async fn confirm_booking(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<BookingResponse>> {
    let request = action_request(&actor, &path.into_inner())?;
    let view = state
        .bookings
        .confirm(request)
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(BookingResponse::from(view)))
}

/// Teacher rejects a pending booking.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/decline",
    params(("booking_id" = String, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Booking declined", body = BookingResponse),
        (status = 403, description = "Only the teacher may decline", body = ErrorSchema),
        (status = 422, description = "Booking is no longer pending", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "declineBooking"
)]
#[post("/bookings/{booking_id}/decline")]
pub async fn decline_booking(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<BookingResponse>> {
    let request = action_request(&actor, &path.into_inner())?;
    let view = state
        .bookings
        .decline(request)
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(BookingResponse::from(view)))
}

/// Teacher or student cancels a confirmed booking.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/cancel",
    params(("booking_id" = String, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Booking cancelled", body = CancellationResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema),
        (status = 422, description = "Past the deadline, over the limit, or not confirmed", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "cancelBooking"
)]
#[post("/bookings/{booking_id}/cancel")]
pub async fn cancel_booking(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CancellationResponse>> {
    let request = action_request(&actor, &path.into_inner())?;
    let outcome = state
        .bookings
        .cancel(request)
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(CancellationResponse::from(outcome)))
}

/// List a teacher's bookings in a date window.
#[utoipa::path(
    get,
    path = "/api/v1/teachers/{teacher_id}/bookings",
    params(
        ("teacher_id" = String, Path, description = "Teacher UUID"),
        DateRangeQuery
    ),
    responses(
        (status = 200, description = "Bookings ordered by start", body = [BookingResponse]),
        (status = 400, description = "Invalid date window", body = ErrorSchema),
        (status = 403, description = "Only the teacher may list", body = ErrorSchema)
    ),
    tags = ["bookings"],
    operation_id = "listTeacherBookings"
)]
#[get("/teachers/{teacher_id}/bookings")]
pub async fn list_teacher_bookings(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
    query: web::Query<DateRangeQuery>,
) -> ApiResult<web::Json<Vec<BookingResponse>>> {
    let teacher_id =
        TeacherId::from_uuid(parse_uuid(&path.into_inner(), FieldName::new("teacherId"))?);
    let DateRangeQuery { from, to } = query.into_inner();
    let range = parse_range(
        &require(from, FieldName::new("from"))?,
        &require(to, FieldName::new("to"))?,
    )?;
    let views = state
        .bookings_query
        .list_teacher_bookings(ListTeacherBookingsRequest {
            actor: actor.actor(),
            teacher_id,
            range,
        })
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(
        views.into_iter().map(BookingResponse::from).collect(),
    ))
}

#[cfg(test)]
#[path = "bookings_tests.rs"]
mod tests;
