//! Payment ledger HTTP handlers.
//!
//! ```text
//! GET  /api/v1/bookings/{bookingId}/payments
//! POST /api/v1/bookings/{bookingId}/payments
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::PaymentRecord;
use crate::domain::ports::{PaymentLedger, RecordPaymentRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::actor::ActorContext;
use crate::inbound::http::bookings::{PaymentSummaryResponse, parse_booking_id};
use crate::inbound::http::error::booking_failure;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, require};

/// Request payload for recording a payment.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentBody {
    /// Positive amount in minor currency units.
    pub amount: Option<i64>,
}

/// One ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordResponse {
    pub id: String,
    pub amount: i64,
    pub recorded_at: String,
    pub recorded_by: String,
    pub recorded_by_role: String,
}

impl From<PaymentRecord> for PaymentRecordResponse {
    fn from(value: PaymentRecord) -> Self {
        Self {
            id: value.id.to_string(),
            amount: value.amount,
            recorded_at: value.recorded_at.to_rfc3339(),
            recorded_by: value.recorded_by.id.to_string(),
            recorded_by_role: value.recorded_by.role.as_str().to_owned(),
        }
    }
}

/// Ledger with derived payment state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLedgerResponse {
    pub booking_id: String,
    pub records: Vec<PaymentRecordResponse>,
    pub summary: PaymentSummaryResponse,
}

impl From<PaymentLedger> for PaymentLedgerResponse {
    fn from(value: PaymentLedger) -> Self {
        Self {
            booking_id: value.booking_id.to_string(),
            records: value
                .records
                .into_iter()
                .map(PaymentRecordResponse::from)
                .collect(),
            summary: PaymentSummaryResponse::from(value.summary),
        }
    }
}

/// List payments recorded against a booking.
#[utoipa::path(
    get,
    path = "/api/v1/bookings/{booking_id}/payments",
    params(("booking_id" = String, Path, description = "Booking UUID")),
    responses(
        (status = 200, description = "Payment ledger", body = PaymentLedgerResponse),
        (status = 403, description = "Caller is not a participant", body = ErrorSchema),
        (status = 404, description = "Unknown booking", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "listPayments"
)]
#[get("/bookings/{booking_id}/payments")]
pub async fn list_payments(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<PaymentLedgerResponse>> {
    let booking_id = parse_booking_id(&path.into_inner())?;
    let ledger = state
        .bookings_query
        .list_payments(actor.actor(), booking_id)
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(PaymentLedgerResponse::from(ledger)))
}

/// Record a payment against a booking.
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{booking_id}/payments",
    params(("booking_id" = String, Path, description = "Booking UUID")),
    request_body = RecordPaymentBody,
    responses(
        (status = 201, description = "Payment recorded", body = PaymentLedgerResponse),
        (status = 400, description = "Amount missing or not positive", body = ErrorSchema),
        (status = 403, description = "Only the teacher may record payments", body = ErrorSchema),
        (status = 409, description = "Payment would exceed the amount due", body = ErrorSchema),
        (status = 422, description = "Booking does not accept payments", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "recordPayment"
)]
#[post("/bookings/{booking_id}/payments")]
pub async fn record_payment(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
    payload: web::Json<RecordPaymentBody>,
) -> ApiResult<HttpResponse> {
    let booking_id = parse_booking_id(&path.into_inner())?;
    let amount = require(payload.into_inner().amount, FieldName::new("amount"))?;
    let ledger = state
        .bookings
        .record_payment(RecordPaymentRequest {
            actor: actor.actor(),
            booking_id,
            amount,
        })
        .await
        .map_err(booking_failure)?;
    Ok(HttpResponse::Created().json(PaymentLedgerResponse::from(ledger)))
}
