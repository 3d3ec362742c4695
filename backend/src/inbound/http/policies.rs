//! Availability policy HTTP handlers.
//!
//! ```text
//! GET /api/v1/teachers/{teacherId}/availability-policy
//! PUT /api/v1/teachers/{teacherId}/availability-policy
//! ```
//!
//! `PUT` replaces the whole policy; omitted fields take their defaults.

use actix_web::{get, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::ports::UpdateAvailabilityPolicyRequest;
use crate::domain::{
    AvailabilityPolicy, AvailabilityPolicyDraft, CancellationLimitEnforcement, Error,
    LateCancellationRule, TeacherId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::actor::ActorContext;
use crate::inbound::http::error::booking_failure;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid};

/// Request payload replacing a teacher's policy.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPolicyBody {
    pub booking_horizon_days: Option<u32>,
    pub buffer_minutes: Option<u32>,
    pub cancellation_deadline_hours: Option<u32>,
    /// Omit for no limit.
    pub frequent_cancellation_limit: Option<u32>,
    /// `allow_with_penalty` or `reject`.
    pub late_cancellation: Option<String>,
    /// `warn` or `reject`.
    pub cancellation_limit_enforcement: Option<String>,
    pub payment_grace_minutes: Option<u32>,
    /// Fixed offset of the teacher's timezone from UTC, in minutes.
    pub utc_offset_minutes: Option<i32>,
}

/// A teacher's effective policy.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPolicyResponse {
    pub booking_horizon_days: u32,
    pub buffer_minutes: u32,
    pub cancellation_deadline_hours: u32,
    pub frequent_cancellation_limit: Option<u32>,
    pub late_cancellation: String,
    pub cancellation_limit_enforcement: String,
    pub payment_grace_minutes: u32,
    pub utc_offset_minutes: i32,
}

impl From<&AvailabilityPolicy> for AvailabilityPolicyResponse {
    fn from(value: &AvailabilityPolicy) -> Self {
        let draft = AvailabilityPolicyDraft::from(value);
        Self {
            booking_horizon_days: draft.booking_horizon_days,
            buffer_minutes: draft.buffer_minutes,
            cancellation_deadline_hours: draft.cancellation_deadline_hours,
            frequent_cancellation_limit: draft.frequent_cancellation_limit,
            late_cancellation: draft.late_cancellation.as_str().to_owned(),
            cancellation_limit_enforcement: draft.cancellation_limit_enforcement.as_str().to_owned(),
            payment_grace_minutes: draft.payment_grace_minutes,
            utc_offset_minutes: draft.utc_offset_minutes,
        }
    }
}

fn invalid_mode_error(field: &'static str, value: &str, allowed: &str) -> Error {
    Error::invalid_request(format!("{field} must be one of {allowed}")).with_details(json!({
        "field": field,
        "value": value,
        "code": "invalid_policy_mode",
    }))
}

fn parse_policy_body(body: AvailabilityPolicyBody) -> Result<AvailabilityPolicyDraft, Error> {
    let defaults = AvailabilityPolicyDraft::from(&AvailabilityPolicy::default());
    let late_cancellation = match body.late_cancellation {
        Some(raw) => raw
            .parse::<LateCancellationRule>()
            .map_err(|_| invalid_mode_error("lateCancellation", &raw, "allow_with_penalty, reject"))?,
        None => defaults.late_cancellation,
    };
    let cancellation_limit_enforcement = match body.cancellation_limit_enforcement {
        Some(raw) => raw.parse::<CancellationLimitEnforcement>().map_err(|_| {
            invalid_mode_error("cancellationLimitEnforcement", &raw, "warn, reject")
        })?,
        None => defaults.cancellation_limit_enforcement,
    };

    Ok(AvailabilityPolicyDraft {
        booking_horizon_days: body
            .booking_horizon_days
            .unwrap_or(defaults.booking_horizon_days),
        buffer_minutes: body.buffer_minutes.unwrap_or(defaults.buffer_minutes),
        cancellation_deadline_hours: body
            .cancellation_deadline_hours
            .unwrap_or(defaults.cancellation_deadline_hours),
        frequent_cancellation_limit: body.frequent_cancellation_limit,
        late_cancellation,
        cancellation_limit_enforcement,
        payment_grace_minutes: body
            .payment_grace_minutes
            .unwrap_or(defaults.payment_grace_minutes),
        utc_offset_minutes: body
            .utc_offset_minutes
            .unwrap_or(defaults.utc_offset_minutes),
    })
}

fn parse_teacher_id(raw: &str) -> Result<TeacherId, Error> {
    parse_uuid(raw, FieldName::new("teacherId")).map(TeacherId::from_uuid)
}

/// Fetch a teacher's effective availability policy.
#[utoipa::path(
    get,
    path = "/api/v1/teachers/{teacher_id}/availability-policy",
    params(("teacher_id" = String, Path, description = "Teacher UUID")),
    responses(
        (status = 200, description = "Effective policy", body = AvailabilityPolicyResponse),
        (status = 400, description = "Invalid teacher id", body = ErrorSchema)
    ),
    tags = ["policies"],
    operation_id = "getAvailabilityPolicy"
)]
#[get("/teachers/{teacher_id}/availability-policy")]
pub async fn get_availability_policy(
    state: web::Data<HttpState>,
    _actor: ActorContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<AvailabilityPolicyResponse>> {
    let teacher_id = parse_teacher_id(&path.into_inner())?;
    let policy = state
        .bookings_query
        .availability_policy(teacher_id)
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(AvailabilityPolicyResponse::from(&policy)))
}

/// Replace a teacher's availability policy.
#[utoipa::path(
    put,
    path = "/api/v1/teachers/{teacher_id}/availability-policy",
    params(("teacher_id" = String, Path, description = "Teacher UUID")),
    request_body = AvailabilityPolicyBody,
    responses(
        (status = 200, description = "Saved policy", body = AvailabilityPolicyResponse),
        (status = 400, description = "Invalid policy", body = ErrorSchema),
        (status = 403, description = "Only the teacher may change the policy", body = ErrorSchema)
    ),
    tags = ["policies"],
    operation_id = "updateAvailabilityPolicy"
)]
#[put("/teachers/{teacher_id}/availability-policy")]
pub async fn update_availability_policy(
    state: web::Data<HttpState>,
    actor: ActorContext,
    path: web::Path<String>,
    payload: web::Json<AvailabilityPolicyBody>,
) -> ApiResult<web::Json<AvailabilityPolicyResponse>> {
    let teacher_id = parse_teacher_id(&path.into_inner())?;
    let policy = parse_policy_body(payload.into_inner())?;
    let saved = state
        .bookings
        .update_availability_policy(UpdateAvailabilityPolicyRequest {
            actor: actor.actor(),
            teacher_id,
            policy,
        })
        .await
        .map_err(booking_failure)?;
    Ok(web::Json(AvailabilityPolicyResponse::from(&saved)))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    #[rstest]
    fn omitted_fields_take_defaults() {
        let draft = parse_policy_body(AvailabilityPolicyBody {
            buffer_minutes: Some(15),
            ..AvailabilityPolicyBody::default()
        })
        .expect("valid body");

        assert_eq!(draft.buffer_minutes, 15);
        assert_eq!(draft.booking_horizon_days, 14);
        assert_eq!(draft.cancellation_deadline_hours, 24);
        assert_eq!(draft.late_cancellation, LateCancellationRule::AllowWithPenalty);
        assert_eq!(
            draft.cancellation_limit_enforcement,
            CancellationLimitEnforcement::Warn
        );
    }

    #[rstest]
    #[case(Some("sometimes"), None)]
    #[case(None, Some("ban"))]
    fn rejects_unknown_modes(#[case] late: Option<&str>, #[case] limit: Option<&str>) {
        let err = parse_policy_body(AvailabilityPolicyBody {
            late_cancellation: late.map(str::to_owned),
            cancellation_limit_enforcement: limit.map(str::to_owned),
            ..AvailabilityPolicyBody::default()
        })
        .expect_err("unknown mode");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
