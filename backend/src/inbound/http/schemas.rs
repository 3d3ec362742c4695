//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay free of `utoipa`; these wrappers mirror their wire
//! shape so the generated document can reference them.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Caller identity is missing or malformed.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// The caller may not perform this operation.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested booking does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The slot or ledger state conflicts with the request.
    #[schema(rename = "conflict")]
    Conflict,
    /// The request violates the teacher's policy or the booking lifecycle.
    #[schema(rename = "unprocessable")]
    Unprocessable,
    /// Temporarily unavailable; retry later.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    /// Human-readable message.
    #[schema(example = "requested slot overlaps an existing booking")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    trace_id: Option<String>,
    /// Structured context such as the conflicting interval.
    details: Option<serde_json::Value>,
}
