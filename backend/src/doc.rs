//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every booking, payment, policy, and health endpoint
//! along with the request and response DTOs. The document is served as JSON
//! by [`openapi_json`] so clients can generate bindings.

use actix_web::{HttpResponse, get};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::inbound::http::bookings::{
    BookingResponse, CancellationResponse, PaymentSummaryResponse, ReserveBookingBody,
};
use crate::inbound::http::payments::{
    PaymentLedgerResponse, PaymentRecordResponse, RecordPaymentBody,
};
use crate::inbound::http::policies::{AvailabilityPolicyBody, AvailabilityPolicyResponse};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// Describe the caller identity headers as security schemes.
struct ActorHeadersAddon;

impl Modify for ActorHeadersAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "ActorId",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-actor-id",
                "UUID of the authenticated caller.",
            ))),
        );
        components.add_security_scheme(
            "ActorRole",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-actor-role",
                "Caller role: student, teacher, or admin.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&ActorHeadersAddon),
    info(
        title = "Lesson booking API",
        description = "Reservations, lifecycle actions, payments, and availability policies for one-to-one lessons."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("ActorId" = [], "ActorRole" = [])),
    paths(
        crate::inbound::http::bookings::reserve_booking,
        crate::inbound::http::bookings::get_booking,
        crate::inbound::http::bookings::confirm_booking,
        crate::inbound::http::bookings::decline_booking,
        crate::inbound::http::bookings::cancel_booking,
        crate::inbound::http::bookings::list_teacher_bookings,
        crate::inbound::http::payments::list_payments,
        crate::inbound::http::payments::record_payment,
        crate::inbound::http::policies::get_availability_policy,
        crate::inbound::http::policies::update_availability_policy,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ReserveBookingBody,
        BookingResponse,
        PaymentSummaryResponse,
        CancellationResponse,
        RecordPaymentBody,
        PaymentRecordResponse,
        PaymentLedgerResponse,
        AvailabilityPolicyBody,
        AvailabilityPolicyResponse,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "bookings", description = "Reserve bookings and drive their lifecycle"),
        (name = "payments", description = "Payment ledger per booking"),
        (name = "policies", description = "Per-teacher availability policies"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

/// Serve the generated OpenAPI document.
#[get("/api-docs/openapi.json")]
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    use super::*;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    fn error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[rstest]
    #[case("/api/v1/bookings")]
    #[case("/api/v1/bookings/{booking_id}/cancel")]
    #[case("/api/v1/bookings/{booking_id}/payments")]
    #[case("/api/v1/teachers/{teacher_id}/bookings")]
    #[case("/api/v1/teachers/{teacher_id}/availability-policy")]
    #[case("/health/ready")]
    fn document_lists_endpoint(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    fn booking_response_uses_camel_case_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let booking = schemas.get("BookingResponse").expect("BookingResponse schema");

        assert_object_schema_has_field(booking, "teacherId");
        assert_object_schema_has_field(booking, "amountDue");
    }

    #[actix_web::test]
    async fn serves_document_as_json() {
        let app = actix_test::init_service(App::new().service(openapi_json)).await;
        let request = actix_test::TestRequest::get()
            .uri("/api-docs/openapi.json")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, request).await;

        assert_eq!(body["info"]["title"], "Lesson booking API");
        assert!(body["paths"]["/api/v1/bookings"].is_object());
    }
}
