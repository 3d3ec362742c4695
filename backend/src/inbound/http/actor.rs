//! Caller identity supplied by the upstream gateway.
//!
//! The gateway authenticates the caller and forwards the principal in the
//! `X-Actor-Id` and `X-Actor-Role` headers. Handlers take an
//! [`ActorContext`] and pass the contained [`Actor`] to the driving ports.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header::HeaderMap};
use futures_util::future::{Ready, ready};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{Actor, ActorRole, Error};

/// Header carrying the caller's id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the caller's role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Authenticated caller extracted from request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorContext(Actor);

impl ActorContext {
    /// Wrap an already authenticated actor.
    pub const fn new(actor: Actor) -> Self {
        Self(actor)
    }

    /// The caller.
    pub const fn actor(&self) -> Actor {
        self.0
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, Error> {
    let value = headers
        .get(name)
        .ok_or_else(|| Error::unauthorized(format!("missing {name} header")))?;
    value.to_str().map(str::trim).map_err(|_| {
        Error::unauthorized(format!("{name} header must be ASCII"))
            .with_details(json!({"header": name}))
    })
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Error> {
    let raw_id = header(headers, ACTOR_ID_HEADER)?;
    let id = Uuid::parse_str(raw_id).map_err(|_| {
        Error::unauthorized(format!("{ACTOR_ID_HEADER} must be a UUID"))
            .with_details(json!({"header": ACTOR_ID_HEADER, "value": raw_id}))
    })?;
    let raw_role = header(headers, ACTOR_ROLE_HEADER)?;
    let role = raw_role.parse::<ActorRole>().map_err(|_| {
        Error::unauthorized("actor role must be student, teacher or admin")
            .with_details(json!({"header": ACTOR_ROLE_HEADER, "value": raw_role}))
    })?;
    Ok(Actor { id, role })
}

impl FromRequest for ActorContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req.headers()).map(Self))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test as actix_test, web};
    use rstest::rstest;

    use super::*;
    use crate::domain::ErrorCode;

    const ACTOR: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

    #[rstest]
    #[case("student", ActorRole::Student)]
    #[case("teacher", ActorRole::Teacher)]
    #[case("admin", ActorRole::Admin)]
    fn parses_known_roles(#[case] role: &str, #[case] expected: ActorRole) {
        let req = actix_test::TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, ACTOR))
            .insert_header((ACTOR_ROLE_HEADER, role))
            .to_http_request();

        let actor = actor_from_headers(req.headers()).expect("valid headers");
        assert_eq!(actor.role, expected);
        assert_eq!(actor.id.to_string(), ACTOR);
    }

    #[rstest]
    #[case(None, Some("student"))]
    #[case(Some("not-a-uuid"), Some("student"))]
    #[case(Some(ACTOR), None)]
    #[case(Some(ACTOR), Some("janitor"))]
    fn rejects_missing_or_malformed_headers(
        #[case] id: Option<&str>,
        #[case] role: Option<&str>,
    ) {
        let mut req = actix_test::TestRequest::default();
        if let Some(id) = id {
            req = req.insert_header((ACTOR_ID_HEADER, id));
        }
        if let Some(role) = role {
            req = req.insert_header((ACTOR_ROLE_HEADER, role));
        }

        let err = actor_from_headers(req.to_http_request().headers()).expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[actix_web::test]
    async fn extractor_short_circuits_with_401() {
        let app = actix_test::init_service(App::new().route(
            "/",
            web::get().to(|actor: ActorContext| async move {
                HttpResponse::Ok().body(actor.actor().role.as_str())
            }),
        ))
        .await;

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/")
                .insert_header((ACTOR_ID_HEADER, ACTOR))
                .insert_header((ACTOR_ROLE_HEADER, "teacher"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(res).await, "teacher");
    }
}
