//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::warn;

use booking_backend::Trace;
use booking_backend::doc::openapi_json;
use booking_backend::domain::BookingService;
use booking_backend::inbound::http::configure_api;
use booking_backend::inbound::http::health::{HealthState, live, ready};
use booking_backend::inbound::http::state::HttpState;

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(openapi_json)
        .service(ready)
        .service(live)
}

/// Construct an Actix HTTP server serving `service` through the booking API.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    service: Arc<BookingService>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(HttpState::new(service.clone(), service));
    let server_health_state = health_state.clone();
    let ServerConfig { bind_addr, db_pool } = config;

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    match db_pool {
        Some(pool) => {
            let health = health_state.clone();
            actix_web::rt::spawn(async move {
                match pool.get().await {
                    Ok(_) => health.mark_ready(),
                    Err(err) => warn!(error = %err, "database unavailable; staying not ready"),
                }
            });
        }
        None => health_state.mark_ready(),
    }
    Ok(server)
}
