//! Backend entry-point: loads settings, wires adapters, and serves HTTP.

mod server;

use std::sync::Arc;

use actix_web::web;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use booking_backend::domain::{BookingService, BookingServiceConfig};
use booking_backend::inbound::http::health::HealthState;
use booking_backend::outbound::course_seed::seed_courses;
use booking_backend::outbound::events::TracingBookingEventPublisher;
use booking_backend::outbound::memory::InMemoryBookingStore;
use booking_backend::outbound::persistence::{DbPool, PoolConfig, diesel_ports};
use booking_backend::settings::BookingSettings;
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = BookingSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let bind_addr = settings.bind_address().map_err(std::io::Error::other)?;
    let lock_timeout = settings
        .reservation_lock_timeout()
        .map_err(std::io::Error::other)?;

    let mut config = ServerConfig::new(bind_addr);
    let ports = match settings.database_url() {
        Some(url) => {
            let max_size = settings
                .database_max_connections()
                .map_err(std::io::Error::other)?;
            let pool = DbPool::new(PoolConfig::new(url).with_max_size(max_size))
                .await
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            info!(max_connections = max_size, "using PostgreSQL persistence");
            let ports = diesel_ports(&pool, Arc::new(TracingBookingEventPublisher));
            config = config.with_db_pool(pool);
            ports
        }
        None => {
            warn!("no database configured; bookings are kept in memory");
            let store = InMemoryBookingStore::new();
            match settings.course_catalog_path() {
                Some(path) => {
                    seed_courses(&store, path).map_err(std::io::Error::other)?;
                }
                None => warn!(
                    "no course catalogue configured; set BOOKING_COURSE_CATALOG_PATH \
                     to make courses bookable"
                ),
            }
            store.ports_with_events(Arc::new(TracingBookingEventPublisher))
        }
    };

    let service = Arc::new(BookingService::new(
        ports,
        Arc::new(DefaultClock),
        BookingServiceConfig { lock_timeout },
    ));
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, service, config)?;
    info!(%bind_addr, "booking backend listening");
    server.await
}
