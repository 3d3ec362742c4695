//! PostgreSQL persistence adapters built on Diesel.
//!
//! Adapters only translate between rows and domain types; the scheduling
//! rules stay in the domain. Row structs (`models.rs`) and table definitions
//! (`schema.rs`) never leave this module. Connections come from a `bb8` pool
//! driven by `diesel-async`.
//!
//! # Example
//!
//! ```ignore
//! use booking_backend::outbound::persistence::{DbPool, PoolConfig, DieselBookingRepository};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/bookings")).await?;
//! let bookings = DieselBookingRepository::new(pool);
//! ```

mod diesel_availability_policy_repository;
mod diesel_booking_repository;
mod diesel_course_catalog;
mod diesel_payment_ledger_repository;
mod error_mapping;
mod models;
mod pool;
mod schema;

pub use diesel_availability_policy_repository::DieselAvailabilityPolicyRepository;
pub use diesel_booking_repository::DieselBookingRepository;
pub use diesel_course_catalog::DieselCourseCatalog;
pub use diesel_payment_ledger_repository::DieselPaymentLedgerRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

use std::sync::Arc;

use crate::domain::BookingServicePorts;
use crate::domain::ports::BookingEventPublisher;

/// Service ports backed by PostgreSQL through `pool`.
pub fn diesel_ports(pool: &DbPool, events: Arc<dyn BookingEventPublisher>) -> BookingServicePorts {
    BookingServicePorts {
        bookings: Arc::new(DieselBookingRepository::new(pool.clone())),
        policies: Arc::new(DieselAvailabilityPolicyRepository::new(pool.clone())),
        courses: Arc::new(DieselCourseCatalog::new(pool.clone())),
        payments: Arc::new(DieselPaymentLedgerRepository::new(pool.clone())),
        events,
    }
}
