//! HTTP inbound adapter exposing the booking REST endpoints.

pub mod actor;
pub mod bookings;
pub mod error;
pub mod health;
pub mod payments;
pub mod policies;
pub mod schemas;
pub mod state;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` booking endpoint on `cfg`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(bookings::reserve_booking)
        .service(bookings::get_booking)
        .service(bookings::confirm_booking)
        .service(bookings::decline_booking)
        .service(bookings::cancel_booking)
        .service(bookings::list_teacher_bookings)
        .service(payments::list_payments)
        .service(payments::record_payment)
        .service(policies::get_availability_policy)
        .service(policies::update_availability_policy);
}
