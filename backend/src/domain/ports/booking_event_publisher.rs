//! Port for forwarding booking events to notification delivery.

use async_trait::async_trait;

use crate::domain::BookingEvent;

use super::define_port_error;

define_port_error! {
    /// Errors raised by booking event publishers.
    pub enum BookingEventPublisherError {
        /// The downstream sink could not be reached.
        Unavailable { message: String } =>
            "booking event sink unavailable: {message}",
        /// The sink refused the event.
        Rejected { message: String } =>
            "booking event rejected: {message}",
    }
}

/// Fire-and-forget event sink.
///
/// Failures never roll back the change that produced the event; callers log
/// them and move on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookingEventPublisher: Send + Sync {
    /// Publish one event.
    async fn publish(&self, event: &BookingEvent) -> Result<(), BookingEventPublisherError>;
}
