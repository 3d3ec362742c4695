//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on the driving
//! ports, which keeps them testable with mocks.

use std::sync::Arc;

use crate::domain::ports::{BookingCommand, BookingQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Booking mutations.
    pub bookings: Arc<dyn BookingCommand>,
    /// Booking reads.
    pub bookings_query: Arc<dyn BookingQuery>,
}

impl HttpState {
    /// Bundle the driving ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use booking_backend::domain::BookingService;
    /// use booking_backend::inbound::http::state::HttpState;
    /// use booking_backend::outbound::memory::InMemoryBookingStore;
    ///
    /// let store = InMemoryBookingStore::new();
    /// let service = Arc::new(BookingService::new(
    ///     store.ports(),
    ///     Arc::new(mockable::DefaultClock),
    ///     Default::default(),
    /// ));
    /// let state = HttpState::new(service.clone(), service);
    /// let _query = state.bookings_query.clone();
    /// ```
    pub fn new(bookings: Arc<dyn BookingCommand>, bookings_query: Arc<dyn BookingQuery>) -> Self {
        Self {
            bookings,
            bookings_query,
        }
    }
}
