//! Booking event publishers.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};
use tracing::info;

use crate::domain::BookingEvent;
use crate::domain::ports::{BookingEventPublisher, BookingEventPublisherError};

/// Publisher writing each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBookingEventPublisher;

#[async_trait]
impl BookingEventPublisher for TracingBookingEventPublisher {
    async fn publish(&self, event: &BookingEvent) -> Result<(), BookingEventPublisherError> {
        let payload = serde_json::to_string(event)
            .map_err(|err| BookingEventPublisherError::rejected(err.to_string()))?;
        let trace_id = event
            .trace_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        info!(
            event = %event.kind,
            booking_id = %event.booking_id,
            trace_id = %trace_id,
            payload = %payload,
            "booking event"
        );
        Ok(())
    }
}

/// Publisher keeping every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct RecordingBookingEventPublisher {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingBookingEventPublisher {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<BookingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events published so far once at least `count` have arrived, or
    /// whatever arrived before `timeout` elapsed.
    ///
    /// Publishing happens on detached tasks, so callers wait here rather
    /// than reading [`Self::events`] straight after a command returns.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<BookingEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let events = self.events();
            if events.len() >= count || Instant::now() >= deadline {
                return events;
            }
            sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl BookingEventPublisher for RecordingBookingEventPublisher {
    async fn publish(&self, event: &BookingEvent) -> Result<(), BookingEventPublisherError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
