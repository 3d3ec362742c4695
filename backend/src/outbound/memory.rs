//! In-memory adapters for every booking port.
//!
//! One mutex guards the whole store, which makes the guarded reservation
//! insert and the compare-and-set transition trivially atomic. Used by the
//! binary when no database is configured and by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::domain::ports::{
    AvailabilityPolicyRepository, AvailabilityPolicyRepositoryError, BookingEventPublisher,
    BookingRepository, BookingRepositoryError, CourseCatalog, CourseCatalogError, CourseDetails,
    PaymentAppend, PaymentLedgerRepository, PaymentLedgerRepositoryError, ReservationCommit,
    StatusUpdate,
};
use crate::domain::{
    AvailabilityPolicy, Booking, BookingId, BookingServicePorts, CancellationRecord, CourseId,
    DateRange, PaymentRecord, TeacherId, find_conflict, total_paid,
};
use crate::outbound::events::TracingBookingEventPublisher;

#[derive(Debug, Default)]
struct StoreState {
    bookings: HashMap<BookingId, Booking>,
    cancellations: Vec<CancellationRecord>,
    policies: HashMap<TeacherId, AvailabilityPolicy>,
    courses: HashMap<CourseId, CourseDetails>,
    payments: Vec<PaymentRecord>,
}

/// Shared in-memory store; clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBookingStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Service ports backed by this store, publishing events to the log.
    #[must_use]
    pub fn ports(&self) -> BookingServicePorts {
        self.ports_with_events(Arc::new(TracingBookingEventPublisher))
    }

    /// Service ports backed by this store with a custom event sink.
    #[must_use]
    pub fn ports_with_events(&self, events: Arc<dyn BookingEventPublisher>) -> BookingServicePorts {
        BookingServicePorts {
            bookings: Arc::new(self.clone()),
            policies: Arc::new(self.clone()),
            courses: Arc::new(self.clone()),
            payments: Arc::new(self.clone()),
            events,
        }
    }

    /// Register or replace a course in the catalogue.
    pub fn upsert_course(&self, course: CourseDetails) {
        self.state().courses.insert(course.id, course);
    }

    /// Store a booking without any conflict check.
    pub fn insert_booking(&self, booking: Booking) {
        self.state().bookings.insert(booking.id(), booking);
    }

    /// All stored bookings of a teacher, ordered by start.
    #[must_use]
    pub fn bookings_for(&self, teacher_id: &TeacherId) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .state()
            .bookings
            .values()
            .filter(|booking| booking.teacher_id() == *teacher_id)
            .cloned()
            .collect();
        bookings.sort_by_key(Booking::starts_at);
        bookings
    }

    /// Every cancellation record.
    #[must_use]
    pub fn cancellations(&self) -> Vec<CancellationRecord> {
        self.state().cancellations.clone()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingStore {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, BookingRepositoryError> {
        Ok(self.state().bookings.get(id).cloned())
    }

    async fn list_for_teacher(
        &self,
        teacher_id: &TeacherId,
        range: DateRange,
        active_only: bool,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut bookings: Vec<Booking> = self
            .state()
            .bookings
            .values()
            .filter(|booking| booking.teacher_id() == *teacher_id)
            .filter(|booking| range.contains(booking.date()))
            .filter(|booking| !active_only || booking.status().holds_slot())
            .cloned()
            .collect();
        bookings.sort_by_key(Booking::starts_at);
        Ok(bookings)
    }

    async fn commit_reservation(
        &self,
        booking: &Booking,
        buffer: TimeDelta,
    ) -> Result<ReservationCommit, BookingRepositoryError> {
        let mut state = self.state();
        let teacher_id = booking.teacher_id();
        let conflict = find_conflict(
            state
                .bookings
                .values()
                .filter(|existing| existing.teacher_id() == teacher_id),
            &booking.interval(),
            buffer,
        )
        .cloned();
        if let Some(existing) = conflict {
            return Ok(ReservationCommit::Conflict(existing));
        }
        state.bookings.insert(booking.id(), booking.clone());
        Ok(ReservationCommit::Committed)
    }

    async fn apply_transition(
        &self,
        update: &StatusUpdate,
    ) -> Result<bool, BookingRepositoryError> {
        let mut state = self.state();
        let id = update.booking.id();
        let matches = state
            .bookings
            .get(&id)
            .is_some_and(|stored| stored.status() == update.expected);
        if !matches {
            return Ok(false);
        }
        state.bookings.insert(id, update.booking.clone());
        if let Some(record) = &update.cancellation {
            state.cancellations.push(record.clone());
        }
        Ok(true)
    }

    async fn list_cancellations(
        &self,
        teacher_id: &TeacherId,
        since: DateTime<Utc>,
    ) -> Result<Vec<CancellationRecord>, BookingRepositoryError> {
        Ok(self
            .state()
            .cancellations
            .iter()
            .filter(|record| record.teacher_id == *teacher_id && record.cancelled_at > since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AvailabilityPolicyRepository for InMemoryBookingStore {
    async fn find_for_teacher(
        &self,
        teacher_id: &TeacherId,
    ) -> Result<Option<AvailabilityPolicy>, AvailabilityPolicyRepositoryError> {
        Ok(self.state().policies.get(teacher_id).copied())
    }

    async fn save(
        &self,
        teacher_id: &TeacherId,
        policy: &AvailabilityPolicy,
    ) -> Result<(), AvailabilityPolicyRepositoryError> {
        self.state().policies.insert(*teacher_id, *policy);
        Ok(())
    }
}

#[async_trait]
impl CourseCatalog for InMemoryBookingStore {
    async fn find_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseDetails>, CourseCatalogError> {
        Ok(self.state().courses.get(course_id).copied())
    }
}

#[async_trait]
impl PaymentLedgerRepository for InMemoryBookingStore {
    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<PaymentRecord>, PaymentLedgerRepositoryError> {
        Ok(self
            .state()
            .payments
            .iter()
            .filter(|record| record.booking_id == *booking_id)
            .cloned()
            .collect())
    }

    async fn append_within_amount_due(
        &self,
        record: &PaymentRecord,
        amount_due: i64,
    ) -> Result<PaymentAppend, PaymentLedgerRepositoryError> {
        let mut state = self.state();
        let existing: Vec<PaymentRecord> = state
            .payments
            .iter()
            .filter(|stored| stored.booking_id == record.booking_id)
            .cloned()
            .collect();
        let already_paid = total_paid(&existing);
        if already_paid
            .checked_add(record.amount)
            .is_none_or(|total| total > amount_due)
        {
            return Ok(PaymentAppend::WouldOverpay { already_paid });
        }
        state.payments.push(record.clone());
        Ok(PaymentAppend::Appended)
    }
}
