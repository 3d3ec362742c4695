//! Shared fixtures for booking behaviour tests.

use std::sync::Arc;

use booking_backend::domain::ports::{
    BookingActionRequest, BookingCommand, CourseDetails, ReserveBookingRequest,
    UpdateAvailabilityPolicyRequest,
};
use booking_backend::domain::{
    Actor, AvailabilityPolicy, AvailabilityPolicyDraft, Booking, BookingError, BookingId,
    BookingService, BookingServiceConfig, CourseId, StudentId, TeacherId,
};
use booking_backend::outbound::events::RecordingBookingEventPublisher;
use booking_backend::outbound::memory::InMemoryBookingStore;
use booking_backend::test_support::MutableClock;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Amount due for the default course.
pub const PRICE: i64 = 4_500;

/// In-memory deployment with a controllable clock.
pub struct World {
    pub store: InMemoryBookingStore,
    pub clock: Arc<MutableClock>,
    pub events: Arc<RecordingBookingEventPublisher>,
    pub service: Arc<BookingService>,
    pub teacher: TeacherId,
    pub course: CourseId,
}

impl World {
    /// Teacher with one active course of `duration_minutes`, clock at `now`.
    pub fn new(now: DateTime<Utc>, duration_minutes: u32) -> Self {
        let store = InMemoryBookingStore::new();
        let events = Arc::new(RecordingBookingEventPublisher::new());
        let clock = Arc::new(MutableClock::new(now));
        let teacher = TeacherId::random();
        let course = CourseId::random();
        store.upsert_course(CourseDetails {
            id: course,
            teacher_id: teacher,
            duration_minutes,
            price: PRICE,
            is_active: true,
        });
        let service = Arc::new(BookingService::new(
            store.ports_with_events(events.clone()),
            clock.clone(),
            BookingServiceConfig::default(),
        ));
        Self {
            store,
            clock,
            events,
            service,
            teacher,
            course,
        }
    }

    /// A second service instance over the same store, as another process
    /// would run it.
    pub fn sibling_service(&self) -> Arc<BookingService> {
        Arc::new(BookingService::new(
            self.store.ports_with_events(self.events.clone()),
            self.clock.clone(),
            BookingServiceConfig::default(),
        ))
    }

    pub fn teacher_actor(&self) -> Actor {
        Actor::teacher(self.teacher)
    }

    pub fn request(&self, student: StudentId, date: NaiveDate, start: NaiveTime) -> ReserveBookingRequest {
        ReserveBookingRequest {
            actor: Actor::student(student),
            student_id: student,
            teacher_id: self.teacher,
            course_id: self.course,
            date,
            start_time: start,
            notes: None,
        }
    }

    pub async fn try_reserve(
        &self,
        student: StudentId,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<Booking, BookingError> {
        self.service
            .reserve(self.request(student, date, start))
            .await
            .map(|view| view.booking)
    }

    pub async fn confirm(&self, booking_id: BookingId) -> Booking {
        self.service
            .confirm(BookingActionRequest {
                actor: self.teacher_actor(),
                booking_id,
            })
            .await
            .expect("teacher confirms")
            .booking
    }

    pub async fn set_policy(&self, edit: impl FnOnce(&mut AvailabilityPolicyDraft)) {
        let mut draft = AvailabilityPolicyDraft::from(&AvailabilityPolicy::default());
        edit(&mut draft);
        self.service
            .update_availability_policy(UpdateAvailabilityPolicyRequest {
                actor: self.teacher_actor(),
                teacher_id: self.teacher,
                policy: draft,
            })
            .await
            .expect("policy saved");
    }
}

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .expect("valid instant")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn time(h: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, min, 0).expect("valid time")
}
