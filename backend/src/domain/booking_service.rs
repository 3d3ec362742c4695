//! Booking domain service.
//!
//! Implements the [`BookingCommand`] and [`BookingQuery`] driving ports.
//! Every write to a teacher's calendar runs under that teacher's lock from
//! [`TeacherLocks`]; the repository's guarded insert and compare-and-set
//! update repeat the critical checks atomically so separate processes
//! sharing one database stay consistent too.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::ports::{
    AvailabilityPolicyRepository, BookingActionRequest, BookingCommand, BookingEventPublisher,
    BookingQuery, BookingRepository, BookingView, CancellationOutcome, CourseCatalog,
    ListTeacherBookingsRequest, PaymentAppend, PaymentLedger, PaymentLedgerRepository,
    RecordPaymentRequest, ReservationCommit, ReserveBookingRequest, StatusUpdate,
    UpdateAvailabilityPolicyRequest,
};
use crate::domain::{
    Actor, AvailabilityPolicy, Booking, BookingAction, BookingDraft, BookingError, BookingEvent,
    BookingEventKind, BookingId, BookingStatus, CANCELLATION_WINDOW_DAYS,
    CancellationLimitEnforcement, CancellationRecord, DateRange, Initiator, PaymentRecord,
    RepositoryFailure, SlotInterval, TeacherId, TeacherLockGuard, TeacherLocks, TraceId,
    apply_transition, derive_payment_status, due_time_based_action, ensure_within_amount_due,
    find_conflict, total_paid,
};

/// Default wait for a teacher lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2_000);

/// Outbound ports the booking service depends on.
#[derive(Clone)]
pub struct BookingServicePorts {
    /// Booking storage.
    pub bookings: Arc<dyn BookingRepository>,
    /// Availability policy storage.
    pub policies: Arc<dyn AvailabilityPolicyRepository>,
    /// Course lookups.
    pub courses: Arc<dyn CourseCatalog>,
    /// Payment ledger storage.
    pub payments: Arc<dyn PaymentLedgerRepository>,
    /// Event sink.
    pub events: Arc<dyn BookingEventPublisher>,
}

/// Tunables for [`BookingService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingServiceConfig {
    /// Maximum wait for a teacher lock before failing with
    /// [`BookingError::ReservationTimeout`].
    pub lock_timeout: Duration,
}

impl Default for BookingServiceConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Booking service implementing the driving ports.
#[derive(Clone)]
pub struct BookingService {
    ports: BookingServicePorts,
    clock: Arc<dyn Clock>,
    locks: Arc<TeacherLocks>,
    config: BookingServiceConfig,
}

/// Cancellation policy checks evaluated before committing.
struct CancellationCheck {
    record: CancellationRecord,
    recent: u32,
    exceeded: bool,
}

impl BookingService {
    /// Create a service with its own lock registry.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use booking_backend::domain::{BookingService, BookingServiceConfig};
    /// use booking_backend::outbound::memory::InMemoryBookingStore;
    /// use mockable::DefaultClock;
    ///
    /// let store = InMemoryBookingStore::new();
    /// let service = BookingService::new(
    ///     store.ports(),
    ///     Arc::new(DefaultClock),
    ///     BookingServiceConfig::default(),
    /// );
    /// # let _ = service;
    /// ```
    pub fn new(
        ports: BookingServicePorts,
        clock: Arc<dyn Clock>,
        config: BookingServiceConfig,
    ) -> Self {
        Self {
            ports,
            clock,
            locks: Arc::new(TeacherLocks::new()),
            config,
        }
    }

    async fn lock_teacher(&self, teacher_id: TeacherId) -> Result<TeacherLockGuard, BookingError> {
        self.locks
            .acquire(teacher_id, self.config.lock_timeout)
            .await
            .map_err(|err| {
                warn!(teacher_id = %teacher_id, waited = ?err.waited, "teacher lock timed out");
                BookingError::from(err)
            })
    }

    async fn load_policy(&self, teacher_id: &TeacherId) -> Result<AvailabilityPolicy, BookingError> {
        Ok(self
            .ports
            .policies
            .find_for_teacher(teacher_id)
            .await?
            .unwrap_or_default())
    }

    async fn find_booking(&self, booking_id: BookingId) -> Result<Booking, BookingError> {
        self.ports
            .bookings
            .find_by_id(&booking_id)
            .await?
            .ok_or(BookingError::NotFound { booking_id })
    }

    /// Hand `event` to the publisher on a detached task.
    ///
    /// Delivery is never awaited, so a slow sink cannot hold up the caller
    /// or the teacher lock. Must be called inside a Tokio runtime.
    fn publish(&self, event: BookingEvent) {
        let events = Arc::clone(&self.ports.events);
        let delivery = async move {
            if let Err(err) = events.publish(&event).await {
                warn!(
                    booking_id = %event.booking_id,
                    event = %event.kind,
                    error = %err,
                    "failed to publish booking event"
                );
            }
        };
        match TraceId::current() {
            Some(trace_id) => drop(tokio::spawn(TraceId::scope(trace_id, delivery))),
            None => drop(tokio::spawn(delivery)),
        }
    }

    /// Apply the due time-based transition to `booking`. Caller holds the
    /// teacher lock.
    async fn settle_locked(
        &self,
        booking: Booking,
        policy: &AvailabilityPolicy,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let now_local = policy.local_time(now);
        let Some(action) = due_time_based_action(&booking, now_local) else {
            return Ok(booking);
        };
        let outcome = apply_transition(&booking, action, &Initiator::System, now_local, now)
            .map_err(|err| BookingError::from_transition(booking.id(), err))?;
        let update = StatusUpdate {
            booking: outcome.booking,
            expected: outcome.previous,
            cancellation: None,
        };
        if !self.ports.bookings.apply_transition(&update).await? {
            debug!(booking_id = %booking.id(), "booking changed concurrently while settling");
            return self.find_booking(booking.id()).await;
        }
        info!(
            booking_id = %update.booking.id(),
            teacher_id = %update.booking.teacher_id(),
            action = %action,
            status = %update.booking.status(),
            "settled time-based booking transition"
        );
        self.publish(BookingEvent::new(
            BookingEventKind::from(action),
            &update.booking,
            None,
        ));
        Ok(update.booking)
    }

    /// Settle every due booking of one teacher, taking the lock only when
    /// something is due.
    async fn settle_all(
        &self,
        teacher_id: TeacherId,
        bookings: Vec<Booking>,
        policy: &AvailabilityPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<Booking>, BookingError> {
        let now_local = policy.local_time(now);
        if bookings
            .iter()
            .all(|booking| due_time_based_action(booking, now_local).is_none())
        {
            return Ok(bookings);
        }
        let _guard = self.lock_teacher(teacher_id).await?;
        let mut settled = Vec::with_capacity(bookings.len());
        for booking in bookings {
            settled.push(self.settle_locked(booking, policy, now).await?);
        }
        Ok(settled)
    }

    async fn settle_one(
        &self,
        booking: Booking,
        policy: &AvailabilityPolicy,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let teacher_id = booking.teacher_id();
        let mut settled = self.settle_all(teacher_id, vec![booking], policy, now).await?;
        settled.pop().ok_or_else(|| BookingError::Repository {
            failure: RepositoryFailure::Query,
            message: "settled booking missing".to_owned(),
        })
    }

    async fn ledger(
        &self,
        booking: &Booking,
        policy: &AvailabilityPolicy,
        now: DateTime<Utc>,
    ) -> Result<PaymentLedger, BookingError> {
        let records = self.ports.payments.list_for_booking(&booking.id()).await?;
        let summary = derive_payment_status(
            booking,
            &records,
            policy.local_time(now),
            policy.payment_grace_period(),
        );
        Ok(PaymentLedger {
            booking_id: booking.id(),
            records,
            summary,
        })
    }

    async fn view(
        &self,
        booking: Booking,
        policy: &AvailabilityPolicy,
        now: DateTime<Utc>,
    ) -> Result<BookingView, BookingError> {
        let payment = self.ledger(&booking, policy, now).await?.summary;
        Ok(BookingView { booking, payment })
    }

    fn ensure_participant(actor: &Actor, booking: &Booking, operation: &str) -> Result<(), BookingError> {
        if actor.is_admin()
            || actor.is_teacher(&booking.teacher_id())
            || actor.is_student(&booking.student_id())
        {
            Ok(())
        } else {
            Err(BookingError::not_authorised(operation))
        }
    }

    fn conflict_error(existing: &Booking, candidate: &SlotInterval) -> BookingError {
        warn!(
            teacher_id = %existing.teacher_id(),
            conflicting_booking_id = %existing.id(),
            requested = %candidate,
            "reservation rejected by slot conflict"
        );
        BookingError::SlotConflict {
            conflicting_booking_id: existing.id(),
            conflicting_interval: existing.interval(),
        }
    }

    async fn reserve_locked(
        &self,
        request: &ReserveBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<(Booking, AvailabilityPolicy), BookingError> {
        let policy = self.load_policy(&request.teacher_id).await?;
        let course = self
            .ports
            .courses
            .find_course(&request.course_id)
            .await?
            .filter(|course| course.is_bookable_with(&request.teacher_id))
            .ok_or(BookingError::CourseUnavailable {
                course_id: request.course_id,
            })?;

        let duration = TimeDelta::minutes(i64::from(course.duration_minutes));
        let interval = SlotInterval::on_date(request.date, request.start_time, duration)?;

        let now_local = policy.local_time(now);
        if interval.start() <= now_local {
            return Err(BookingError::SlotInPast {
                start: interval.start(),
            });
        }
        if !policy.is_within_booking_horizon(request.date, now) {
            warn!(
                teacher_id = %request.teacher_id,
                requested = %request.date,
                horizon_days = policy.booking_horizon_days(),
                "reservation rejected beyond booking horizon"
            );
            return Err(BookingError::HorizonExceeded {
                requested: request.date,
                latest: policy.latest_bookable_date(now),
            });
        }

        let nearby = self
            .ports
            .bookings
            .list_for_teacher(&request.teacher_id, DateRange::around(request.date, 1), true)
            .await?;
        let mut active = Vec::with_capacity(nearby.len());
        for booking in nearby {
            active.push(self.settle_locked(booking, &policy, now).await?);
        }
        if let Some(existing) = find_conflict(&active, &interval, policy.buffer()) {
            return Err(Self::conflict_error(existing, &interval));
        }

        let booking = Booking::new(BookingDraft {
            id: BookingId::random(),
            student_id: request.student_id,
            teacher_id: request.teacher_id,
            course_id: request.course_id,
            date: request.date,
            start_time: request.start_time,
            end_time: interval.end().time(),
            status: BookingStatus::Pending,
            notes: request.notes.clone(),
            amount_due: course.price,
            created_at: now,
            updated_at: now,
        })
        .map_err(|err| BookingError::invalid_request(err.to_string()))?;

        match self
            .ports
            .bookings
            .commit_reservation(&booking, policy.buffer())
            .await?
        {
            ReservationCommit::Committed => Ok((booking, policy)),
            ReservationCommit::Conflict(existing) => Err(Self::conflict_error(&existing, &interval)),
        }
    }

    async fn check_cancellation(
        &self,
        actor: &Actor,
        booking: &Booking,
        policy: &AvailabilityPolicy,
        now: DateTime<Utc>,
    ) -> Result<CancellationCheck, BookingError> {
        let assessment = policy.evaluate_cancellation(booking, now);
        if !assessment.allowed {
            warn!(
                booking_id = %booking.id(),
                lead_time_minutes = assessment.lead_time.num_minutes(),
                "cancellation rejected after deadline"
            );
            return Err(BookingError::PastCancellationDeadline {
                booking_id: booking.id(),
                lead_time_minutes: assessment.lead_time.num_minutes(),
                deadline_hours: assessment.deadline.num_hours(),
            });
        }

        let record = CancellationRecord {
            booking_id: booking.id(),
            teacher_id: booking.teacher_id(),
            actor: *actor,
            cancelled_at: now,
            late: assessment.late,
        };
        // Judge the history as it would stand once this cancellation lands.
        let mut history = self.cancellation_history(&booking.teacher_id(), now).await?;
        history.push(record.clone());
        let recent = policy.recent_cancellation_count(actor, &history, now);
        let exceeded = policy.has_exceeded_cancellation_limit(actor, &history, now);
        if exceeded
            && record.late
            && policy.cancellation_limit_enforcement() == CancellationLimitEnforcement::Reject
        {
            let limit = policy.frequent_cancellation_limit().unwrap_or_default();
            warn!(
                booking_id = %booking.id(),
                actor_id = %actor.id,
                recent,
                limit,
                "cancellation rejected by frequent-cancellation limit"
            );
            return Err(BookingError::CancellationLimitExceeded { limit, recent });
        }
        Ok(CancellationCheck {
            record,
            recent,
            exceeded,
        })
    }

    async fn cancellation_history(
        &self,
        teacher_id: &TeacherId,
        now: DateTime<Utc>,
    ) -> Result<Vec<CancellationRecord>, BookingError> {
        let since = now - TimeDelta::days(CANCELLATION_WINDOW_DAYS);
        Ok(self
            .ports
            .bookings
            .list_cancellations(teacher_id, since)
            .await?)
    }

    /// Run a participant action on a booking under its teacher's lock.
    ///
    /// Returns the booking after the action, whether it changed, and the
    /// cancellation check when one was evaluated.
    async fn act(
        &self,
        request: BookingActionRequest,
        action: BookingAction,
    ) -> Result<(Booking, AvailabilityPolicy, bool, Option<CancellationCheck>), BookingError> {
        let booking_id = request.booking_id;
        let teacher_id = self.find_booking(booking_id).await?.teacher_id();
        let _guard = self.lock_teacher(teacher_id).await?;

        let now = self.clock.utc();
        let policy = self.load_policy(&teacher_id).await?;
        let current = self.find_booking(booking_id).await?;
        let current = self.settle_locked(current, &policy, now).await?;

        let outcome = apply_transition(
            &current,
            action,
            &Initiator::Actor(request.actor),
            policy.local_time(now),
            now,
        )
        .map_err(|err| {
            warn!(booking_id = %booking_id, action = %action, error = %err, "booking action rejected");
            BookingError::from_transition(booking_id, err)
        })?;
        if !outcome.changed {
            return Ok((outcome.booking, policy, false, None));
        }

        let check = if action == BookingAction::Cancel {
            Some(
                self.check_cancellation(&request.actor, &current, &policy, now)
                    .await?,
            )
        } else {
            None
        };
        let cancellation = check.as_ref().map(|check| check.record.clone());
        let update = StatusUpdate {
            booking: outcome.booking,
            expected: outcome.previous,
            cancellation,
        };
        if !self.ports.bookings.apply_transition(&update).await? {
            let fresh = self.find_booking(booking_id).await?;
            if fresh.status() == action.target() {
                return Ok((fresh, policy, false, None));
            }
            return Err(BookingError::InvalidTransition {
                booking_id,
                from: fresh.status(),
                action,
            });
        }

        info!(
            booking_id = %booking_id,
            teacher_id = %teacher_id,
            actor_id = %request.actor.id,
            actor_role = %request.actor.role,
            action = %action,
            "booking transition committed"
        );
        let late = check.as_ref().is_some_and(|check| check.record.late);
        self.publish(
            BookingEvent::new(
                BookingEventKind::from(action),
                &update.booking,
                Some(request.actor),
            )
            .with_late(late),
        );
        Ok((update.booking, policy, true, check))
    }
}

#[async_trait]
impl BookingCommand for BookingService {
    async fn reserve(&self, request: ReserveBookingRequest) -> Result<BookingView, BookingError> {
        if !(request.actor.is_student(&request.student_id) || request.actor.is_admin()) {
            return Err(BookingError::not_authorised(
                "reserve a booking for this student",
            ));
        }

        let (booking, policy, now) = {
            let _guard = self.lock_teacher(request.teacher_id).await?;
            let now = self.clock.utc();
            let (booking, policy) = self.reserve_locked(&request, now).await?;
            (booking, policy, now)
        };

        info!(
            booking_id = %booking.id(),
            teacher_id = %booking.teacher_id(),
            student_id = %booking.student_id(),
            slot = %booking.interval(),
            "booking reserved"
        );
        self.publish(BookingEvent::new(
            BookingEventKind::Created,
            &booking,
            Some(request.actor),
        ));
        self.view(booking, &policy, now).await
    }

    async fn confirm(&self, request: BookingActionRequest) -> Result<BookingView, BookingError> {
        let (booking, policy, _, _) = self.act(request, BookingAction::Confirm).await?;
        self.view(booking, &policy, self.clock.utc()).await
    }

    async fn decline(&self, request: BookingActionRequest) -> Result<BookingView, BookingError> {
        let (booking, policy, _, _) = self.act(request, BookingAction::Decline).await?;
        self.view(booking, &policy, self.clock.utc()).await
    }

    async fn cancel(
        &self,
        request: BookingActionRequest,
    ) -> Result<CancellationOutcome, BookingError> {
        let (booking, policy, changed, check) = self.act(request, BookingAction::Cancel).await?;
        let now = self.clock.utc();
        let (late, recent_cancellations, suspension_recommended) = match check {
            Some(check) if changed => (check.record.late, check.recent, check.exceeded),
            _ => {
                let history = self.cancellation_history(&booking.teacher_id(), now).await?;
                (
                    false,
                    policy.recent_cancellation_count(&request.actor, &history, now),
                    policy.has_exceeded_cancellation_limit(&request.actor, &history, now),
                )
            }
        };
        if suspension_recommended {
            warn!(
                booking_id = %booking.id(),
                actor_id = %request.actor.id,
                actor_role = %request.actor.role,
                recent_cancellations,
                "frequent-cancellation limit exceeded; suspension recommended"
            );
        }
        Ok(CancellationOutcome {
            booking: self.view(booking, &policy, now).await?,
            late,
            recent_cancellations,
            suspension_recommended,
        })
    }

    async fn record_payment(
        &self,
        request: RecordPaymentRequest,
    ) -> Result<PaymentLedger, BookingError> {
        let now = self.clock.utc();
        let booking = self.find_booking(request.booking_id).await?;
        if !(request.actor.is_admin() || request.actor.is_teacher(&booking.teacher_id())) {
            return Err(BookingError::not_authorised("record payments for this booking"));
        }
        if request.amount <= 0 {
            return Err(BookingError::InvalidAmount {
                amount: request.amount,
            });
        }

        let teacher_id = booking.teacher_id();
        let (booking, policy) = {
            // Declines and lazy expiry hold the same lock, so the status
            // check below stays valid until the append lands.
            let _guard = self.lock_teacher(teacher_id).await?;
            let policy = self.load_policy(&teacher_id).await?;
            let booking = self.find_booking(request.booking_id).await?;
            let booking = self.settle_locked(booking, &policy, now).await?;
            if booking.status() == BookingStatus::Declined {
                return Err(BookingError::PaymentNotAccepted {
                    booking_id: booking.id(),
                    status: booking.status(),
                });
            }

            let existing = self.ports.payments.list_for_booking(&booking.id()).await?;
            ensure_within_amount_due(booking.amount_due(), total_paid(&existing), request.amount)
                .map_err(|rejection| {
                    BookingError::from_payment_rejection(booking.id(), request.amount, rejection)
                })?;

            let record = PaymentRecord {
                id: Uuid::new_v4(),
                booking_id: booking.id(),
                amount: request.amount,
                recorded_at: now,
                recorded_by: request.actor,
            };
            match self
                .ports
                .payments
                .append_within_amount_due(&record, booking.amount_due())
                .await?
            {
                PaymentAppend::Appended => {}
                PaymentAppend::WouldOverpay { already_paid } => {
                    warn!(booking_id = %booking.id(), amount = request.amount, "payment rejected as overpayment");
                    return Err(BookingError::Overpayment {
                        booking_id: booking.id(),
                        amount_due: booking.amount_due(),
                        already_paid,
                        attempted: request.amount,
                    });
                }
            }
            (booking, policy)
        };

        info!(
            booking_id = %booking.id(),
            amount = request.amount,
            recorded_by = %request.actor.id,
            "payment recorded"
        );
        self.ledger(&booking, &policy, now).await
    }

    async fn update_availability_policy(
        &self,
        request: UpdateAvailabilityPolicyRequest,
    ) -> Result<AvailabilityPolicy, BookingError> {
        if !(request.actor.is_admin() || request.actor.is_teacher(&request.teacher_id)) {
            return Err(BookingError::not_authorised(
                "change this teacher's availability policy",
            ));
        }
        let policy = AvailabilityPolicy::try_from(request.policy)
            .map_err(|err| BookingError::invalid_request(err.to_string()))?;

        let _guard = self.lock_teacher(request.teacher_id).await?;
        self.ports
            .policies
            .save(&request.teacher_id, &policy)
            .await?;
        info!(
            teacher_id = %request.teacher_id,
            horizon_days = policy.booking_horizon_days(),
            buffer_minutes = policy.buffer().num_minutes(),
            "availability policy updated"
        );
        Ok(policy)
    }
}

#[async_trait]
impl BookingQuery for BookingService {
    async fn get_booking(
        &self,
        actor: Actor,
        booking_id: BookingId,
    ) -> Result<BookingView, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        Self::ensure_participant(&actor, &booking, "view this booking")?;
        let now = self.clock.utc();
        let policy = self.load_policy(&booking.teacher_id()).await?;
        let booking = self.settle_one(booking, &policy, now).await?;
        self.view(booking, &policy, now).await
    }

    async fn list_teacher_bookings(
        &self,
        request: ListTeacherBookingsRequest,
    ) -> Result<Vec<BookingView>, BookingError> {
        if !(request.actor.is_admin() || request.actor.is_teacher(&request.teacher_id)) {
            return Err(BookingError::not_authorised("list this teacher's bookings"));
        }
        let now = self.clock.utc();
        let policy = self.load_policy(&request.teacher_id).await?;
        let bookings = self
            .ports
            .bookings
            .list_for_teacher(&request.teacher_id, request.range, false)
            .await?;
        let bookings = self
            .settle_all(request.teacher_id, bookings, &policy, now)
            .await?;

        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            views.push(self.view(booking, &policy, now).await?);
        }
        Ok(views)
    }

    async fn list_payments(
        &self,
        actor: Actor,
        booking_id: BookingId,
    ) -> Result<PaymentLedger, BookingError> {
        let booking = self.find_booking(booking_id).await?;
        Self::ensure_participant(&actor, &booking, "view payments for this booking")?;
        let now = self.clock.utc();
        let policy = self.load_policy(&booking.teacher_id()).await?;
        let booking = self.settle_one(booking, &policy, now).await?;
        self.ledger(&booking, &policy, now).await
    }

    async fn availability_policy(
        &self,
        teacher_id: TeacherId,
    ) -> Result<AvailabilityPolicy, BookingError> {
        self.load_policy(&teacher_id).await
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
