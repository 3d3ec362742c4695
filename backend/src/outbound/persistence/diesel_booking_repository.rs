//! PostgreSQL-backed `BookingRepository`.
//!
//! Reservations take a transaction-scoped advisory lock keyed on the teacher
//! before re-reading the neighbouring bookings, so two service processes
//! cannot both insert overlapping bookings for one teacher. Status updates
//! are compare-and-set on the stored status.

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{
    BookingRepository, BookingRepositoryError, ReservationCommit, StatusUpdate,
};
use crate::domain::{
    Booking, BookingId, BookingStatus, CancellationRecord, DateRange, TeacherId, find_conflict,
};

use super::error_mapping::{decode_failure, map_diesel_error, map_pool_error};
use super::models::{BookingRow, CancellationRow, NewBookingRow, NewCancellationRow};
use super::pool::{DbPool, PoolError};
use super::schema::{booking_cancellations, bookings};

/// Serialises reservation commits per teacher until the transaction ends.
const TEACHER_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

const ACTIVE_STATUSES: [&str; 2] = [
    BookingStatus::Pending.as_str(),
    BookingStatus::Confirmed.as_str(),
];

/// Diesel implementation of the booking repository port.
#[derive(Clone)]
pub struct DieselBookingRepository {
    pool: DbPool,
}

impl DieselBookingRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> BookingRepositoryError {
    map_pool_error(error, BookingRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> BookingRepositoryError {
    map_diesel_error(
        error,
        BookingRepositoryError::query,
        BookingRepositoryError::connection,
    )
}

fn decode_rows(rows: Vec<BookingRow>) -> Result<Vec<Booking>, BookingRepositoryError> {
    rows.into_iter()
        .map(|row| {
            row.into_domain()
                .map_err(|err| BookingRepositoryError::query(err.to_string()))
        })
        .collect()
}

async fn load_active_near(
    conn: &mut AsyncPgConnection,
    booking: &Booking,
) -> Result<Vec<Booking>, diesel::result::Error> {
    // Padded intervals can reach into the neighbouring days.
    let range = DateRange::around(booking.date(), 1);
    let rows: Vec<BookingRow> = bookings::table
        .filter(bookings::teacher_id.eq(booking.teacher_id().as_uuid()))
        .filter(bookings::booking_date.between(range.first_day(), range.last_day()))
        .filter(bookings::status.eq_any(ACTIVE_STATUSES))
        .select(BookingRow::as_select())
        .load(conn)
        .await?;
    rows.into_iter()
        .map(|row| row.into_domain().map_err(decode_failure))
        .collect()
}

#[async_trait]
impl BookingRepository for DieselBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = bookings::table
            .filter(bookings::id.eq(id.as_uuid()))
            .select(BookingRow::as_select())
            .first::<BookingRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(|row| {
            row.into_domain()
                .map_err(|err| BookingRepositoryError::query(err.to_string()))
        })
        .transpose()
    }

    async fn list_for_teacher(
        &self,
        teacher_id: &TeacherId,
        range: DateRange,
        active_only: bool,
    ) -> Result<Vec<Booking>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let mut query = bookings::table
            .filter(bookings::teacher_id.eq(teacher_id.as_uuid()))
            .filter(bookings::booking_date.between(range.first_day(), range.last_day()))
            .order((bookings::booking_date.asc(), bookings::start_time.asc()))
            .select(BookingRow::as_select())
            .into_boxed();
        if active_only {
            query = query.filter(bookings::status.eq_any(ACTIVE_STATUSES));
        }

        let rows: Vec<BookingRow> = query.load(&mut conn).await.map_err(diesel_error)?;
        decode_rows(rows)
    }

    async fn commit_reservation(
        &self,
        booking: &Booking,
        buffer: TimeDelta,
    ) -> Result<ReservationCommit, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let new_row = NewBookingRow::from(booking);
        let teacher_key = booking.teacher_id().to_string();

        conn.transaction(|conn| {
            async move {
                diesel::sql_query(TEACHER_LOCK_SQL)
                    .bind::<Text, _>(&teacher_key)
                    .execute(conn)
                    .await?;

                let active = load_active_near(conn, booking).await?;
                if let Some(existing) = find_conflict(&active, &booking.interval(), buffer) {
                    return Ok(ReservationCommit::Conflict(existing.clone()));
                }

                diesel::insert_into(bookings::table)
                    .values(&new_row)
                    .execute(conn)
                    .await?;
                Ok(ReservationCommit::Committed)
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn apply_transition(
        &self,
        update: &StatusUpdate,
    ) -> Result<bool, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let booking = &update.booking;
        let cancellation = update.cancellation.as_ref().map(NewCancellationRow::from);

        conn.transaction(|conn| {
            async move {
                let changed = diesel::update(
                    bookings::table
                        .filter(bookings::id.eq(booking.id().as_uuid()))
                        .filter(bookings::status.eq(update.expected.as_str())),
                )
                .set((
                    bookings::status.eq(booking.status().as_str()),
                    bookings::updated_at.eq(booking.updated_at()),
                ))
                .execute(conn)
                .await?;
                if changed == 0 {
                    return Ok(false);
                }

                if let Some(row) = &cancellation {
                    diesel::insert_into(booking_cancellations::table)
                        .values(row)
                        .execute(conn)
                        .await?;
                }
                Ok(true)
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn list_cancellations(
        &self,
        teacher_id: &TeacherId,
        since: DateTime<Utc>,
    ) -> Result<Vec<CancellationRecord>, BookingRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows: Vec<CancellationRow> = booking_cancellations::table
            .filter(booking_cancellations::teacher_id.eq(teacher_id.as_uuid()))
            .filter(booking_cancellations::cancelled_at.gt(since))
            .order(booking_cancellations::cancelled_at.asc())
            .select(CancellationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        rows.into_iter()
            .map(|row| {
                row.into_domain()
                    .map_err(|err| BookingRepositoryError::query(err.to_string()))
            })
            .collect()
    }
}
