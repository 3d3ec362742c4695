//! PostgreSQL-backed `PaymentLedgerRepository`.
//!
//! Appends lock the booking row first, so concurrent payments for one
//! booking observe each other's totals.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{PaymentAppend, PaymentLedgerRepository, PaymentLedgerRepositoryError};
use crate::domain::{BookingId, PaymentRecord};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewPaymentRow, PaymentRow};
use super::pool::{DbPool, PoolError};
use super::schema::{booking_payments, bookings};

/// Diesel implementation of the payment ledger port.
#[derive(Clone)]
pub struct DieselPaymentLedgerRepository {
    pool: DbPool,
}

impl DieselPaymentLedgerRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> PaymentLedgerRepositoryError {
    map_pool_error(error, PaymentLedgerRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> PaymentLedgerRepositoryError {
    map_diesel_error(
        error,
        PaymentLedgerRepositoryError::query,
        PaymentLedgerRepositoryError::connection,
    )
}

#[async_trait]
impl PaymentLedgerRepository for DieselPaymentLedgerRepository {
    async fn list_for_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<PaymentRecord>, PaymentLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows: Vec<PaymentRow> = booking_payments::table
            .filter(booking_payments::booking_id.eq(booking_id.as_uuid()))
            .order((booking_payments::recorded_at.asc(), booking_payments::id.asc()))
            .select(PaymentRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;

        rows.into_iter()
            .map(|row| {
                row.into_domain()
                    .map_err(|err| PaymentLedgerRepositoryError::query(err.to_string()))
            })
            .collect()
    }

    async fn append_within_amount_due(
        &self,
        record: &PaymentRecord,
        amount_due: i64,
    ) -> Result<PaymentAppend, PaymentLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let new_row = NewPaymentRow::from(record);
        let booking_id = *record.booking_id.as_uuid();

        conn.transaction(|conn| {
            async move {
                bookings::table
                    .filter(bookings::id.eq(booking_id))
                    .select(bookings::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await?;

                // bigint sums come back as numeric; add in Rust instead.
                let amounts: Vec<i64> = booking_payments::table
                    .filter(booking_payments::booking_id.eq(booking_id))
                    .select(booking_payments::amount)
                    .load(conn)
                    .await?;
                let already_paid: i64 = amounts.iter().sum();
                if already_paid.saturating_add(new_row.amount) > amount_due {
                    return Ok(PaymentAppend::WouldOverpay { already_paid });
                }

                diesel::insert_into(booking_payments::table)
                    .values(&new_row)
                    .execute(conn)
                    .await?;
                Ok(PaymentAppend::Appended)
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }
}
