//! PostgreSQL-backed `AvailabilityPolicyRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{AvailabilityPolicyRepository, AvailabilityPolicyRepositoryError};
use crate::domain::{AvailabilityPolicy, TeacherId};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{PolicyRow, PolicyUpsertRow};
use super::pool::{DbPool, PoolError};
use super::schema::availability_policies;

/// Diesel implementation of the availability policy port.
#[derive(Clone)]
pub struct DieselAvailabilityPolicyRepository {
    pool: DbPool,
}

impl DieselAvailabilityPolicyRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> AvailabilityPolicyRepositoryError {
    map_pool_error(error, AvailabilityPolicyRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> AvailabilityPolicyRepositoryError {
    map_diesel_error(
        error,
        AvailabilityPolicyRepositoryError::query,
        AvailabilityPolicyRepositoryError::connection,
    )
}

#[async_trait]
impl AvailabilityPolicyRepository for DieselAvailabilityPolicyRepository {
    async fn find_for_teacher(
        &self,
        teacher_id: &TeacherId,
    ) -> Result<Option<AvailabilityPolicy>, AvailabilityPolicyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = availability_policies::table
            .filter(availability_policies::teacher_id.eq(teacher_id.as_uuid()))
            .select(PolicyRow::as_select())
            .first::<PolicyRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(|row| {
            row.into_domain()
                .map_err(|err| AvailabilityPolicyRepositoryError::query(err.to_string()))
        })
        .transpose()
    }

    async fn save(
        &self,
        teacher_id: &TeacherId,
        policy: &AvailabilityPolicy,
    ) -> Result<(), AvailabilityPolicyRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let row = PolicyUpsertRow::new(teacher_id, policy);

        diesel::insert_into(availability_policies::table)
            .values(&row)
            .on_conflict(availability_policies::teacher_id)
            .do_update()
            .set((
                availability_policies::booking_horizon_days
                    .eq(excluded(availability_policies::booking_horizon_days)),
                availability_policies::buffer_minutes
                    .eq(excluded(availability_policies::buffer_minutes)),
                availability_policies::cancellation_deadline_hours
                    .eq(excluded(availability_policies::cancellation_deadline_hours)),
                availability_policies::frequent_cancellation_limit
                    .eq(excluded(availability_policies::frequent_cancellation_limit)),
                availability_policies::late_cancellation
                    .eq(excluded(availability_policies::late_cancellation)),
                availability_policies::cancellation_limit_enforcement
                    .eq(excluded(availability_policies::cancellation_limit_enforcement)),
                availability_policies::payment_grace_minutes
                    .eq(excluded(availability_policies::payment_grace_minutes)),
                availability_policies::utc_offset_minutes
                    .eq(excluded(availability_policies::utc_offset_minutes)),
                availability_policies::updated_at.eq(excluded(availability_policies::updated_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(diesel_error)
    }
}
