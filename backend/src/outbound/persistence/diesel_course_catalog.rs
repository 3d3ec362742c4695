//! PostgreSQL-backed `CourseCatalog` reading the shared `courses` table.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::CourseId;
use crate::domain::ports::{CourseCatalog, CourseCatalogError, CourseDetails};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::CourseRow;
use super::pool::{DbPool, PoolError};
use super::schema::courses;

/// Diesel implementation of the course catalogue port.
#[derive(Clone)]
pub struct DieselCourseCatalog {
    pool: DbPool,
}

impl DieselCourseCatalog {
    /// Create a catalogue over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> CourseCatalogError {
    map_pool_error(error, CourseCatalogError::connection)
}

fn diesel_error(error: diesel::result::Error) -> CourseCatalogError {
    map_diesel_error(
        error,
        CourseCatalogError::query,
        CourseCatalogError::connection,
    )
}

#[async_trait]
impl CourseCatalog for DieselCourseCatalog {
    async fn find_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseDetails>, CourseCatalogError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row = courses::table
            .filter(courses::id.eq(course_id.as_uuid()))
            .select(CourseRow::as_select())
            .first::<CourseRow>(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        row.map(|row| {
            row.into_domain()
                .map_err(|err| CourseCatalogError::query(err.to_string()))
        })
        .transpose()
    }
}
