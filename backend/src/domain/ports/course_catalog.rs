//! Port for the read-only course catalogue owned by another service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CourseId, TeacherId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by course catalogue adapters.
    pub enum CourseCatalogError {
        /// Catalogue connection could not be established.
        Connection { message: String } =>
            "course catalogue connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } =>
            "course catalogue query failed: {message}",
    }
}

/// Booking-relevant course attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    /// Course identifier.
    pub id: CourseId,
    /// Teacher offering the course.
    pub teacher_id: TeacherId,
    /// Session length in minutes.
    pub duration_minutes: u32,
    /// Price per session in minor currency units.
    pub price: i64,
    /// Whether the course currently accepts bookings.
    pub is_active: bool,
}

impl CourseDetails {
    /// Whether `teacher_id` may be booked for this course.
    #[must_use]
    pub fn is_bookable_with(&self, teacher_id: &TeacherId) -> bool {
        self.is_active && self.teacher_id == *teacher_id && self.duration_minutes > 0
    }
}

/// Port for course lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Find a course by id.
    async fn find_course(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseDetails>, CourseCatalogError>;
}
