//! Port for per-teacher availability policy storage.

use async_trait::async_trait;

use crate::domain::{AvailabilityPolicy, TeacherId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by availability policy repository adapters.
    pub enum AvailabilityPolicyRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "availability policy repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "availability policy repository query failed: {message}",
    }
}

/// Port for reading and replacing a teacher's availability policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvailabilityPolicyRepository: Send + Sync {
    /// The saved policy, or `None` when the teacher uses defaults.
    async fn find_for_teacher(
        &self,
        teacher_id: &TeacherId,
    ) -> Result<Option<AvailabilityPolicy>, AvailabilityPolicyRepositoryError>;

    /// Insert or replace the teacher's policy.
    async fn save(
        &self,
        teacher_id: &TeacherId,
        policy: &AvailabilityPolicy,
    ) -> Result<(), AvailabilityPolicyRepositoryError>;
}
