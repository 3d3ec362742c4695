//! Teacher-scoped serialisation for booking mutations.
//!
//! Every mutation touching a teacher's calendar holds that teacher's lock, so
//! the availability check and the commit cannot interleave with another
//! request for the same teacher. Different teachers never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::TeacherId;

/// Registry size above which idle entries are pruned on acquire.
const PRUNE_THRESHOLD: usize = 1_024;

/// Waiting for a teacher lock took longer than the configured timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timed out after {waited:?} waiting for teacher {teacher_id}")]
pub struct LockTimeout {
    /// Contended teacher.
    pub teacher_id: TeacherId,
    /// Time spent waiting.
    pub waited: Duration,
}

/// Held lock for one teacher; released on drop.
#[derive(Debug)]
pub struct TeacherLockGuard {
    teacher_id: TeacherId,
    _guard: OwnedMutexGuard<()>,
}

impl TeacherLockGuard {
    /// Teacher the guard serialises.
    #[must_use]
    pub const fn teacher_id(&self) -> TeacherId {
        self.teacher_id
    }
}

/// Registry of per-teacher async mutexes.
#[derive(Debug, Default)]
pub struct TeacherLocks {
    locks: Mutex<HashMap<TeacherId, Arc<AsyncMutex<()>>>>,
}

impl TeacherLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `teacher_id`, waiting at most `timeout`.
    pub async fn acquire(
        &self,
        teacher_id: TeacherId,
        timeout: Duration,
    ) -> Result<TeacherLockGuard, LockTimeout> {
        let lock = self.entry(teacher_id);
        let guard = tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| LockTimeout {
                teacher_id,
                waited: timeout,
            })?;
        Ok(TeacherLockGuard {
            teacher_id,
            _guard: guard,
        })
    }

    /// Number of teachers currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry().len()
    }

    /// Whether no teacher is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    fn entry(&self, teacher_id: TeacherId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.registry();
        if locks.len() >= PRUNE_THRESHOLD {
            // Only the registry holds idle entries.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(locks.entry(teacher_id).or_default())
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<TeacherId, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
