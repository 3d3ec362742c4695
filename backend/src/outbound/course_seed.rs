//! Course catalogue seeding for the in-memory deployment.
//!
//! Courses belong to an external catalogue service. Without a database the
//! binary loads them from a JSON file (an array of [`CourseDetails`] in
//! camelCase) so reservations have something to book.

use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use thiserror::Error;
use tracing::info;

use crate::domain::ports::CourseDetails;
use crate::outbound::memory::InMemoryBookingStore;

/// Errors raised while loading a course catalogue file.
#[derive(Debug, Error)]
pub enum CourseSeedError {
    /// The file could not be read.
    #[error("failed to read course catalogue at {path}: {source}")]
    Read {
        /// Path to the catalogue file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a JSON array of courses.
    #[error("invalid course catalogue at {path}: {source}")]
    Parse {
        /// Path to the catalogue file.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Read the courses listed in `path`.
///
/// # Errors
///
/// [`CourseSeedError::Read`] when the file cannot be opened and
/// [`CourseSeedError::Parse`] when it does not decode.
pub fn load_course_catalog(path: &Path) -> Result<Vec<CourseDetails>, CourseSeedError> {
    let read_error = |source| CourseSeedError::Read {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| {
        read_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "course catalogue path must be a file",
        ))
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
    let payload = dir.read(Path::new(file_name)).map_err(read_error)?;
    serde_json::from_slice(&payload).map_err(|source| CourseSeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `path` into `store`, returning how many courses were registered.
///
/// # Errors
///
/// Propagates [`load_course_catalog`] failures; the store is untouched then.
pub fn seed_courses(store: &InMemoryBookingStore, path: &Path) -> Result<usize, CourseSeedError> {
    let courses = load_course_catalog(path)?;
    let count = courses.len();
    for course in courses {
        store.upsert_course(course);
    }
    info!(path = %path.display(), count, "course catalogue seeded");
    Ok(count)
}
