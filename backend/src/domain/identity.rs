//! Identifiers and acting principals.
//!
//! Booking participants are referenced by UUID newtypes so a teacher id can
//! never be passed where a student id is expected. The acting principal for
//! each operation is supplied by the upstream identity provider and trusted
//! as-is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id! {
    /// Booking identifier.
    BookingId
}

define_id! {
    /// Teacher account identifier.
    TeacherId
}

define_id! {
    /// Student account identifier.
    StudentId
}

define_id! {
    /// Course identifier owned by the course catalogue.
    CourseId
}

/// Role of the acting principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// A student booking sessions.
    Student,
    /// A teacher owning availability and bookings.
    Teacher,
    /// An administrator acting on behalf of either party.
    Admin,
}

impl ActorRole {
    /// Stable lowercase name used in storage and headers.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown actor role: {0}")]
pub struct ParseActorRoleError(pub String);

impl FromStr for ActorRole {
    type Err = ParseActorRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseActorRoleError(s.to_owned())),
        }
    }
}

/// Authenticated principal performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Account identifier.
    pub id: Uuid,
    /// Role the account acts in.
    pub role: ActorRole,
}

impl Actor {
    /// Build a student actor.
    #[must_use]
    pub const fn student(id: StudentId) -> Self {
        Self {
            id: id.0,
            role: ActorRole::Student,
        }
    }

    /// Build a teacher actor.
    #[must_use]
    pub const fn teacher(id: TeacherId) -> Self {
        Self {
            id: id.0,
            role: ActorRole::Teacher,
        }
    }

    /// Build an administrator actor.
    #[must_use]
    pub const fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Admin,
        }
    }

    /// Whether this actor is the given teacher.
    #[must_use]
    pub fn is_teacher(&self, teacher_id: &TeacherId) -> bool {
        self.role == ActorRole::Teacher && self.id == teacher_id.0
    }

    /// Whether this actor is the given student.
    #[must_use]
    pub fn is_student(&self, student_id: &StudentId) -> bool {
        self.role == ActorRole::Student && self.id == student_id.0
    }

    /// Whether this actor is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }
}
