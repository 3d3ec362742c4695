//! Outbound adapters implementing the booking ports.
//!
//! - **persistence**: PostgreSQL repositories using Diesel.
//! - **memory**: process-local store used when no database is configured
//!   and by tests.
//! - **events**: booking event publishers.
//! - **course_seed**: loads the in-memory course catalogue from a file.
//!
//! Adapters translate between domain types and storage; they hold no
//! scheduling rules.

pub mod course_seed;
pub mod events;
pub mod memory;
pub mod persistence;
