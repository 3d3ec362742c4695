//! Shared translation from pool and Diesel failures into port errors.
//!
//! Every booking port error has a `Connection` and a `Query` variant; the
//! helpers here pick between them so each repository only names its
//! constructors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::models::RowDecodeError;
use super::pool::PoolError;

/// Map a pool failure through the port's connection constructor.
pub(crate) fn map_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    connection(error.message().to_owned())
}

/// Map a Diesel failure to the port's query or connection constructor.
///
/// Lost connections and serialization failures are reported as connection
/// errors so callers may retry them.
pub(crate) fn map_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            connection("transaction serialization failure".to_owned())
        }
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::DeserializationError(source) => {
            query(format!("stored row is invalid: {source}"))
        }
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        _ => query("database error".to_owned()),
    }
}

/// Surface a row decode failure from inside a transaction closure.
pub(crate) fn decode_failure(error: RowDecodeError) -> DieselError {
    DieselError::DeserializationError(Box::new(error))
}
