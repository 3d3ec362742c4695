//! Shared request parsing helpers for the booking handlers.
//!
//! Failures become `invalid_request` errors whose details name the offending
//! field, the raw value, and a stable code.

use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{DateRange, Error};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationCode {
    MissingField,
    InvalidUuid,
    InvalidDate,
    InvalidTime,
    InvalidRange,
}

impl ValidationCode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidDate => "invalid_date",
            Self::InvalidTime => "invalid_time",
            Self::InvalidRange => "invalid_range",
        }
    }
}

/// Newtype wrapper for JSON field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    const fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ValidationCode, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    Error::invalid_request(format!("missing required field: {name}")).with_details(json!({
        "field": name,
        "code": ValidationCode::MissingField.as_str(),
    }))
}

pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ValidationCode::InvalidUuid,
            value,
        )
    })
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        field_error(
            field,
            format!("{} must be a date in YYYY-MM-DD form", field.as_str()),
            ValidationCode::InvalidDate,
            value,
        )
    })
}

/// Parse a wall-clock time in `HH:MM` or `HH:MM:SS` form.
pub(crate) fn parse_time(value: &str, field: FieldName) -> Result<NaiveTime, Error> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            field_error(
                field,
                format!("{} must be a time in HH:MM form", field.as_str()),
                ValidationCode::InvalidTime,
                value,
            )
        })
}

/// Build a listing range from two inclusive dates.
pub(crate) fn parse_range(from: &str, to: &str) -> Result<DateRange, Error> {
    let first = parse_date(from, FieldName::new("from"))?;
    let last = parse_date(to, FieldName::new("to"))?;
    DateRange::new(first, last).ok_or_else(|| {
        Error::invalid_request(format!(
            "to must not precede from and the range may span at most {} days",
            DateRange::MAX_DAYS
        ))
        .with_details(json!({
            "field": "to",
            "value": to,
            "code": ValidationCode::InvalidRange.as_str(),
        }))
    })
}
