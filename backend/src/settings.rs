//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `BOOKING_*` environment variables, command-line flags,
//! or a configuration file. Every field is optional; accessors supply the
//! defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not a socket address.
    #[error("invalid bind address {value:?}: {message}")]
    BindAddress { value: String, message: String },
    /// A numeric setting must be positive.
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

/// Runtime settings for the booking service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BOOKING")]
pub struct BookingSettings {
    /// Socket address the HTTP server listens on.
    pub bind_address: Option<String>,
    /// PostgreSQL connection string; in-memory storage when absent.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub database_max_connections: Option<u32>,
    /// How long a request waits for a teacher's calendar lock.
    pub reservation_lock_timeout_ms: Option<u64>,
    /// JSON file of courses to load when running without a database.
    /// Without it the in-memory catalogue is empty and every reservation
    /// reports the course as unavailable.
    pub course_catalog_path: Option<PathBuf>,
}

impl BookingSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// [`SettingsError::BindAddress`] when the value does not parse.
    pub fn bind_address(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddress {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Configured database URL, ignoring blank values.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Course catalogue file for in-memory mode, if configured.
    pub fn course_catalog_path(&self) -> Option<&Path> {
        self.course_catalog_path
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Pool size.
    ///
    /// # Errors
    ///
    /// [`SettingsError::NotPositive`] for zero.
    pub fn database_max_connections(&self) -> Result<u32, SettingsError> {
        match self.database_max_connections {
            Some(0) => Err(SettingsError::NotPositive {
                field: "database_max_connections",
            }),
            Some(value) => Ok(value),
            None => Ok(DEFAULT_MAX_CONNECTIONS),
        }
    }

    /// Lock wait bound for teacher-scoped mutations.
    ///
    /// # Errors
    ///
    /// [`SettingsError::NotPositive`] for zero.
    pub fn reservation_lock_timeout(&self) -> Result<Duration, SettingsError> {
        match self.reservation_lock_timeout_ms {
            Some(0) => Err(SettingsError::NotPositive {
                field: "reservation_lock_timeout_ms",
            }),
            Some(ms) => Ok(Duration::from_millis(ms)),
            None => Ok(Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS)),
        }
    }
}
