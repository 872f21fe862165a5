//! Error handling for the port watcher
//!
//! Probe failures are not errors here: a refused or timed out connect is a
//! normal [`ProbeOutcome`](crate::network::ProbeOutcome). Read failures on the
//! state store are folded into an empty baseline. What remains are the
//! failures a caller has to see for one target's cycle.

use std::io;
use thiserror::Error;

/// Main error type for watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Port range error: {0}")]
    PortRange(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// The new baseline could not be written; the previous record stays authoritative.
    #[error("Failed to persist baseline for '{key}': {source}")]
    Persistence {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Alert delivery failed: {0}")]
    Alert(String),

    #[error("Scan cancelled")]
    Cancelled,
}

impl WatchError {
    /// Configuration problems only disqualify the affected target.
    pub fn is_config(&self) -> bool {
        matches!(self, WatchError::Config(_) | WatchError::PortRange(_) | WatchError::InvalidTarget(_))
    }
}

impl From<toml::de::Error> for WatchError {
    fn from(e: toml::de::Error) -> Self {
        WatchError::Config(format!("Failed to parse TOML: {}", e))
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(e: reqwest::Error) -> Self {
        WatchError::Alert(e.to_string())
    }
}

impl From<lettre::address::AddressError> for WatchError {
    fn from(e: lettre::address::AddressError) -> Self {
        WatchError::Config(format!("Invalid email address: {}", e))
    }
}

impl From<lettre::error::Error> for WatchError {
    fn from(e: lettre::error::Error) -> Self {
        WatchError::Alert(format!("Cannot build email: {}", e))
    }
}

impl From<lettre::transport::smtp::Error> for WatchError {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        WatchError::Alert(format!("SMTP error: {}", e))
    }
}
