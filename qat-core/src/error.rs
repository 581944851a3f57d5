//! Error types for the QAT device plugin.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, QatError>;

/// Step of a driver rebind that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebindPhase {
    /// Writing the address to the kernel driver's `unbind` file.
    Unbind,
    /// Registering the device with the user-space driver (`new_id` or `bind`).
    Bind,
}

impl fmt::Display for RebindPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebindPhase::Unbind => f.write_str("unbind"),
            RebindPhase::Bind => f.write_str("bind"),
        }
    }
}

/// Main error type for the plugin.
#[derive(Error, Debug)]
pub enum QatError {
    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Inventory errors
    #[error("Driver {driver} is not available at {path:?}: {source}")]
    DriverUnavailable {
        driver: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Classification errors
    #[error("Cannot obtain ID for the device {address}: {source}")]
    DeviceIdUnreadable {
        address: String,
        #[source]
        source: std::io::Error,
    },

    // Rebind errors
    #[error("{phase} failed for the device {address}: {source}")]
    RebindFailed {
        address: String,
        phase: RebindPhase,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {address} is not bound to {driver} yet")]
    NotBound { address: String, driver: String },

    // Resolution errors
    #[error("No uio handle found for the device {address}")]
    NoUioHandle { address: String },

    #[error("Invalid IOMMU group for the device {address}: {reason}")]
    InvalidIommuGroup { address: String, reason: String },

    // Allocation errors
    #[error("Device {id} is not in the current snapshot")]
    UnknownDevice { id: String },

    // File system errors
    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QatError {
    /// Create an Internal error from any error type.
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(err.to_string())
    }

    /// Label used for the `phase` dimension of the failure counter.
    pub fn phase(&self) -> &'static str {
        match self {
            QatError::InvalidConfig { .. } => "config",
            QatError::DriverUnavailable { .. } => "inventory",
            QatError::DeviceIdUnreadable { .. } => "classify",
            QatError::RebindFailed { phase: RebindPhase::Unbind, .. } => "unbind",
            QatError::RebindFailed { phase: RebindPhase::Bind, .. } | QatError::NotBound { .. } => {
                "bind"
            }
            QatError::NoUioHandle { .. } | QatError::InvalidIommuGroup { .. } => "resolve",
            QatError::UnknownDevice { .. } => "allocate",
            QatError::IoError { .. } | QatError::Internal(_) => "internal",
        }
    }
}
