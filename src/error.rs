//! # Error Types
//!
//! Custom error types for the EnOcean gateway using `thiserror`.

use thiserror::Error;

use crate::eep::EepProfile;

/// Main error type for the EnOcean gateway
#[derive(Debug, Error)]
pub enum EnoceanError {
    /// ESP3 protocol errors
    #[error("ESP3 protocol error: {0}")]
    Protocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No EnOcean module found (tried: {0})")]
    SerialPortNotFound(String),

    /// Transport reported an error alongside (or instead of) data
    #[error("Transport error: {0}")]
    Transport(String),

    /// No decoder exists for this equipment profile
    #[error("Unsupported equipment profile {0}")]
    UnsupportedProfile(EepProfile),

    /// No logical device is registered for this address
    #[error("Unknown EnOcean device {0:08X}")]
    UnknownDevice(crate::esp3::EnoceanAddress),
}

/// Result type alias for the EnOcean gateway
pub type Result<T> = std::result::Result<T, EnoceanError>;
