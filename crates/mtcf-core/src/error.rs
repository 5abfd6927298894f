//! Error types for the MTCF system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for MTCF operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the MTCF system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing keys, unsupported mode, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bootstrap credential validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The connectivity handle used for discovery or DNS access is unusable
    #[error("Connection lost: {0}")]
    Connection(String),

    /// I/O errors (config file, dns.json)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a connection-lost error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether this error moves the process into a terminal state.
    ///
    /// Everything else is resolved by its owning component (logged and
    /// retried on the next cycle).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Validation(_) | Self::Config(_))
    }
}
