//! Core error type shared across fleetd crates.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (unreadable or invalid config file, bad env value).
    #[error("Config error: {0}")]
    Config(String),
}
