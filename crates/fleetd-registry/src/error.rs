//! Registry error taxonomy.

use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Registry error types. Validation errors are raised before storage is
/// touched; storage failures wrap the underlying error for logging and are
/// surfaced to callers as an opaque server error.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Bad or missing credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Unknown device or command reference.
    #[error("{0} not found")]
    NotFound(String),

    /// Malformed or missing required field, invalid enum value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] fleetd_storage::Error),

    /// Unexpected internal failure (e.g. hashing).
    #[error("internal error: {0}")]
    Internal(String),
}
