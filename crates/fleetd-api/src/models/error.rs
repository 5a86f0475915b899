//! Unified error handling for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use fleetd_registry::RegistryError;

/// Unified API error response with proper HTTP status codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    #[serde(skip, default = "default_status")]
    pub status: StatusCode,
}

fn default_status() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status,
        }
    }

    /// Bad request (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message, StatusCode::BAD_REQUEST)
    }

    /// Unauthorized (401).
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message, StatusCode::UNAUTHORIZED)
    }

    /// Not found (404).
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("{} not found", resource.into()),
            StatusCode::NOT_FOUND,
        )
    }

    /// Internal server error (500). The message is always opaque; the
    /// underlying cause goes to the log, never to the client.
    pub fn internal() -> Self {
        Self::new(
            "INTERNAL_ERROR",
            "internal error",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    }

    /// Service unavailable (503).
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            "SERVICE_UNAVAILABLE",
            message,
            StatusCode::SERVICE_UNAVAILABLE,
        )
    }
}

impl From<RegistryError> for ErrorResponse {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unauthorized => Self::unauthorized("invalid device credentials"),
            RegistryError::NotFound(what) => Self::not_found(what),
            RegistryError::InvalidArgument(msg) => Self::bad_request(msg),
            RegistryError::Storage(source) => {
                tracing::error!(category = "api", error = %source, "storage failure");
                Self::internal()
            }
            RegistryError::Internal(msg) => {
                tracing::error!(category = "api", error = %msg, "internal failure");
                Self::internal()
            }
        }
    }
}

impl From<fleetd_storage::Error> for ErrorResponse {
    fn from(err: fleetd_storage::Error) -> Self {
        RegistryError::Storage(err).into()
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
