//! Shared handler utilities.

use axum::response::Json;
use serde::Deserialize;

use crate::models::error::ErrorResponse;

/// Unified Result type for all API handlers.
pub type HandlerResult<T> = Result<Json<T>, ErrorResponse>;

/// Pagination query parameters for admin list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: usize,

    /// Items per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

impl PaginationQuery {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1)) * self.page_size
    }

    /// Validate and clamp the pagination parameters.
    pub fn validate(mut self) -> Result<Self, ErrorResponse> {
        if self.page == 0 {
            self.page = 1;
        }
        if self.page_size == 0 {
            self.page_size = default_page_size();
        }
        if self.page_size > 1000 {
            return Err(ErrorResponse::bad_request("pageSize cannot exceed 1000"));
        }
        Ok(self)
    }
}

/// Reject an empty required string field with a 400.
pub fn require_field(value: &str, name: &str) -> Result<(), ErrorResponse> {
    if value.trim().is_empty() {
        return Err(ErrorResponse::bad_request(format!(
            "{} must be non-empty",
            name
        )));
    }
    Ok(())
}
