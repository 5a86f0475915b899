//! Admin authentication middleware.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::models::error::ErrorResponse;
use crate::server::ServerState;

/// Check the bearer token on an admin request.
///
/// No configured token means the admin surface is unavailable, not open:
/// 503, never a pass-through.
pub fn check_admin_auth(state: &ServerState, headers: &HeaderMap) -> Result<(), ErrorResponse> {
    let expected = state.admin_token.as_deref().ok_or_else(|| {
        ErrorResponse::service_unavailable("admin access is not configured")
    })?;

    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if token == expected => Ok(()),
        _ => {
            warn!(category = "auth", "admin request rejected");
            Err(ErrorResponse::unauthorized("invalid admin token"))
        }
    }
}

/// Bearer token middleware for the admin route group.
pub async fn admin_auth_middleware(
    State(state): State<ServerState>,
    headers: HeaderMap,
    req: axum::extract::Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    check_admin_auth(&state, &headers)?;
    Ok(next.run(req).await)
}
