//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;

use super::middleware::admin_auth_middleware;
use super::types::{MAX_REQUEST_BODY_SIZE, ServerState};
use crate::handlers::{admin, basic, device};

/// Create the application router with a specific state.
pub fn create_router(state: ServerState) -> Router {
    // Public routes (health plus the device protocol, which carries its
    // own credentials in the body)
    let public_routes = Router::new()
        .route("/api/health", get(basic::health_handler))
        .route("/api/device/register", post(device::register_handler))
        .route("/api/device/heartbeat", post(device::heartbeat_handler))
        .route("/api/device/poll", post(device::poll_handler));

    // Admin routes (bearer token required)
    let admin_routes = Router::new()
        .route("/api/admin/devices", get(admin::list_devices_handler))
        .route("/api/admin/devices/:id", get(admin::get_device_handler))
        .route(
            "/api/admin/devices/:id/events",
            get(admin::list_events_handler),
        )
        .route(
            "/api/admin/devices/:id/notes",
            get(admin::list_notes_handler).post(admin::create_note_handler),
        )
        .route(
            "/api/admin/devices/:id/status",
            post(admin::set_status_handler),
        )
        .route(
            "/api/admin/devices/:id/commands",
            get(admin::list_commands_handler).post(admin::enqueue_command_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
