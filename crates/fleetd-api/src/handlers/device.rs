//! Device-facing protocol handlers: register, heartbeat, poll.
//!
//! Devices authenticate with credentials in the request body on every
//! call; there is no session state.

use axum::extract::State;
use axum::response::Json;
use fleetd_registry::{AuthOutcome, NewRegistration, ResultReport};
use tracing::debug;

use crate::handlers::common::{HandlerResult, require_field};
use crate::models::{
    HeartbeatRequest, HeartbeatResponse, PollRequest, PollResponse, RegisterRequest,
    RegisterResponse,
};
use crate::server::ServerState;

/// `POST /api/device/register`.
pub async fn register_handler(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> HandlerResult<RegisterResponse> {
    require_field(&req.device_id, "deviceId")?;
    require_field(&req.secret, "secret")?;
    require_field(&req.name, "name")?;

    let (record, outcome) = state.identity.register(NewRegistration {
        device_id: req.device_id,
        secret: req.secret,
        name: req.name,
        platform: req.platform,
        app_version: req.app_version,
        ip: None,
    })?;

    Ok(Json(RegisterResponse {
        device_id: record.device_id,
        claimed: outcome == AuthOutcome::Bootstrapped,
    }))
}

/// `POST /api/device/heartbeat`.
pub async fn heartbeat_handler(
    State(state): State<ServerState>,
    Json(req): Json<HeartbeatRequest>,
) -> HandlerResult<HeartbeatResponse> {
    require_field(&req.device_id, "deviceId")?;
    require_field(&req.secret, "secret")?;

    let record = state
        .identity
        .heartbeat(&req.device_id, &req.secret, req.ip.as_deref())?;

    Ok(Json(HeartbeatResponse {
        device_id: record.device_id,
        status: record.status.to_string(),
    }))
}

/// `POST /api/device/poll`.
///
/// One request/response cycle: ingest reported results, then deliver the
/// next batch of queued commands.
pub async fn poll_handler(
    State(state): State<ServerState>,
    Json(req): Json<PollRequest>,
) -> HandlerResult<PollResponse> {
    require_field(&req.device_id, "deviceId")?;
    require_field(&req.secret, "secret")?;

    let results: Vec<ResultReport> = req
        .results
        .into_iter()
        .map(|entry| ResultReport {
            command_id: entry.id,
            succeeded: entry.succeeded,
            error: entry.error,
        })
        .collect();

    let outcome = state.poll.poll(
        &req.device_id,
        &req.secret,
        req.max_count.unwrap_or(1),
        &results,
    )?;

    debug!(
        category = "api",
        device_id = %req.device_id,
        delivered = outcome.commands.len(),
        "poll served"
    );

    Ok(Json(PollResponse {
        commands: outcome.commands.into_iter().map(Into::into).collect(),
    }))
}
