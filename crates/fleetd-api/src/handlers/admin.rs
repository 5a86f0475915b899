//! Admin surface: device inventory, audit history, notes, status, and the
//! command queue entry point.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use fleetd_storage::DeviceStatus;
use serde::Deserialize;
use tracing::info;

use crate::handlers::common::{HandlerResult, PaginationQuery, require_field};
use crate::models::error::ErrorResponse;
use crate::models::{
    CommandHistoryDto, CreateNoteRequest, DeviceDto, DeviceListResponse, EnqueueCommandRequest,
    EnqueueCommandResponse, EventDto, NoteDto, SetStatusRequest,
};
use crate::server::ServerState;

/// Filter parameters for the device list. Pagination fields are inlined
/// because the query-string deserializer cannot flatten nested structs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListFilter {
    /// Free-text filter over device id and name.
    #[serde(default)]
    pub query: Option<String>,
    /// Exact status filter.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

/// `GET /api/admin/devices`.
pub async fn list_devices_handler(
    State(state): State<ServerState>,
    Query(filter): Query<DeviceListFilter>,
) -> HandlerResult<DeviceListResponse> {
    let pagination = PaginationQuery {
        page: filter.page,
        page_size: filter.page_size,
    }
    .validate()?;

    let status = match filter.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(DeviceStatus::parse(raw).ok_or_else(|| {
            ErrorResponse::bad_request(format!("unknown status: {}", raw))
        })?),
        None => None,
    };

    let needle = filter
        .query
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    let mut devices: Vec<DeviceDto> = state
        .store
        .list_devices()?
        .into_iter()
        .filter(|d| status.is_none_or(|s| d.status == s))
        .filter(|d| {
            needle.is_empty()
                || d.device_id.to_lowercase().contains(&needle)
                || d.name.to_lowercase().contains(&needle)
        })
        .map(Into::into)
        .collect();

    let total = devices.len();
    let start = pagination.offset().min(total);
    let end = (start + pagination.page_size).min(total);
    devices = devices.drain(start..end).collect();

    Ok(Json(DeviceListResponse {
        devices,
        total,
        page: pagination.page,
        page_size: pagination.page_size,
    }))
}

/// `GET /api/admin/devices/:id`.
pub async fn get_device_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
) -> HandlerResult<DeviceDto> {
    let record = state
        .store
        .load_device(&device_id)?
        .ok_or_else(|| ErrorResponse::not_found(format!("device {}", device_id)))?;
    Ok(Json(record.into()))
}

/// `GET /api/admin/devices/:id/events` (newest first).
pub async fn list_events_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
) -> HandlerResult<Vec<EventDto>> {
    if !state.store.device_exists(&device_id)? {
        return Err(ErrorResponse::not_found(format!("device {}", device_id)));
    }
    let events = state.store.list_events(&device_id, Some(200))?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

/// `GET /api/admin/devices/:id/notes`.
pub async fn list_notes_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
) -> HandlerResult<Vec<NoteDto>> {
    if !state.store.device_exists(&device_id)? {
        return Err(ErrorResponse::not_found(format!("device {}", device_id)));
    }
    let notes = state.store.list_notes(&device_id, Some(200))?;
    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

/// `POST /api/admin/devices/:id/notes`.
pub async fn create_note_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
    Json(req): Json<CreateNoteRequest>,
) -> HandlerResult<NoteDto> {
    require_field(&req.author, "author")?;
    require_field(&req.text, "text")?;
    if !state.store.device_exists(&device_id)? {
        return Err(ErrorResponse::not_found(format!("device {}", device_id)));
    }
    let note = state.store.append_note(&device_id, &req.author, &req.text)?;
    Ok(Json(note.into()))
}

/// `POST /api/admin/devices/:id/status`.
pub async fn set_status_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> HandlerResult<DeviceDto> {
    let status = DeviceStatus::parse(&req.status)
        .ok_or_else(|| ErrorResponse::bad_request(format!("unknown status: {}", req.status)))?;

    let mut record = state
        .store
        .load_device(&device_id)?
        .ok_or_else(|| ErrorResponse::not_found(format!("device {}", device_id)))?;

    if record.status != status {
        let previous = record.status;
        record.status = status;
        record.updated_at = chrono::Utc::now();
        state.store.save_device(&record)?;
        state.store.append_event(
            &device_id,
            "status_changed",
            Some(format!("{} -> {}", previous, status)),
        )?;
        info!(category = "admin", device_id = %device_id, status = %status, "device status changed");
    }

    Ok(Json(record.into()))
}

/// `POST /api/admin/devices/:id/commands` (the only way work enters the
/// queue).
pub async fn enqueue_command_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
    Json(req): Json<EnqueueCommandRequest>,
) -> HandlerResult<EnqueueCommandResponse> {
    let payload = req.payload.unwrap_or_else(|| serde_json::json!({}));
    let record = state.commands.enqueue(&device_id, &req.kind, payload)?;
    Ok(Json(EnqueueCommandResponse {
        id: record.id,
        status: record.status.as_str().to_string(),
    }))
}

/// `GET /api/admin/devices/:id/commands` (newest first).
pub async fn list_commands_handler(
    State(state): State<ServerState>,
    Path(device_id): Path<String>,
) -> HandlerResult<Vec<CommandHistoryDto>> {
    let commands = state.commands.history(&device_id, Some(200))?;
    Ok(Json(commands.into_iter().map(Into::into).collect()))
}
