//! Wire types for the device protocol and admin surface.
//!
//! The wire uses camelCase field names; internal records stay snake_case.

pub mod error;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fleetd_storage::{CommandRecord, DeviceRecord, EventRecord, NoteRecord};

// Device-facing requests

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub device_id: String,
    /// True when this call claimed the identity (first contact).
    pub claimed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub device_id: String,
    pub status: String,
}

/// One reported command outcome inside a poll request. A missing id
/// deserializes to an empty string and the entry is skipped downstream.
#[derive(Debug, Deserialize)]
pub struct PollResultEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub succeeded: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRequest {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub max_count: Option<usize>,
    #[serde(default)]
    pub results: Vec<PollResultEntry>,
}

/// A command as delivered to a device: just what it needs to execute.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireCommand {
    pub id: String,
    pub kind: String,
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PollResponse {
    pub commands: Vec<WireCommand>,
}

impl From<CommandRecord> for WireCommand {
    fn from(record: CommandRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            payload: record.payload,
        }
    }
}

// Admin-facing shapes

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub device_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub status: String,
    /// Whether a secret has been bound (never the hash itself).
    pub bound: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl From<DeviceRecord> for DeviceDto {
    fn from(record: DeviceRecord) -> Self {
        Self {
            device_id: record.device_id,
            name: record.name,
            platform: record.platform,
            app_version: record.app_version,
            ip: record.ip,
            status: record.status.to_string(),
            bound: record.secret_hash.is_some(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_seen_at: record.last_seen_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceDto>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl From<EventRecord> for EventDto {
    fn from(record: EventRecord) -> Self {
        Self {
            kind: record.kind,
            detail: record.detail,
            at: record.at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDto {
    pub author: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl From<NoteRecord> for NoteDto {
    fn from(record: NoteRecord) -> Self {
        Self {
            author: record.author,
            text: record.text,
            at: record.at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueCommandRequest {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueCommandResponse {
    pub id: String,
    pub status: String,
}

/// Full command view for the admin history endpoint, timestamps included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandHistoryDto {
    pub id: String,
    pub kind: String,
    pub payload: Value,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<CommandRecord> for CommandHistoryDto {
    fn from(record: CommandRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            payload: record.payload,
            status: record.status.as_str().to_string(),
            created_at: record.created_at,
            sent_at: record.sent_at,
            done_at: record.done_at,
            error: record.error,
        }
    }
}
