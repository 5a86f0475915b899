//! The per-device command queue.
//!
//! Owns all command status transitions: queued -> sent at claim time,
//! sent -> done/failed at result ingestion. Nothing else mutates a
//! command's status.

use std::sync::Arc;

use tracing::debug;

use fleetd_storage::{CommandRecord, FleetStore};

use crate::error::{RegistryError, Result};

/// Lower clamp for the per-poll batch size.
pub const MIN_POLL_BATCH: usize = 1;

/// Enqueues, dispatches, and finalizes device commands.
#[derive(Clone)]
pub struct CommandService {
    store: Arc<FleetStore>,
    max_batch: usize,
}

impl CommandService {
    pub fn new(store: Arc<FleetStore>, max_batch: usize) -> Self {
        Self {
            store,
            max_batch: max_batch.max(MIN_POLL_BATCH),
        }
    }

    /// Enqueue a new command for an existing device.
    ///
    /// Fails `NotFound` for an unknown device and `InvalidArgument` for an
    /// empty kind or a non-object payload; nothing is written in either
    /// case.
    pub fn enqueue(
        &self,
        device_id: &str,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<CommandRecord> {
        if kind.trim().is_empty() {
            return Err(RegistryError::InvalidArgument(
                "kind must be non-empty".to_string(),
            ));
        }
        if !payload.is_object() {
            return Err(RegistryError::InvalidArgument(
                "payload must be a JSON object".to_string(),
            ));
        }
        if !self.store.device_exists(device_id)? {
            return Err(RegistryError::NotFound(format!("device {}", device_id)));
        }

        let record = self.store.append_command(device_id, kind, payload)?;
        self.store
            .append_event(device_id, "command_enqueued", Some(kind.to_string()))?;
        debug!(
            category = "commands",
            device_id,
            command_id = %record.id,
            kind,
            "command enqueued"
        );
        Ok(record)
    }

    /// Atomically claim the next batch of queued commands for a device,
    /// marking them sent. The requested count is clamped to
    /// `[1, max_batch]`.
    pub fn take_next_batch(&self, device_id: &str, requested: usize) -> Result<Vec<CommandRecord>> {
        let count = requested.clamp(MIN_POLL_BATCH, self.max_batch);
        let batch = self.store.claim_queued(device_id, count)?;
        if !batch.is_empty() {
            debug!(
                category = "commands",
                device_id,
                count = batch.len(),
                "commands dispatched"
            );
        }
        Ok(batch)
    }

    /// Record a device-reported outcome for a sent command.
    ///
    /// Returns `Ok(false)` without touching storage state when the report
    /// does not correlate to a currently-sent command of this device —
    /// duplicate, stale, and foreign reports are silently absorbed.
    pub fn record_result(
        &self,
        device_id: &str,
        command_id: &str,
        succeeded: bool,
        error: Option<&str>,
    ) -> Result<bool> {
        let recorded = self
            .store
            .finish_command(device_id, command_id, succeeded, error)?;
        if recorded {
            let kind = if succeeded {
                "command_done"
            } else {
                "command_failed"
            };
            self.store
                .append_event(device_id, kind, Some(command_id.to_string()))?;
        }
        Ok(recorded)
    }

    /// Command history for a device, newest first.
    pub fn history(&self, device_id: &str, limit: Option<usize>) -> Result<Vec<CommandRecord>> {
        if !self.store.device_exists(device_id)? {
            return Err(RegistryError::NotFound(format!("device {}", device_id)));
        }
        Ok(self.store.list_commands(device_id, limit)?)
    }
}
