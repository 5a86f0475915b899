//! Command queue rows and the atomic claim step.
//!
//! Commands live under composite `(device_id, seq)` keys where `seq` is a
//! global insertion counter, so a range scan over one device's prefix
//! yields its commands in creation order with ties already broken.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::store::{COMMANDS_TABLE, FleetStore, META_TABLE};

const COMMAND_SEQ: &str = "command_seq";

/// Command lifecycle status. Transitions are strictly forward:
/// queued -> sent -> done | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Queued,
    Sent,
    Done,
    Failed,
}

impl CommandStatus {
    /// Check if the command is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandStatus::Done | CommandStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandStatus::Queued => "queued",
            CommandStatus::Sent => "sent",
            CommandStatus::Done => "done",
            CommandStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One queued/delivered command. Only the queue mutates `status`; rows are
/// kept after completion as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Unique command ID.
    pub id: String,
    /// Global insertion sequence number; part of the storage key.
    pub seq: u64,
    /// Owning device.
    pub device_id: String,
    /// Command type tag, interpreted only by the device.
    pub kind: String,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    pub status: CommandStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub done_at: Option<DateTime<Utc>>,
    /// Populated only when status is failed.
    #[serde(default)]
    pub error: Option<String>,
}

impl FleetStore {
    /// Append a new queued command for a device, assigning its id and
    /// sequence number. Does not check device existence; that validation
    /// belongs to the service layer.
    pub fn append_command(
        &self,
        device_id: &str,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<CommandRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let seq = {
                let mut meta = write_txn.open_table(META_TABLE)?;
                Self::next_seq(&mut meta, COMMAND_SEQ)?
            };
            let record = CommandRecord {
                id: Uuid::new_v4().to_string(),
                seq,
                device_id: device_id.to_string(),
                kind: kind.to_string(),
                payload,
                status: CommandStatus::Queued,
                created_at: Utc::now(),
                sent_at: None,
                done_at: None,
                error: None,
            };
            let mut table = write_txn.open_table(COMMANDS_TABLE)?;
            let json = serde_json::to_string(&record)?;
            table.insert((device_id, seq), json.as_str())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Claim up to `max` queued commands for one device: select in creation
    /// order, mark each sent, return them. Runs as a single write
    /// transaction; redb serializes writers, so two concurrent claims for
    /// the same device can never hand out the same row.
    pub fn claim_queued(&self, device_id: &str, max: usize) -> Result<Vec<CommandRecord>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let write_txn = self.db.begin_write()?;
        let claimed = {
            let mut table = write_txn.open_table(COMMANDS_TABLE)?;

            let mut picked: Vec<CommandRecord> = Vec::new();
            {
                let range = table.range((device_id, 0)..=(device_id, u64::MAX))?;
                for item in range {
                    let (_key, value) = item?;
                    let record: CommandRecord = serde_json::from_str(value.value())?;
                    if record.status == CommandStatus::Queued {
                        picked.push(record);
                        if picked.len() == max {
                            break;
                        }
                    }
                }
            }

            let now = Utc::now();
            for record in &mut picked {
                record.status = CommandStatus::Sent;
                record.sent_at = Some(now);
                let json = serde_json::to_string(record)?;
                table.insert((device_id, record.seq), json.as_str())?;
            }
            picked
        };
        write_txn.commit()?;
        Ok(claimed)
    }

    /// Finalize a sent command as done or failed. Returns `false` (writing
    /// nothing) when the id is unknown for this device or the command is
    /// not currently sent — duplicate and stale reports fall through here.
    pub fn finish_command(
        &self,
        device_id: &str,
        command_id: &str,
        succeeded: bool,
        error: Option<&str>,
    ) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let finished = {
            let mut table = write_txn.open_table(COMMANDS_TABLE)?;

            let mut target: Option<CommandRecord> = None;
            {
                let range = table.range((device_id, 0)..=(device_id, u64::MAX))?;
                for item in range {
                    let (_key, value) = item?;
                    let record: CommandRecord = serde_json::from_str(value.value())?;
                    if record.id == command_id {
                        if record.status == CommandStatus::Sent {
                            target = Some(record);
                        }
                        break;
                    }
                }
            }

            match target {
                Some(mut record) => {
                    record.status = if succeeded {
                        CommandStatus::Done
                    } else {
                        CommandStatus::Failed
                    };
                    record.done_at = Some(Utc::now());
                    record.error = if succeeded {
                        None
                    } else {
                        error.map(|e| e.to_string())
                    };
                    let json = serde_json::to_string(&record)?;
                    table.insert((device_id, record.seq), json.as_str())?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(finished)
    }

    /// Load one command by id.
    pub fn load_command(&self, device_id: &str, command_id: &str) -> Result<Option<CommandRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COMMANDS_TABLE)?;

        for item in table.range((device_id, 0)..=(device_id, u64::MAX))? {
            let (_key, value) = item?;
            let record: CommandRecord = serde_json::from_str(value.value())?;
            if record.id == command_id {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// List a device's commands, newest first.
    pub fn list_commands(
        &self,
        device_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CommandRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COMMANDS_TABLE)?;

        let mut commands = Vec::new();
        for item in table.range((device_id, 0)..=(device_id, u64::MAX))? {
            let (_key, value) = item?;
            if let Ok(record) = serde_json::from_str::<CommandRecord>(value.value()) {
                commands.push(record);
            }
        }
        commands.reverse();
        commands.truncate(limit.unwrap_or(usize::MAX));
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn create_temp_store() -> (tempfile::TempDir, Arc<FleetStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = FleetStore::open(dir.path().join("fleet.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_assigns_increasing_seq() {
        let (_dir, store) = create_temp_store();

        let a = store.append_command("dev-1", "ping", json!({})).unwrap();
        let b = store.append_command("dev-2", "ping", json!({})).unwrap();
        let c = store.append_command("dev-1", "update", json!({})).unwrap();

        assert!(a.seq < b.seq);
        assert!(b.seq < c.seq);
        assert_eq!(a.status, CommandStatus::Queued);
        assert!(a.sent_at.is_none());
    }

    #[test]
    fn test_claim_marks_sent_in_order() {
        let (_dir, store) = create_temp_store();

        let a = store.append_command("dev-1", "ping", json!({})).unwrap();
        let b = store.append_command("dev-1", "update", json!({})).unwrap();

        let batch = store.claim_queued("dev-1", 1).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, a.id);
        assert_eq!(batch[0].status, CommandStatus::Sent);
        assert!(batch[0].sent_at.is_some());

        // Already-sent rows are skipped by the next claim.
        let batch = store.claim_queued("dev-1", 5).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, b.id);

        assert!(store.claim_queued("dev-1", 5).unwrap().is_empty());
    }

    #[test]
    fn test_claim_is_scoped_to_device() {
        let (_dir, store) = create_temp_store();

        store.append_command("dev-1", "ping", json!({})).unwrap();
        let other = store.append_command("dev-2", "ping", json!({})).unwrap();

        let batch = store.claim_queued("dev-1", 10).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].device_id, "dev-1");

        // dev-2's command is untouched.
        let loaded = store.load_command("dev-2", &other.id).unwrap().unwrap();
        assert_eq!(loaded.status, CommandStatus::Queued);
    }

    #[test]
    fn test_finish_requires_sent() {
        let (_dir, store) = create_temp_store();

        let cmd = store.append_command("dev-1", "ping", json!({})).unwrap();

        // Still queued: a result report is a no-op.
        assert!(!store.finish_command("dev-1", &cmd.id, true, None).unwrap());
        let loaded = store.load_command("dev-1", &cmd.id).unwrap().unwrap();
        assert_eq!(loaded.status, CommandStatus::Queued);

        store.claim_queued("dev-1", 1).unwrap();
        assert!(store.finish_command("dev-1", &cmd.id, true, None).unwrap());
        let loaded = store.load_command("dev-1", &cmd.id).unwrap().unwrap();
        assert_eq!(loaded.status, CommandStatus::Done);
        assert!(loaded.done_at.is_some());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let (_dir, store) = create_temp_store();

        let cmd = store.append_command("dev-1", "ping", json!({})).unwrap();
        store.claim_queued("dev-1", 1).unwrap();

        assert!(store
            .finish_command("dev-1", &cmd.id, false, Some("boom"))
            .unwrap());
        let first = store.load_command("dev-1", &cmd.id).unwrap().unwrap();
        assert_eq!(first.status, CommandStatus::Failed);
        assert_eq!(first.error.as_deref(), Some("boom"));

        // Second report must not touch done_at or error.
        assert!(!store.finish_command("dev-1", &cmd.id, true, None).unwrap());
        let second = store.load_command("dev-1", &cmd.id).unwrap().unwrap();
        assert_eq!(second.status, CommandStatus::Failed);
        assert_eq!(second.done_at, first.done_at);
        assert_eq!(second.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_finish_wrong_device_is_noop() {
        let (_dir, store) = create_temp_store();

        let cmd = store.append_command("dev-1", "ping", json!({})).unwrap();
        store.claim_queued("dev-1", 1).unwrap();

        assert!(!store.finish_command("dev-2", &cmd.id, true, None).unwrap());
        let loaded = store.load_command("dev-1", &cmd.id).unwrap().unwrap();
        assert_eq!(loaded.status, CommandStatus::Sent);
    }

    #[test]
    fn test_concurrent_claims_are_disjoint() {
        let (_dir, store) = create_temp_store();

        for i in 0..6 {
            store
                .append_command("dev-1", "ping", json!({ "n": i }))
                .unwrap();
        }

        let s1 = store.clone();
        let s2 = store.clone();
        let h1 = std::thread::spawn(move || s1.claim_queued("dev-1", 5).unwrap());
        let h2 = std::thread::spawn(move || s2.claim_queued("dev-1", 5).unwrap());

        let b1 = h1.join().unwrap();
        let b2 = h2.join().unwrap();

        let ids1: Vec<&str> = b1.iter().map(|c| c.id.as_str()).collect();
        for cmd in &b2 {
            assert!(!ids1.contains(&cmd.id.as_str()), "double delivery");
        }
        assert_eq!(b1.len() + b2.len(), 6);
    }

    #[test]
    fn test_list_commands_newest_first() {
        let (_dir, store) = create_temp_store();

        let a = store.append_command("dev-1", "first", json!({})).unwrap();
        let b = store.append_command("dev-1", "second", json!({})).unwrap();

        let listed = store.list_commands("dev-1", None).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);

        let limited = store.list_commands("dev-1", Some(1)).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, b.id);
    }
}
