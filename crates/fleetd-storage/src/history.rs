//! Device audit history: events and freeform notes.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{EVENTS_TABLE, FleetStore, META_TABLE, NOTES_TABLE};

const EVENT_SEQ: &str = "event_seq";
const NOTE_SEQ: &str = "note_seq";

/// One entry in a device's audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub device_id: String,
    pub seq: u64,
    /// Event kind: "registered", "heartbeat", "status_changed",
    /// "command_enqueued", "command_done", "command_failed".
    pub kind: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

/// A freeform administrator note attached to a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub device_id: String,
    pub seq: u64,
    pub author: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl FleetStore {
    /// Append an audit event for a device.
    pub fn append_event(
        &self,
        device_id: &str,
        kind: &str,
        detail: Option<String>,
    ) -> Result<EventRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let seq = {
                let mut meta = write_txn.open_table(META_TABLE)?;
                Self::next_seq(&mut meta, EVENT_SEQ)?
            };
            let record = EventRecord {
                device_id: device_id.to_string(),
                seq,
                kind: kind.to_string(),
                detail,
                at: Utc::now(),
            };
            let mut table = write_txn.open_table(EVENTS_TABLE)?;
            let json = serde_json::to_string(&record)?;
            table.insert((device_id, seq), json.as_str())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// List a device's events, newest first.
    pub fn list_events(&self, device_id: &str, limit: Option<usize>) -> Result<Vec<EventRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for item in table.range((device_id, 0)..=(device_id, u64::MAX))? {
            let (_key, value) = item?;
            if let Ok(record) = serde_json::from_str::<EventRecord>(value.value()) {
                events.push(record);
            }
        }
        events.reverse();
        events.truncate(limit.unwrap_or(usize::MAX));
        Ok(events)
    }

    /// Append a note to a device.
    pub fn append_note(&self, device_id: &str, author: &str, text: &str) -> Result<NoteRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let seq = {
                let mut meta = write_txn.open_table(META_TABLE)?;
                Self::next_seq(&mut meta, NOTE_SEQ)?
            };
            let record = NoteRecord {
                device_id: device_id.to_string(),
                seq,
                author: author.to_string(),
                text: text.to_string(),
                at: Utc::now(),
            };
            let mut table = write_txn.open_table(NOTES_TABLE)?;
            let json = serde_json::to_string(&record)?;
            table.insert((device_id, seq), json.as_str())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// List a device's notes, newest first.
    pub fn list_notes(&self, device_id: &str, limit: Option<usize>) -> Result<Vec<NoteRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTES_TABLE)?;

        let mut notes = Vec::new();
        for item in table.range((device_id, 0)..=(device_id, u64::MAX))? {
            let (_key, value) = item?;
            if let Ok(record) = serde_json::from_str::<NoteRecord>(value.value()) {
                notes.push(record);
            }
        }
        notes.reverse();
        notes.truncate(limit.unwrap_or(usize::MAX));
        Ok(notes)
    }
}
