//! Database bootstrap and shared table plumbing.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, Table, TableDefinition};

use crate::error::Result;

// Devices table: key = device_id, value = DeviceRecord (JSON)
pub(crate) const DEVICES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("devices");

// Commands table: key = (device_id, seq), value = CommandRecord (JSON).
// Range scans over a device prefix yield commands in insertion order.
pub(crate) const COMMANDS_TABLE: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("commands");

// Device event history: key = (device_id, seq), value = EventRecord (JSON)
pub(crate) const EVENTS_TABLE: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("device_events");

// Device notes: key = (device_id, seq), value = NoteRecord (JSON)
pub(crate) const NOTES_TABLE: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("device_notes");

// Monotonic counters: "command_seq", "event_seq", "note_seq"
pub(crate) const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Registry store backed by a single redb database file.
///
/// redb admits one write transaction at a time; every multi-step mutation
/// in this crate runs inside a single write transaction, which is what
/// gives the command queue its atomic claim-and-mark-sent step.
pub struct FleetStore {
    pub(crate) db: Arc<Database>,
}

impl FleetStore {
    /// Open or create the registry database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = if path_ref.exists() {
            Database::open(path_ref)?
        } else {
            Database::create(path_ref)?
        };

        // Opening every table up front ensures they exist before the first
        // read transaction touches them.
        let write_txn = db.begin_write()?;
        {
            let _devices = write_txn.open_table(DEVICES_TABLE)?;
            let _commands = write_txn.open_table(COMMANDS_TABLE)?;
            let _events = write_txn.open_table(EVENTS_TABLE)?;
            let _notes = write_txn.open_table(NOTES_TABLE)?;
            let _meta = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Arc::new(FleetStore { db: Arc::new(db) }))
    }

    /// Advance and return the named counter. The caller holds the write
    /// transaction, so the counter update commits with the row it numbers.
    pub(crate) fn next_seq(meta: &mut Table<'_, &str, u64>, key: &str) -> Result<u64> {
        let current = meta.get(key)?.map(|v| v.value()).unwrap_or(0);
        let next = current + 1;
        meta.insert(key, next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = FleetStore::open(dir.path().join("fleet.redb")).unwrap();

        // Fresh database answers reads without table errors.
        assert_eq!(store.device_count().unwrap(), 0);
        assert!(store.load_device("nope").unwrap().is_none());
    }

    #[test]
    fn test_reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.redb");
        {
            let store = FleetStore::open(&path).unwrap();
            let record = crate::devices::DeviceRecord::new("dev-1", "Device One");
            store.save_device(&record).unwrap();
        }
        let store = FleetStore::open(&path).unwrap();
        assert!(store.device_exists("dev-1").unwrap());
    }
}
