//! Device records.

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::{DEVICES_TABLE, FleetStore};

/// Administrative device status. Informational: it does not gate the
/// command queue or the poll protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Disabled,
    Retired,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "active",
            DeviceStatus::Disabled => "disabled",
            DeviceStatus::Retired => "retired",
        }
    }

    /// Parse a status name; anything outside the enum is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(DeviceStatus::Active),
            "disabled" => Some(DeviceStatus::Disabled),
            "retired" => Some(DeviceStatus::Retired),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered device identity.
///
/// `secret_hash` is a bcrypt hash set on first authenticated contact
/// (trust-on-first-use); records are never hard-deleted, retirement is a
/// status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub secret_hash: Option<String>,
    pub status: DeviceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// Create a fresh active record with no secret hash yet.
    pub fn new(device_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            device_id: device_id.into(),
            name: name.into(),
            platform: None,
            app_version: None,
            ip: None,
            secret_hash: None,
            status: DeviceStatus::Active,
            created_at: now,
            updated_at: now,
            last_seen_at: now,
        }
    }

    /// Mark a successful authenticated contact.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.last_seen_at = now;
    }
}

impl FleetStore {
    /// Save (insert or overwrite) a device record.
    pub fn save_device(&self, record: &DeviceRecord) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DEVICES_TABLE)?;
            let json = serde_json::to_string(record)?;
            table.insert(record.device_id.as_str(), json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Load a device record.
    pub fn load_device(&self, device_id: &str) -> Result<Option<DeviceRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;

        match table.get(device_id)? {
            Some(value) => {
                let record: DeviceRecord = serde_json::from_str(value.value())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Check if a device exists.
    pub fn device_exists(&self, device_id: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;
        Ok(table.get(device_id)?.is_some())
    }

    /// List all device records, ordered by device id.
    pub fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;

        let mut devices = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            if let Ok(record) = serde_json::from_str::<DeviceRecord>(value.value()) {
                devices.push(record);
            }
        }
        Ok(devices)
    }

    /// Get device count.
    pub fn device_count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;
        Ok(table.iter()?.count())
    }
}
