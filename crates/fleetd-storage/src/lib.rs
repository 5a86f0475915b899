//! Persistent storage for the fleetd registry.
//!
//! A single redb database holds device records, the per-device command
//! queue, and the audit trail (events and notes). Records are stored as
//! JSON strings keyed by device id, with composite `(device_id, seq)` keys
//! where per-device range scans must preserve insertion order.

pub mod commands;
pub mod devices;
pub mod error;
pub mod history;
pub mod store;

pub use commands::{CommandRecord, CommandStatus};
pub use devices::{DeviceRecord, DeviceStatus};
pub use error::{Error, Result};
pub use history::{EventRecord, NoteRecord};
pub use store::FleetStore;
