//! Domain services for the fleetd registry.
//!
//! Provides:
//! - Device identity with trust-on-first-use secret binding
//! - The per-device command queue (enqueue, claim, result ingestion)
//! - The poll protocol orchestrating the two per request

pub mod commands;
pub mod error;
pub mod identity;
pub mod poll;

// Re-exports
pub use commands::CommandService;
pub use error::{RegistryError, Result};
pub use identity::{AuthOutcome, IdentityService, NewRegistration};
pub use poll::{PollOutcome, PollService, ResultReport};

pub use fleetd_storage::{CommandRecord, CommandStatus, DeviceRecord, DeviceStatus, FleetStore};
