//! Shared server state.

use std::sync::Arc;

use fleetd_core::Config;
use fleetd_registry::{CommandService, IdentityService, PollService};
use fleetd_storage::FleetStore;

/// Maximum request body size (1 MB). Command payloads are small JSON
/// objects; anything larger is a client bug.
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<FleetStore>,
    pub identity: IdentityService,
    pub commands: CommandService,
    pub poll: PollService,
    /// Bearer token guarding the admin surface. `None` means the admin
    /// surface is unavailable (503), not open.
    pub admin_token: Option<String>,
}

impl ServerState {
    /// Build the full service stack from configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = FleetStore::open(config.db_path())?;
        Ok(Self::with_store(
            store,
            config.admin_token.clone(),
            config.min_secret_len,
            config.max_poll_batch,
        ))
    }

    /// Build state around an existing store. Used by tests.
    pub fn with_store(
        store: Arc<FleetStore>,
        admin_token: Option<String>,
        min_secret_len: usize,
        max_poll_batch: usize,
    ) -> Self {
        let identity = IdentityService::new(store.clone(), min_secret_len);
        let commands = CommandService::new(store.clone(), max_poll_batch);
        let poll = PollService::new(identity.clone(), commands.clone());
        Self {
            store,
            identity,
            commands,
            poll,
            admin_token,
        }
    }
}
