//! The device poll protocol.
//!
//! Each poll is a self-contained cycle: authenticate, ingest the results
//! the device reports for previously-sent commands, then dispatch the
//! next batch. Recording always precedes dispatch, so a command finalized
//! in this call can never be re-delivered by it.

use tracing::{debug, warn};

use fleetd_storage::CommandRecord;

use crate::commands::CommandService;
use crate::error::Result;
use crate::identity::{AuthOutcome, IdentityService};

/// A device-reported outcome for one previously-delivered command.
#[derive(Debug, Clone)]
pub struct ResultReport {
    pub command_id: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Outcome of one poll cycle.
#[derive(Debug)]
pub struct PollOutcome {
    /// How the device authenticated (verified vs first-contact claim).
    pub auth: AuthOutcome,
    /// Commands delivered in this cycle, in creation order.
    pub commands: Vec<CommandRecord>,
    /// How many reported results correlated to a sent command.
    pub recorded: usize,
}

/// Orchestrates identity verification, result ingestion, and dispatch.
#[derive(Clone)]
pub struct PollService {
    identity: IdentityService,
    commands: CommandService,
}

impl PollService {
    pub fn new(identity: IdentityService, commands: CommandService) -> Self {
        Self { identity, commands }
    }

    /// Run one poll cycle for a device.
    ///
    /// Authentication failure aborts before any queue access. Individual
    /// result entries without a command id are skipped, not fatal.
    pub fn poll(
        &self,
        device_id: &str,
        secret: &str,
        max_count: usize,
        results: &[ResultReport],
    ) -> Result<PollOutcome> {
        let auth = self.identity.authenticate(device_id, secret)?;

        let mut recorded = 0;
        for report in results {
            if report.command_id.is_empty() {
                warn!(category = "poll", device_id, "skipping result entry without id");
                continue;
            }
            if self.commands.record_result(
                device_id,
                &report.command_id,
                report.succeeded,
                report.error.as_deref(),
            )? {
                recorded += 1;
            }
        }

        let commands = self.commands.take_next_batch(device_id, max_count)?;
        debug!(
            category = "poll",
            device_id,
            recorded,
            delivered = commands.len(),
            "poll cycle complete"
        );

        Ok(PollOutcome {
            auth,
            commands,
            recorded,
        })
    }
}
