//! Device identity and authentication.
//!
//! Identity is not provisioned out-of-band: the first caller to present a
//! qualifying secret for a device id claims it, and the bcrypt hash of
//! that secret becomes the reference credential (trust-on-first-use).
//! This is a deliberate trust boundary of the registry, not an oversight.

use std::sync::Arc;

use tracing::{debug, info};

use fleetd_storage::{DeviceRecord, DeviceStatus, FleetStore};

use crate::error::{RegistryError, Result};

/// How an authentication succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The supplied secret matched the stored hash.
    Verified,
    /// No hash was stored; the supplied secret claimed the identity and
    /// its hash is now persisted.
    Bootstrapped,
}

/// Registration input for [`IdentityService::register`].
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub device_id: String,
    pub secret: String,
    pub name: String,
    pub platform: Option<String>,
    pub app_version: Option<String>,
    pub ip: Option<String>,
}

/// Authenticates devices and maintains their identity records.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<FleetStore>,
    min_secret_len: usize,
}

impl IdentityService {
    pub fn new(store: Arc<FleetStore>, min_secret_len: usize) -> Self {
        Self {
            store,
            min_secret_len,
        }
    }

    /// Authenticate a device, claiming the identity on first contact.
    ///
    /// Succeeds when the stored hash verifies the secret, or when no hash
    /// exists yet and the secret meets the minimum-strength policy (it is
    /// then hashed and persisted). Bumps `last_seen_at` on success.
    pub fn authenticate(&self, device_id: &str, secret: &str) -> Result<AuthOutcome> {
        if device_id.is_empty() {
            return Err(RegistryError::InvalidArgument(
                "deviceId must be non-empty".to_string(),
            ));
        }

        match self.store.load_device(device_id)? {
            Some(mut record) => match record.secret_hash.clone() {
                Some(hash) => {
                    if !bcrypt::verify(secret, &hash).unwrap_or(false) {
                        return Err(RegistryError::Unauthorized);
                    }
                    record.touch();
                    self.store.save_device(&record)?;
                    Ok(AuthOutcome::Verified)
                }
                None => {
                    self.claim(&mut record, secret)?;
                    Ok(AuthOutcome::Bootstrapped)
                }
            },
            None => {
                // Brand-new identity: create a minimal record and claim it.
                let mut record = DeviceRecord::new(device_id, device_id);
                self.claim(&mut record, secret)?;
                info!(category = "identity", device_id, "new device claimed");
                Ok(AuthOutcome::Bootstrapped)
            }
        }
    }

    /// Register or update a device. Authenticates first (trust-on-first-use
    /// permitted), then applies the metadata fields.
    pub fn register(&self, reg: NewRegistration) -> Result<(DeviceRecord, AuthOutcome)> {
        let outcome = self.authenticate(&reg.device_id, &reg.secret)?;

        // authenticate() guarantees the record exists now.
        let mut record = self
            .store
            .load_device(&reg.device_id)?
            .ok_or_else(|| RegistryError::NotFound(format!("device {}", reg.device_id)))?;

        record.name = reg.name;
        record.platform = reg.platform;
        record.app_version = reg.app_version;
        if reg.ip.is_some() {
            record.ip = reg.ip;
        }
        record.touch();
        self.store.save_device(&record)?;
        self.store.append_event(
            &record.device_id,
            "registered",
            Some(record.name.clone()),
        )?;

        Ok((record, outcome))
    }

    /// Process a heartbeat. Unlike [`authenticate`], this never claims an
    /// identity: the device must already exist with a stored hash that
    /// verifies. Updates `last_seen_at`/`ip` and sets the device active.
    ///
    /// [`authenticate`]: IdentityService::authenticate
    pub fn heartbeat(&self, device_id: &str, secret: &str, ip: Option<&str>) -> Result<DeviceRecord> {
        let mut record = self
            .store
            .load_device(device_id)?
            .ok_or(RegistryError::Unauthorized)?;
        let hash = record
            .secret_hash
            .clone()
            .ok_or(RegistryError::Unauthorized)?;
        if !bcrypt::verify(secret, &hash).unwrap_or(false) {
            return Err(RegistryError::Unauthorized);
        }

        if let Some(ip) = ip {
            record.ip = Some(ip.to_string());
        }
        record.status = DeviceStatus::Active;
        record.touch();
        self.store.save_device(&record)?;
        self.store.append_event(device_id, "heartbeat", None)?;
        debug!(category = "identity", device_id, "heartbeat");

        Ok(record)
    }

    /// Persist the secret hash on a record without one.
    fn claim(&self, record: &mut DeviceRecord, secret: &str) -> Result<()> {
        if !self.secret_acceptable(secret) {
            return Err(RegistryError::Unauthorized);
        }
        let hash = bcrypt::hash(secret, bcrypt::DEFAULT_COST)
            .map_err(|e| RegistryError::Internal(format!("secret hashing failed: {}", e)))?;
        record.secret_hash = Some(hash);
        record.touch();
        self.store.save_device(record)?;
        Ok(())
    }

    /// Minimum-strength policy for a claiming secret.
    fn secret_acceptable(&self, secret: &str) -> bool {
        !secret.is_empty() && secret.len() >= self.min_secret_len
    }
}
