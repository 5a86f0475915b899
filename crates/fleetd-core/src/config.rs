//! Server configuration.
//!
//! Loaded from an optional TOML file, then overridden by `FLEETD_*`
//! environment variables so container deployments need no config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable names recognised by [`Config::load`].
pub mod env_vars {
    pub const HOST: &str = "FLEETD_HOST";
    pub const PORT: &str = "FLEETD_PORT";
    pub const DATA_DIR: &str = "FLEETD_DATA_DIR";
    pub const ADMIN_TOKEN: &str = "FLEETD_ADMIN_TOKEN";
    pub const MIN_SECRET_LEN: &str = "FLEETD_MIN_SECRET_LEN";
    pub const MAX_POLL_BATCH: &str = "FLEETD_MAX_POLL_BATCH";
}

/// Default minimum length a device secret must have to claim an identity.
pub const DEFAULT_MIN_SECRET_LEN: usize = 8;

/// Default upper bound for commands delivered per poll.
pub const DEFAULT_MAX_POLL_BATCH: usize = 20;

/// fleetd server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host to bind the HTTP server to.
    pub host: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding the registry database.
    pub data_dir: PathBuf,
    /// Bearer token for the admin API. Admin endpoints answer 503 until set.
    pub admin_token: Option<String>,
    /// Minimum secret length accepted for a trust-on-first-use claim.
    pub min_secret_len: usize,
    /// Upper clamp for the per-poll command batch size.
    pub max_poll_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9170,
            data_dir: PathBuf::from("data"),
            admin_token: None,
            min_secret_len: DEFAULT_MIN_SECRET_LEN,
            max_poll_batch: DEFAULT_MAX_POLL_BATCH,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the TOML file (if given and it
    /// exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                toml::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {}", p.display(), e)))?
            }
            Some(p) => {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `FLEETD_*` environment overrides in place.
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var(env_vars::HOST) {
            self.host = host;
        }
        if let Ok(port) = std::env::var(env_vars::PORT) {
            self.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid {}: {}", env_vars::PORT, port)))?;
        }
        if let Ok(dir) = std::env::var(env_vars::DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(token) = std::env::var(env_vars::ADMIN_TOKEN) {
            if !token.is_empty() {
                self.admin_token = Some(token);
            }
        }
        if let Ok(len) = std::env::var(env_vars::MIN_SECRET_LEN) {
            self.min_secret_len = len.parse().map_err(|_| {
                Error::Config(format!("invalid {}: {}", env_vars::MIN_SECRET_LEN, len))
            })?;
        }
        if let Ok(max) = std::env::var(env_vars::MAX_POLL_BATCH) {
            self.max_poll_batch = max.parse().map_err(|_| {
                Error::Config(format!("invalid {}: {}", env_vars::MAX_POLL_BATCH, max))
            })?;
        }
        Ok(())
    }

    /// Path of the registry database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("fleet.redb")
    }
}
