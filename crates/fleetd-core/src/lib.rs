//! Shared configuration and error types for the fleetd workspace.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
