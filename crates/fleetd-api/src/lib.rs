//! HTTP layer for the fleetd registry.
//!
//! Exposes the device-facing protocol (register, heartbeat, poll) and the
//! token-guarded admin surface over axum. All domain logic lives in
//! `fleetd-registry`; this crate only translates between wire shapes and
//! service calls.

pub mod handlers;
pub mod models;
pub mod server;

pub use models::error::ErrorResponse;
pub use server::{ServerState, create_router, run};
