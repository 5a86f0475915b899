//! API request handlers.

pub mod admin;
pub mod basic;
pub mod common;
pub mod device;
