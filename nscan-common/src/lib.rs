//! # NeuroScan Common Library
//!
//! Shared code for the NeuroScan services:
//! - Error type
//! - TOML bootstrap configuration and config file resolution
//! - Event types (NeuroScanEvent) and the EventBus
//! - Server-Sent Events helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
