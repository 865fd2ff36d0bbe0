//! Common error types for NeuroScan

use thiserror::Error;

/// Common result type for NeuroScan operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across NeuroScan services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
