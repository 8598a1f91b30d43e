//! services/booking/src/error.rs
//!
//! Defines the primary error type for the entire booking client.

use crate::config::ConfigError;
use tutorboard_core::ports::PortError;


/// The primary error type for the `booking` client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error raised by the interactive terminal prompts.
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Represents a standard Input/Output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
