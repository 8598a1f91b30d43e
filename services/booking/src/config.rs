//! services/booking/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::{FixedOffset, Local, Offset};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub log_level: Level,
    pub booking_window_days: i64,
    /// The viewer's wall-clock offset used for day/time grouping. Slot
    /// generation upstream runs on a UTC grid; display is viewer-local,
    /// so the offset is explicit and overridable rather than implied.
    pub viewer_offset: FixedOffset,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Marketplace API Settings ---
        let api_base_url = std::env::var("MARKETPLACE_URL")
            .map_err(|_| ConfigError::MissingVar("MARKETPLACE_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let api_token = std::env::var("MARKETPLACE_TOKEN").ok();

        // --- Load Logging Settings ---
        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Booking Window Settings ---
        let booking_window_days = match std::env::var("BOOKING_WINDOW_DAYS") {
            Ok(raw) => raw.parse::<i64>().ok().filter(|days| *days > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "BOOKING_WINDOW_DAYS".to_string(),
                    format!("'{}' is not a positive number of days", raw),
                )
            })?,
            Err(_) => 30,
        };

        // --- Load Viewer Offset (defaults to the host's local offset) ---
        let viewer_offset = match std::env::var("UTC_OFFSET_MINUTES") {
            Ok(raw) => {
                let minutes = raw.parse::<i32>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "UTC_OFFSET_MINUTES".to_string(),
                        format!("'{}' is not a whole number of minutes", raw),
                    )
                })?;
                FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "UTC_OFFSET_MINUTES".to_string(),
                        format!("'{}' is out of range for a UTC offset", raw),
                    )
                })?
            }
            Err(_) => Local::now().offset().fix(),
        };

        Ok(Self {
            api_base_url,
            api_token,
            log_level,
            booking_window_days,
            viewer_offset,
        })
    }
}
