//! Logging setup for the Huddle authorization server
//!
//! This crate provides:
//! - `tracing` subscriber initialisation in json, pretty or compact format
//! - Log sanitization that scrubs OAuth credentials from free-form messages
//!
//! # Example
//!
//! ```rust,no_run
//! use huddle_logging::{LogFormat, LoggingConfig};
//!
//! let config = LoggingConfig {
//!     level: "info".to_string(),
//!     format: LogFormat::Json,
//!     ..Default::default()
//! };
//! config.initialize().expect("Failed to initialize logging");
//!
//! tracing::info!(client_id = "c-123", "Client registered");
//! ```

pub mod sanitization;
pub mod structured;

pub use sanitization::{LogSanitizer, SanitizationConfig, get_sanitizer, init_sanitizer};
pub use structured::{LogFormat, LogOutput, LoggingConfig};

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LoggingError>;

/// Logging error types
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tracing error: {0}")]
    Tracing(String),
}

impl LoggingError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
