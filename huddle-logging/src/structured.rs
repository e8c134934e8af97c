//! Subscriber configuration
//!
//! `RUST_LOG` takes precedence over the configured level so operators can
//! raise verbosity for a single module without touching the config file.

use crate::{LoggingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logging section of the server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `huddle_auth=debug,info`
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pretty")]
    Pretty,
    #[serde(rename = "compact")]
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[serde(rename = "stderr")]
    Stderr,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            output: LogOutput::Stdout,
        }
    }
}

impl LoggingConfig {
    /// Build the filter from `RUST_LOG`, falling back to the configured level
    pub fn env_filter(&self) -> Result<tracing_subscriber::EnvFilter> {
        use tracing_subscriber::EnvFilter;

        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| LoggingError::config(format!("Invalid log level '{}': {e}", self.level)))
    }

    /// Install the global subscriber
    ///
    /// Fails if the level is not a valid filter directive or a global
    /// subscriber has already been set.
    pub fn initialize(&self) -> Result<()> {
        use tracing_subscriber::{fmt, prelude::*};

        let filter = self.env_filter()?;
        let registry = tracing_subscriber::registry().with(filter);

        let result = match (self.format, self.output) {
            (LogFormat::Json, LogOutput::Stdout) => registry.with(fmt::layer().json()).try_init(),
            (LogFormat::Json, LogOutput::Stderr) => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            (LogFormat::Pretty, LogOutput::Stdout) => {
                registry.with(fmt::layer().pretty()).try_init()
            }
            (LogFormat::Pretty, LogOutput::Stderr) => registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            (LogFormat::Compact, LogOutput::Stdout) => {
                registry.with(fmt::layer().compact()).try_init()
            }
            (LogFormat::Compact, LogOutput::Stderr) => registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };

        result.map_err(|e| LoggingError::Tracing(e.to_string()))
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
        };
        f.write_str(name)
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(LoggingError::config(format!("Unknown log format: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.output, LogOutput::Stdout);
    }

    #[test]
    fn test_log_format_serialization() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        assert_eq!(
            serde_json::to_string(&LogFormat::Compact).unwrap(),
            "\"compact\""
        );

        let config: LoggingConfig =
            serde_json::from_str(r#"{"format": "json", "output": "stderr"}"#).unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());

        for format in [LogFormat::Json, LogFormat::Pretty, LogFormat::Compact] {
            assert_eq!(format.to_string().parse::<LogFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_invalid_level_rejected() {
        // Only meaningful when RUST_LOG does not mask the configured level
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "huddle_auth=notalevel".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.env_filter(), Err(LoggingError::Config(_))));
    }
}
