//! Authorization server configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Header the upstream session layer sets to the authenticated user's id
pub const DEFAULT_USER_HEADER: &str = "x-huddle-user";

const DEFAULT_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("authorization_code_ttl_secs must be within 60..=600, got {0}")]
    CodeTtlOutOfRange(u64),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),
}

/// Authorization server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer identifier advertised in discovery metadata
    pub issuer: String,
    /// Authorization code lifetime in seconds
    pub authorization_code_ttl_secs: u64,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (`None` for non-expiring)
    pub refresh_token_ttl_secs: Option<u64>,
    /// Accept `response_type=token`
    pub allow_implicit_grant: bool,
    /// Interval between expiry sweeps in seconds
    pub sweep_interval_secs: u64,
    /// Trusted header carrying the authenticated user id
    pub user_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:3000".to_string(),
            authorization_code_ttl_secs: 300,  // 5 minutes
            access_token_ttl_secs: 3600,       // 1 hour
            refresh_token_ttl_secs: Some(DEFAULT_REFRESH_TTL_SECS),
            allow_implicit_grant: true,
            sweep_interval_secs: 60,
            user_header: DEFAULT_USER_HEADER.to_string(),
        }
    }
}

impl AuthConfig {
    /// Configuration with a specific issuer
    pub fn with_issuer(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Default::default()
        }
    }

    /// Reject out-of-range lifetimes and a malformed issuer
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(60..=600).contains(&self.authorization_code_ttl_secs) {
            return Err(ConfigError::CodeTtlOutOfRange(
                self.authorization_code_ttl_secs,
            ));
        }
        if self.access_token_ttl_secs == 0 {
            return Err(ConfigError::ZeroDuration("access_token_ttl_secs"));
        }
        if self.refresh_token_ttl_secs == Some(0) {
            return Err(ConfigError::ZeroDuration("refresh_token_ttl_secs"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("sweep_interval_secs"));
        }
        url::Url::parse(&self.issuer)
            .map_err(|e| ConfigError::InvalidIssuer(format!("{}: {e}", self.issuer)))?;
        Ok(())
    }

    pub fn code_ttl(&self) -> Duration {
        Duration::seconds(self.authorization_code_ttl_secs as i64)
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl_secs as i64)
    }

    pub fn refresh_token_ttl(&self) -> Option<Duration> {
        self.refresh_token_ttl_secs
            .map(|secs| Duration::seconds(secs as i64))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    /// Issuer without a trailing slash, for building endpoint URLs
    pub fn issuer_base(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }
}
