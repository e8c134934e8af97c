//! Server configuration file

use crate::ServerError;
use huddle_auth::{AuthConfig, Role};
use huddle_logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use uuid::Uuid;

/// Top-level configuration, loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind: SocketAddr,

    pub auth: AuthConfig,

    pub logging: LoggingConfig,

    /// Users seeded into the in-memory directory at startup
    pub users: Vec<SeedUser>,
}

/// A user id and the role it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: Uuid,
    pub role: Role,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            users: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;

        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ServerError> {
        toml::from_str(content)
            .map_err(|e| ServerError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Validate the auth section and reject duplicate seed users
    pub fn validate(&self) -> Result<(), ServerError> {
        self.auth.validate()?;

        let mut seen = HashSet::new();
        for user in &self.users {
            if !seen.insert(user.id) {
                return Err(ServerError::Configuration(format!(
                    "User {} is listed more than once",
                    user.id
                )));
            }
        }
        Ok(())
    }
}
