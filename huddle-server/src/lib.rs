//! Standalone Huddle OAuth2 authorization server
//!
//! Wires [`huddle_auth`] to in-memory storage and a user directory seeded
//! from the configuration file, and serves the OAuth endpoints together with
//! `/health` and `/ready` probes.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use huddle_server::{HuddleServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_file("huddle.toml")?;
//!     config.logging.initialize()?;
//!
//!     HuddleServer::new(config)?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod health;
pub mod middleware;
pub mod server;

pub use config::{SeedUser, ServerConfig};
pub use server::{HuddleServer, ServerError, shutdown_signal};
