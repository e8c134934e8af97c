//! # Huddle OAuth2 Authorization Core
//!
//! Lets third-party applications act on behalf of chat users. The crate
//! registers clients, runs the authorization code (with PKCE), implicit,
//! refresh token and client credentials grants, resolves the scopes a user
//! can actually delegate from their role, and revokes tokens singly, per
//! grant family, per client or per user.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use huddle_auth::{AuthConfig, AuthorizationServer, InMemoryUserDirectory, Role, oauth};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let users = InMemoryUserDirectory::new().with_user(user_id, Role::admin());
//!     let server = AuthorizationServer::in_memory(AuthConfig::default(), Arc::new(users))?;
//!     let _sweeper = server.spawn_sweeper();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, oauth::oauth_router(server)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Protecting an API with issued tokens
//!
//! ```rust,ignore
//! let context = server.bearer().validate(Some(authorization_header)).await?;
//! context.require_scope(Scope::Write)?;
//! ```
//!
//! ## Security properties
//!
//! - Authorization codes and refresh tokens are single use; consumption is an
//!   atomic compare-and-swap in the storage layer
//! - Presenting a consumed code or refresh token revokes its whole token family
//! - Client secrets are stored as salted SHA-256 digests and compared in
//!   constant time
//! - Token values never reach the logs; only an 8-character fingerprint does

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::new_without_default)]

pub mod bearer;
pub mod config;
pub mod crypto;
pub mod error;
pub mod grant;
pub mod models;
pub mod oauth;
pub mod permissions;
pub mod pkce;
pub mod registry;
pub mod revocation;
pub mod scope;
pub mod server;
pub mod storage;
pub mod tokens;
pub mod users;

// Re-export main types
pub use bearer::{BearerContext, BearerError, BearerValidator};
pub use config::{AuthConfig, ConfigError};
pub use error::AuthError;
pub use grant::{
    ApprovedAuthorization, AuthorizationRequest, AuthorizeError, GrantCoordinator,
    PendingAuthorization, ResponseType, TokenGrant,
};
pub use models::{AccessToken, Actor, AuthorizationCode, Client, FamilyId, RefreshToken, RevokedCount};
pub use permissions::{
    Permission, PermissionOracle, PermissionSet, Role, ScopePolicy, StaticPermissionOracle,
};
pub use pkce::{PkceChallenge, PkceMethod};
pub use registry::{ClientPatch, ClientRegistry, NewClient, RegisteredClient};
pub use revocation::{AuthorizedApp, Introspection, RevocationService, TokenTypeHint};
pub use scope::{Scope, ScopeError, ScopeSet};
pub use server::AuthorizationServer;
pub use storage::{ConsumeOutcome, InMemoryOAuthStorage, OAuthStorage, StorageError};
pub use tokens::{TokenLifetimes, TokenStore};
pub use users::{InMemoryUserDirectory, UserDirectory};

/// Initialize default authorization configuration
pub fn default_config() -> AuthConfig {
    AuthConfig::default()
}
