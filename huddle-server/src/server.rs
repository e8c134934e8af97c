//! Server wiring: in-memory collaborators, router and lifecycle

use crate::config::ServerConfig;
use crate::health::health_router;
use crate::middleware::log_requests;
use axum::Router;
use huddle_auth::{AuthorizationServer, ConfigError, InMemoryUserDirectory, oauth};
use huddle_logging::LoggingError;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Error type for server operations
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server configuration error: {0}")]
    Configuration(String),

    #[error("Invalid auth configuration: {0}")]
    Auth(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Standalone authorization server backed by in-memory storage
pub struct HuddleServer {
    config: ServerConfig,
    auth: AuthorizationServer,
    users: Arc<InMemoryUserDirectory>,
}

impl HuddleServer {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let users = config
            .users
            .iter()
            .fold(InMemoryUserDirectory::new(), |directory, user| {
                directory.with_user(user.id, user.role.clone())
            });
        let users = Arc::new(users);
        let auth = AuthorizationServer::in_memory(config.auth.clone(), users.clone())?;

        info!(
            issuer = %config.auth.issuer,
            seeded_users = config.users.len(),
            "Authorization server configured"
        );

        Ok(Self {
            config,
            auth,
            users,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthorizationServer {
        &self.auth
    }

    /// Directory of known users; new users may be added while running
    pub fn users(&self) -> &Arc<InMemoryUserDirectory> {
        &self.users
    }

    /// OAuth endpoints plus health probes, with request logging
    pub fn router(&self) -> Router {
        oauth::oauth_router(self.auth.clone())
            .merge(health_router(self.auth.clone()))
            .layer(axum::middleware::from_fn(log_requests))
    }

    /// Bind the configured address and serve until Ctrl+C
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an existing listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = self.auth.spawn_sweeper();
        info!(address = %listener.local_addr()?, "Huddle authorization server listening");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        info!("Huddle authorization server stopped");
        result.map_err(ServerError::from)
    }
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => warn!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
