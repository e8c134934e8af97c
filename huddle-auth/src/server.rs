//! Authorization server wiring
//!
//! [`AuthorizationServer`] builds every component once from a validated
//! [`AuthConfig`] and the injected stores, and shares them behind `Arc`s.

use crate::bearer::BearerValidator;
use crate::config::{AuthConfig, ConfigError};
use crate::error::AuthError;
use crate::grant::GrantCoordinator;
use crate::models::Actor;
use crate::permissions::{PermissionOracle, PermissionSet, ScopePolicy, StaticPermissionOracle};
use crate::registry::ClientRegistry;
use crate::revocation::RevocationService;
use crate::storage::{InMemoryOAuthStorage, OAuthStorage};
use crate::tokens::{TokenLifetimes, TokenStore};
use crate::users::UserDirectory;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

const BEARER_REALM: &str = "huddle";

/// All authorization components sharing one storage backend
#[derive(Clone)]
pub struct AuthorizationServer {
    config: Arc<AuthConfig>,
    users: Arc<dyn UserDirectory>,
    oracle: Arc<dyn PermissionOracle>,
    registry: Arc<ClientRegistry>,
    grants: Arc<GrantCoordinator>,
    tokens: Arc<TokenStore>,
    revocation: Arc<RevocationService>,
    bearer: Arc<BearerValidator>,
}

impl std::fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationServer").finish_non_exhaustive()
    }
}

impl AuthorizationServer {
    pub fn new(
        config: AuthConfig,
        storage: Arc<dyn OAuthStorage>,
        users: Arc<dyn UserDirectory>,
        oracle: Arc<dyn PermissionOracle>,
        policy: ScopePolicy,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let policy = Arc::new(policy);
        let tokens = Arc::new(TokenStore::new(
            Arc::clone(&storage),
            TokenLifetimes::from(&config),
        ));
        let revocation = Arc::new(RevocationService::new(Arc::clone(&storage)));
        let registry = Arc::new(ClientRegistry::new(
            storage,
            Arc::clone(&revocation),
            Arc::clone(&oracle),
            Arc::clone(&policy),
        ));
        let grants = Arc::new(GrantCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&tokens),
            Arc::clone(&revocation),
            Arc::clone(&oracle),
            policy,
            Arc::clone(&users),
            config.allow_implicit_grant,
        ));
        let bearer = Arc::new(BearerValidator::new(Arc::clone(&tokens), BEARER_REALM));

        info!(
            issuer = %config.issuer,
            implicit_grant = config.allow_implicit_grant,
            "Authorization server initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            users,
            oracle,
            registry,
            grants,
            tokens,
            revocation,
            bearer,
        })
    }

    /// In-memory storage with the standard roles and scope policy
    pub fn in_memory(
        config: AuthConfig,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            config,
            Arc::new(InMemoryOAuthStorage::new()),
            users,
            Arc::new(StaticPermissionOracle::standard()),
            ScopePolicy::default(),
        )
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    pub fn grants(&self) -> &Arc<GrantCoordinator> {
        &self.grants
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn revocation(&self) -> &Arc<RevocationService> {
        &self.revocation
    }

    pub fn bearer(&self) -> &Arc<BearerValidator> {
        &self.bearer
    }

    /// Look up the role of an authenticated user id
    pub async fn resolve_actor(&self, user_id: Uuid) -> Result<Actor, AuthError> {
        match self.users.role_of(user_id).await? {
            Some(role) => Ok(Actor::new(user_id, role)),
            None => {
                debug!(user_id = %user_id, "Unknown user");
                Err(AuthError::Unauthenticated)
            }
        }
    }

    pub fn permissions_of(&self, actor: &Actor) -> PermissionSet {
        self.oracle.permissions_for_role(&actor.role)
    }

    /// Start the periodic expiry sweep
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        Arc::clone(&self.tokens).spawn_sweeper(self.config.sweep_interval())
    }
}
