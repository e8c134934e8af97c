//! Lifecycle of codes, access tokens and refresh tokens
//!
//! The token store mints records with fresh random values and the configured
//! lifetimes, and exposes the storage's atomic consume primitives. It never
//! decides whether a grant is allowed; that is the coordinator's job.

use crate::config::AuthConfig;
use crate::crypto::{fingerprint, generate_secure_key};
use crate::models::{AccessToken, AuthorizationCode, FamilyId, RefreshToken};
use crate::pkce::PkceChallenge;
use crate::scope::ScopeSet;
use crate::storage::{ConsumeOutcome, OAuthStorage, StorageError};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifetimes applied to newly minted records
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub code: Duration,
    pub access_token: Duration,
    pub refresh_token: Option<Duration>,
}

impl From<&AuthConfig> for TokenLifetimes {
    fn from(config: &AuthConfig) -> Self {
        Self {
            code: config.code_ttl(),
            access_token: config.access_token_ttl(),
            refresh_token: config.refresh_token_ttl(),
        }
    }
}

/// Parameters of a code being issued
#[derive(Debug, Clone)]
pub struct NewCode {
    pub client_id: String,
    pub user_id: Uuid,
    pub scopes: ScopeSet,
    pub redirect_uri: String,
    pub pkce: Option<PkceChallenge>,
}

pub struct TokenStore {
    storage: Arc<dyn OAuthStorage>,
    lifetimes: TokenLifetimes,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn OAuthStorage>, lifetimes: TokenLifetimes) -> Self {
        Self { storage, lifetimes }
    }

    pub fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    /// Issue a code with a pre-assigned token family
    pub async fn create_code(&self, new: NewCode) -> Result<AuthorizationCode, StorageError> {
        let now = Utc::now();
        let code = AuthorizationCode {
            code: generate_secure_key(),
            client_id: new.client_id,
            user_id: new.user_id,
            scopes: new.scopes,
            redirect_uri: new.redirect_uri,
            pkce: new.pkce,
            family_id: Uuid::new_v4(),
            issued_at: now,
            expires_at: now + self.lifetimes.code,
            consumed: false,
        };
        self.storage.insert_code(&code).await?;

        debug!(
            client_id = %code.client_id,
            user_id = %code.user_id,
            family_id = %code.family_id,
            code = %fingerprint(&code.code),
            "Issued authorization code"
        );
        Ok(code)
    }

    /// Compare-and-swap the code's consumed flag
    pub async fn consume_code(
        &self,
        code: &str,
    ) -> Result<ConsumeOutcome<AuthorizationCode>, StorageError> {
        self.storage.consume_code(code).await
    }

    /// Unexpired code, consumed or not
    pub async fn lookup_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StorageError> {
        self.storage.find_code(code).await
    }

    pub async fn create_access_token(
        &self,
        client_id: &str,
        user_id: Option<Uuid>,
        scopes: ScopeSet,
        family_id: Option<FamilyId>,
    ) -> Result<AccessToken, StorageError> {
        let now = Utc::now();
        let token = AccessToken {
            token: generate_secure_key(),
            client_id: client_id.to_string(),
            user_id,
            scopes,
            family_id,
            issued_at: now,
            expires_at: now + self.lifetimes.access_token,
            revoked: false,
        };
        self.storage.insert_access_token(&token).await?;

        debug!(
            client_id = %client_id,
            token = %fingerprint(&token.token),
            "Issued access token"
        );
        Ok(token)
    }

    /// Refresh tokens always start a fresh lifetime, also on rotation
    pub async fn create_refresh_token(
        &self,
        client_id: &str,
        user_id: Uuid,
        scopes: ScopeSet,
        family_id: FamilyId,
    ) -> Result<RefreshToken, StorageError> {
        let now = Utc::now();
        let token = RefreshToken {
            token: generate_secure_key(),
            client_id: client_id.to_string(),
            user_id,
            scopes,
            family_id,
            issued_at: now,
            expires_at: self.lifetimes.refresh_token.map(|ttl| now + ttl),
            consumed: false,
        };
        self.storage.insert_refresh_token(&token).await?;

        debug!(
            client_id = %client_id,
            family_id = %family_id,
            token = %fingerprint(&token.token),
            "Issued refresh token"
        );
        Ok(token)
    }

    pub async fn consume_refresh_token(
        &self,
        token: &str,
    ) -> Result<ConsumeOutcome<RefreshToken>, StorageError> {
        self.storage.consume_refresh_token(token).await
    }

    /// Access token that is unexpired and not revoked
    pub async fn lookup_access_token(&self, token: &str) -> Result<Option<AccessToken>, StorageError> {
        let now = Utc::now();
        Ok(self
            .storage
            .find_access_token(token)
            .await?
            .filter(|record| record.is_active_at(now)))
    }

    /// Unexpired refresh token, consumed or not
    pub async fn lookup_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshToken>, StorageError> {
        self.storage.find_refresh_token(token).await
    }

    /// Physically remove expired records
    pub async fn expire_sweep(&self) -> Result<usize, StorageError> {
        let removed = self.storage.purge_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Expired OAuth records purged");
        }
        Ok(removed)
    }

    /// Run [`Self::expire_sweep`] on a fixed interval until the task is aborted
    pub fn spawn_sweeper(self: Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = self.expire_sweep().await {
                    warn!(error = %e, "Expiry sweep failed");
                }
            }
        })
    }
}
