//! Revocation and introspection
//!
//! RFC 7009 token revocation and RFC 7662 introspection. Revoking a refresh
//! token takes its whole family with it, which also invalidates every access
//! token minted from the same grant.

use crate::crypto::fingerprint;
use crate::error::AuthError;
use crate::models::{FamilyId, RevokedCount};
use crate::storage::{OAuthStorage, StorageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// `token_type_hint` values (RFC 7009 §2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    AccessToken,
    RefreshToken,
}

/// Introspection response (RFC 7662 §2.2)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Introspection {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl Introspection {
    pub fn inactive() -> Self {
        Self::default()
    }
}

/// A client the user has live access tokens for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedApp {
    pub client_id: String,
    pub client_name: String,
    /// Union of the scopes across the user's live tokens
    pub scopes: Vec<String>,
    pub last_issued_at: DateTime<Utc>,
    pub active_tokens: usize,
}

pub struct RevocationService {
    storage: Arc<dyn OAuthStorage>,
}

impl RevocationService {
    pub fn new(storage: Arc<dyn OAuthStorage>) -> Self {
        Self { storage }
    }

    /// Revoke whatever `token` is; unknown values are a no-op
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.revoke_owned_by(None, token, None).await
    }

    /// Revocation endpoint variant: only tokens issued to `client_id` are touched
    pub async fn revoke_as_client(
        &self,
        client_id: &str,
        token: &str,
        hint: Option<TokenTypeHint>,
    ) -> Result<(), AuthError> {
        self.revoke_owned_by(Some(client_id), token, hint).await
    }

    async fn revoke_owned_by(
        &self,
        requester: Option<&str>,
        token: &str,
        hint: Option<TokenTypeHint>,
    ) -> Result<(), AuthError> {
        let owned = |client_id: &str| requester.is_none_or(|r| r == client_id);

        let order = match hint {
            Some(TokenTypeHint::RefreshToken) => {
                [TokenTypeHint::RefreshToken, TokenTypeHint::AccessToken]
            }
            _ => [TokenTypeHint::AccessToken, TokenTypeHint::RefreshToken],
        };

        for kind in order {
            match kind {
                TokenTypeHint::AccessToken => {
                    if let Some(record) = self.storage.find_access_token(token).await? {
                        if owned(&record.client_id) {
                            self.storage.revoke_access_token(token).await?;
                            info!(
                                client_id = %record.client_id,
                                token = %fingerprint(token),
                                "Access token revoked"
                            );
                        } else {
                            debug!(token = %fingerprint(token), "Ignoring revocation of a foreign token");
                        }
                        return Ok(());
                    }
                }
                TokenTypeHint::RefreshToken => {
                    if let Some(record) = self.storage.find_refresh_token(token).await? {
                        if owned(&record.client_id) {
                            self.revoke_family(record.family_id).await?;
                        } else {
                            debug!(token = %fingerprint(token), "Ignoring revocation of a foreign token");
                        }
                        return Ok(());
                    }
                }
            }
        }

        if let Some(code) = self.storage.find_code(token).await? {
            if owned(&code.client_id) {
                self.storage.consume_code(token).await?;
                info!(client_id = %code.client_id, code = %fingerprint(token), "Authorization code revoked");
            }
        }
        Ok(())
    }

    /// Revoke every code and token in a family, including ones minted later
    pub async fn revoke_family(&self, family_id: FamilyId) -> Result<RevokedCount, AuthError> {
        let count = self.storage.revoke_family(family_id).await?;
        warn!(
            family_id = %family_id,
            access_tokens = count.access_tokens,
            refresh_tokens = count.refresh_tokens,
            "Token family revoked"
        );
        Ok(count)
    }

    pub async fn revoke_all_for_client(&self, client_id: &str) -> Result<RevokedCount, AuthError> {
        let count = self.storage.revoke_by_client(client_id).await?;
        warn!(client_id = %client_id, revoked = count.total(), "Revoked all tokens of client");
        Ok(count)
    }

    pub async fn revoke_all_for_user(
        &self,
        client_id: &str,
        user_id: Uuid,
    ) -> Result<RevokedCount, AuthError> {
        let count = self.storage.revoke_by_client_and_user(client_id, user_id).await?;
        info!(
            client_id = %client_id,
            user_id = %user_id,
            revoked = count.total(),
            "Revoked user's tokens for client"
        );
        Ok(count)
    }

    /// Never fails: anything that is not a live token is reported inactive
    pub async fn introspect(&self, token: &str) -> Introspection {
        match self.try_introspect(token).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Introspection storage failure; reporting inactive");
                Introspection::inactive()
            }
        }
    }

    async fn try_introspect(&self, token: &str) -> Result<Introspection, StorageError> {
        let now = Utc::now();

        if let Some(record) = self.storage.find_access_token(token).await? {
            if !record.is_active_at(now) {
                return Ok(Introspection::inactive());
            }
            return Ok(Introspection {
                active: true,
                scope: Some(record.scopes.to_string()),
                client_id: Some(record.client_id),
                user_id: record.user_id,
                exp: Some(record.expires_at.timestamp()),
                iat: Some(record.issued_at.timestamp()),
                token_type: Some("Bearer".to_string()),
            });
        }

        if let Some(record) = self.storage.find_refresh_token(token).await? {
            if !record.is_active_at(now) {
                return Ok(Introspection::inactive());
            }
            return Ok(Introspection {
                active: true,
                scope: Some(record.scopes.to_string()),
                client_id: Some(record.client_id),
                user_id: Some(record.user_id),
                exp: record.expires_at.map(|e| e.timestamp()),
                iat: Some(record.issued_at.timestamp()),
                token_type: Some("refresh_token".to_string()),
            });
        }

        Ok(Introspection::inactive())
    }

    /// Clients holding live access tokens for `user_id`, most recent first
    pub async fn authorized_apps(&self, user_id: Uuid) -> Result<Vec<AuthorizedApp>, AuthError> {
        let now = Utc::now();
        let tokens = self.storage.find_access_tokens_by_user(user_id).await?;

        let mut by_client: HashMap<String, AuthorizedApp> = HashMap::new();
        for token in tokens.into_iter().filter(|t| t.is_active_at(now)) {
            let app = by_client
                .entry(token.client_id.clone())
                .or_insert_with(|| AuthorizedApp {
                    client_id: token.client_id.clone(),
                    client_name: String::new(),
                    scopes: Vec::new(),
                    last_issued_at: token.issued_at,
                    active_tokens: 0,
                });
            app.active_tokens += 1;
            app.last_issued_at = app.last_issued_at.max(token.issued_at);
            for scope in token.scopes.to_names() {
                if !app.scopes.contains(&scope) {
                    app.scopes.push(scope);
                }
            }
        }

        let mut apps = Vec::with_capacity(by_client.len());
        for (client_id, mut app) in by_client {
            // Tokens can outlive a client record only until the cascade finishes
            let Some(client) = self.storage.find_client(&client_id).await? else {
                continue;
            };
            app.client_name = client.name;
            apps.push(app);
        }
        apps.sort_by(|a, b| b.last_issued_at.cmp(&a.last_issued_at));
        Ok(apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::scope::ScopeSet;
    use crate::storage::InMemoryOAuthStorage;
    use crate::tokens::{TokenLifetimes, TokenStore};

    fn setup() -> (RevocationService, TokenStore) {
        let storage: Arc<dyn OAuthStorage> = Arc::new(InMemoryOAuthStorage::new());
        (
            RevocationService::new(Arc::clone(&storage)),
            TokenStore::new(storage, TokenLifetimes::from(&AuthConfig::default())),
        )
    }

    #[tokio::test]
    async fn test_revoke_refresh_token_takes_family() {
        let (revocation, tokens) = setup();
        let family = Uuid::new_v4();
        let user = Uuid::new_v4();
        let scopes = ScopeSet::parse("read").unwrap();

        let access = tokens
            .create_access_token("client", Some(user), scopes.clone(), Some(family))
            .await
            .unwrap();
        let refresh = tokens
            .create_refresh_token("client", user, scopes, family)
            .await
            .unwrap();

        revocation.revoke(&refresh.token).await.unwrap();
        assert!(!revocation.introspect(&access.token).await.active);
        assert!(!revocation.introspect(&refresh.token).await.active);

        // Idempotent
        revocation.revoke(&refresh.token).await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_unknown_is_noop() {
        let (revocation, _) = setup();
        revocation.revoke("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_as_other_client_is_ignored() {
        let (revocation, tokens) = setup();
        let access = tokens
            .create_access_token("owner", None, ScopeSet::parse("read").unwrap(), None)
            .await
            .unwrap();

        revocation
            .revoke_as_client("intruder", &access.token, None)
            .await
            .unwrap();
        assert!(revocation.introspect(&access.token).await.active);

        revocation
            .revoke_as_client("owner", &access.token, Some(TokenTypeHint::RefreshToken))
            .await
            .unwrap();
        assert!(!revocation.introspect(&access.token).await.active);
    }

    #[tokio::test]
    async fn test_introspect_active_access_token() {
        let (revocation, tokens) = setup();
        let user = Uuid::new_v4();
        let access = tokens
            .create_access_token("client", Some(user), ScopeSet::parse("read write").unwrap(), None)
            .await
            .unwrap();

        let info = revocation.introspect(&access.token).await;
        assert!(info.active);
        assert_eq!(info.scope.as_deref(), Some("read write"));
        assert_eq!(info.client_id.as_deref(), Some("client"));
        assert_eq!(info.user_id, Some(user));
        assert_eq!(info.token_type.as_deref(), Some("Bearer"));
        assert_eq!(info.exp, Some(access.expires_at.timestamp()));
    }

    #[tokio::test]
    async fn test_inactive_serializes_minimal() {
        let json = serde_json::to_value(Introspection::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({"active": false}));
    }
}
