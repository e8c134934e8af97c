//! Storage backend for clients, codes and tokens
//!
//! [`OAuthStorage`] is the persistence seam of the authorization core. Lookups
//! treat records past their expiry as absent. Consuming a code or refresh token
//! is a compare-and-swap on its `consumed` flag performed by the backend itself,
//! so concurrent consumers of one record see exactly one winner.

use crate::models::{
    AccessToken, AuthorizationCode, Client, FamilyId, RefreshToken, RevokedCount,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    General(String),
}

/// Result of a compare-and-swap consume
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome<T> {
    /// This caller flipped the record to consumed
    Consumed(T),
    /// The record had already been consumed by someone else
    AlreadyConsumed(T),
    /// No live record with that value
    Missing,
}

/// OAuth storage backend trait
#[async_trait]
pub trait OAuthStorage: Send + Sync {
    // Client operations
    async fn save_client(&self, client: &Client) -> Result<(), StorageError>;
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>, StorageError>;
    async fn find_clients_by_owner(&self, owner_id: Uuid) -> Result<Vec<Client>, StorageError>;
    async fn list_clients(&self) -> Result<Vec<Client>, StorageError>;
    /// Returns whether a record was removed
    async fn delete_client(&self, client_id: &str) -> Result<bool, StorageError>;

    // Authorization code operations
    async fn insert_code(&self, code: &AuthorizationCode) -> Result<(), StorageError>;
    async fn find_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StorageError>;
    async fn consume_code(
        &self,
        code: &str,
    ) -> Result<ConsumeOutcome<AuthorizationCode>, StorageError>;

    // Access token operations
    async fn insert_access_token(&self, token: &AccessToken) -> Result<(), StorageError>;
    /// Unexpired token, revoked or not
    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>, StorageError>;
    async fn revoke_access_token(&self, token: &str) -> Result<bool, StorageError>;
    async fn find_access_tokens_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AccessToken>, StorageError>;

    // Refresh token operations
    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError>;
    /// Unexpired token, consumed or not
    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, StorageError>;
    async fn consume_refresh_token(
        &self,
        token: &str,
    ) -> Result<ConsumeOutcome<RefreshToken>, StorageError>;

    // Bulk revocation
    /// Mark the family revoked: its codes and refresh tokens consumed, its access
    /// tokens revoked, and anything inserted into it later born revoked
    async fn revoke_family(&self, family_id: FamilyId) -> Result<RevokedCount, StorageError>;
    async fn is_family_revoked(&self, family_id: FamilyId) -> Result<bool, StorageError>;
    async fn revoke_by_client(&self, client_id: &str) -> Result<RevokedCount, StorageError>;
    async fn revoke_by_client_and_user(
        &self,
        client_id: &str,
        user_id: Uuid,
    ) -> Result<RevokedCount, StorageError>;

    // Cleanup expired entries
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError>;
}

/// In-memory OAuth storage implementation
///
/// Each table sits behind its own `RwLock`. Locks are always taken in the order
/// families, codes, access tokens, refresh tokens.
pub struct InMemoryOAuthStorage {
    clients: Arc<RwLock<HashMap<String, Client>>>,
    authorization_codes: Arc<RwLock<HashMap<String, AuthorizationCode>>>,
    access_tokens: Arc<RwLock<HashMap<String, AccessToken>>>,
    refresh_tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
    revoked_families: Arc<RwLock<HashSet<FamilyId>>>,
}

impl InMemoryOAuthStorage {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            authorization_codes: Arc::new(RwLock::new(HashMap::new())),
            access_tokens: Arc::new(RwLock::new(HashMap::new())),
            refresh_tokens: Arc::new(RwLock::new(HashMap::new())),
            revoked_families: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Revoke every record matching `predicate` and mark their families revoked
    async fn revoke_matching<F>(&self, predicate: F) -> RevokedCount
    where
        F: Fn(&str, Option<Uuid>) -> bool,
    {
        let mut families = self.revoked_families.write().await;
        let mut codes = self.authorization_codes.write().await;
        let mut access = self.access_tokens.write().await;
        let mut refresh = self.refresh_tokens.write().await;
        let mut count = RevokedCount::default();

        for code in codes.values_mut() {
            if predicate(&code.client_id, Some(code.user_id)) {
                families.insert(code.family_id);
                if !code.consumed {
                    code.consumed = true;
                    count.codes += 1;
                }
            }
        }
        for token in access.values_mut() {
            if predicate(&token.client_id, token.user_id) {
                if let Some(family_id) = token.family_id {
                    families.insert(family_id);
                }
                if !token.revoked {
                    token.revoked = true;
                    count.access_tokens += 1;
                }
            }
        }
        for token in refresh.values_mut() {
            if predicate(&token.client_id, Some(token.user_id)) {
                families.insert(token.family_id);
                if !token.consumed {
                    token.consumed = true;
                    count.refresh_tokens += 1;
                }
            }
        }

        count
    }
}

impl Default for InMemoryOAuthStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthStorage for InMemoryOAuthStorage {
    async fn save_client(&self, client: &Client) -> Result<(), StorageError> {
        let mut clients = self.clients.write().await;
        clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> Result<Option<Client>, StorageError> {
        let clients = self.clients.read().await;
        Ok(clients.get(client_id).cloned())
    }

    async fn find_clients_by_owner(&self, owner_id: Uuid) -> Result<Vec<Client>, StorageError> {
        let clients = self.clients.read().await;
        let mut owned: Vec<Client> = clients
            .values()
            .filter(|client| client.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(owned)
    }

    async fn list_clients(&self) -> Result<Vec<Client>, StorageError> {
        let clients = self.clients.read().await;
        let mut all: Vec<Client> = clients.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_client(&self, client_id: &str) -> Result<bool, StorageError> {
        let mut clients = self.clients.write().await;
        Ok(clients.remove(client_id).is_some())
    }

    async fn insert_code(&self, code: &AuthorizationCode) -> Result<(), StorageError> {
        let mut codes = self.authorization_codes.write().await;
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_code(&self, code: &str) -> Result<Option<AuthorizationCode>, StorageError> {
        let codes = self.authorization_codes.read().await;
        let now = Utc::now();
        Ok(codes
            .get(code)
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }

    async fn consume_code(
        &self,
        code: &str,
    ) -> Result<ConsumeOutcome<AuthorizationCode>, StorageError> {
        let mut codes = self.authorization_codes.write().await;
        let now = Utc::now();

        let Some(record) = codes.get_mut(code).filter(|r| !r.is_expired_at(now)) else {
            return Ok(ConsumeOutcome::Missing);
        };
        if record.consumed {
            return Ok(ConsumeOutcome::AlreadyConsumed(record.clone()));
        }
        record.consumed = true;
        Ok(ConsumeOutcome::Consumed(record.clone()))
    }

    async fn insert_access_token(&self, token: &AccessToken) -> Result<(), StorageError> {
        // Holding the family guard keeps this insert ordered against revoke_family
        let families = self.revoked_families.read().await;
        let mut tokens = self.access_tokens.write().await;

        let mut record = token.clone();
        if record.family_id.is_some_and(|family| families.contains(&family)) {
            record.revoked = true;
        }
        tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find_access_token(&self, token: &str) -> Result<Option<AccessToken>, StorageError> {
        let tokens = self.access_tokens.read().await;
        let now = Utc::now();
        Ok(tokens
            .get(token)
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }

    async fn revoke_access_token(&self, token: &str) -> Result<bool, StorageError> {
        let mut tokens = self.access_tokens.write().await;
        match tokens.get_mut(token) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_access_tokens_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AccessToken>, StorageError> {
        let tokens = self.access_tokens.read().await;
        let now = Utc::now();
        Ok(tokens
            .values()
            .filter(|record| record.user_id == Some(user_id) && !record.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError> {
        let families = self.revoked_families.read().await;
        let mut tokens = self.refresh_tokens.write().await;

        let mut record = token.clone();
        if families.contains(&record.family_id) {
            record.consumed = true;
        }
        tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, StorageError> {
        let tokens = self.refresh_tokens.read().await;
        let now = Utc::now();
        Ok(tokens
            .get(token)
            .filter(|record| !record.is_expired_at(now))
            .cloned())
    }

    async fn consume_refresh_token(
        &self,
        token: &str,
    ) -> Result<ConsumeOutcome<RefreshToken>, StorageError> {
        let mut tokens = self.refresh_tokens.write().await;
        let now = Utc::now();

        let Some(record) = tokens.get_mut(token).filter(|r| !r.is_expired_at(now)) else {
            return Ok(ConsumeOutcome::Missing);
        };
        if record.consumed {
            return Ok(ConsumeOutcome::AlreadyConsumed(record.clone()));
        }
        record.consumed = true;
        Ok(ConsumeOutcome::Consumed(record.clone()))
    }

    async fn revoke_family(&self, family_id: FamilyId) -> Result<RevokedCount, StorageError> {
        let mut families = self.revoked_families.write().await;
        families.insert(family_id);

        let mut codes = self.authorization_codes.write().await;
        let mut access = self.access_tokens.write().await;
        let mut refresh = self.refresh_tokens.write().await;
        let mut count = RevokedCount::default();

        for code in codes.values_mut() {
            if code.family_id == family_id && !code.consumed {
                code.consumed = true;
                count.codes += 1;
            }
        }
        for token in access.values_mut() {
            if token.family_id == Some(family_id) && !token.revoked {
                token.revoked = true;
                count.access_tokens += 1;
            }
        }
        for token in refresh.values_mut() {
            if token.family_id == family_id && !token.consumed {
                token.consumed = true;
                count.refresh_tokens += 1;
            }
        }

        Ok(count)
    }

    async fn is_family_revoked(&self, family_id: FamilyId) -> Result<bool, StorageError> {
        let families = self.revoked_families.read().await;
        Ok(families.contains(&family_id))
    }

    async fn revoke_by_client(&self, client_id: &str) -> Result<RevokedCount, StorageError> {
        Ok(self
            .revoke_matching(|owner, _| owner == client_id)
            .await)
    }

    async fn revoke_by_client_and_user(
        &self,
        client_id: &str,
        user_id: Uuid,
    ) -> Result<RevokedCount, StorageError> {
        Ok(self
            .revoke_matching(|owner, user| owner == client_id && user == Some(user_id))
            .await)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let mut families = self.revoked_families.write().await;
        let mut codes = self.authorization_codes.write().await;
        let mut access = self.access_tokens.write().await;
        let mut refresh = self.refresh_tokens.write().await;

        let before = codes.len() + access.len() + refresh.len();
        codes.retain(|_, code| !code.is_expired_at(now));
        access.retain(|_, token| !token.is_expired_at(now));
        refresh.retain(|_, token| !token.is_expired_at(now));
        let removed = before - (codes.len() + access.len() + refresh.len());

        // A revoked family with no surviving members can never mint again
        families.retain(|family_id| {
            codes.values().any(|c| c.family_id == *family_id)
                || access.values().any(|t| t.family_id == Some(*family_id))
                || refresh.values().any(|t| t.family_id == *family_id)
        });

        Ok(removed)
    }
}
