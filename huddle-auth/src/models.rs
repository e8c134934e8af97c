//! Logical records of the authorization core
//!
//! These are the shapes persisted through [`crate::storage::OAuthStorage`]. How a
//! backend lays them out is its own business.

use crate::crypto::SecretDigest;
use crate::permissions::Role;
use crate::pkce::PkceChallenge;
use crate::scope::ScopeSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lineage of tokens descending from one original grant
pub type FamilyId = Uuid;

/// An authenticated user acting on the management API or approving a grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// A registered third-party application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    /// `None` for public clients
    pub secret_digest: Option<SecretDigest>,
    pub redirect_uris: Vec<String>,
    pub scopes: ScopeSet,
    pub confidential: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn is_public(&self) -> bool {
        !self.confidential
    }

    /// Exact string match against a registered redirect URI
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Single-use authorization code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub user_id: Uuid,
    pub scopes: ScopeSet,
    pub redirect_uri: String,
    pub pkce: Option<PkceChallenge>,
    /// Assigned at issuance so a replayed code can revoke what it produced
    pub family_id: FamilyId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
}

impl AuthorizationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Opaque bearer access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    /// `None` for client_credentials grants
    pub user_id: Option<Uuid>,
    pub scopes: ScopeSet,
    pub family_id: Option<FamilyId>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl AccessToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired_at(now)
    }

    /// Remaining lifetime in whole seconds, never negative
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Rotating refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub user_id: Uuid,
    pub scopes: ScopeSet,
    pub family_id: FamilyId,
    pub issued_at: DateTime<Utc>,
    /// `None` never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub consumed: bool,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && !self.is_expired_at(now)
    }
}

/// Tally of records touched by a bulk revocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevokedCount {
    pub codes: usize,
    pub access_tokens: usize,
    pub refresh_tokens: usize,
}

impl RevokedCount {
    pub fn total(&self) -> usize {
        self.codes + self.access_tokens + self.refresh_tokens
    }
}
