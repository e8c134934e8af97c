//! Wire types of the OAuth2 and client management endpoints

use crate::grant::{AuthorizationRequest, TokenGrant};
use crate::models::Client;
use crate::revocation::TokenTypeHint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token request parameters (RFC 6749 §4.1.3, §4.4.2, §6)
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String, // Always "Bearer"
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub scope: String,
}

impl From<TokenGrant> for TokenResponse {
    fn from(grant: TokenGrant) -> Self {
        Self {
            expires_in: grant.expires_in(),
            scope: grant.scopes().to_string(),
            access_token: grant.access_token.token,
            token_type: "Bearer".to_string(),
            refresh_token: grant.refresh_token.map(|r| r.token),
        }
    }
}

/// Revocation (RFC 7009 §2.1) and introspection (RFC 7662 §2.1) parameters
#[derive(Debug, Deserialize)]
pub struct TokenActionRequest {
    pub token: String,
    pub token_type_hint: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl TokenActionRequest {
    /// Unknown hints are ignored (RFC 7009 §2.1)
    pub fn hint(&self) -> Option<TokenTypeHint> {
        match self.token_type_hint.as_deref() {
            Some("access_token") => Some(TokenTypeHint::AccessToken),
            Some("refresh_token") => Some(TokenTypeHint::RefreshToken),
            _ => None,
        }
    }
}

/// Error response (RFC 6749 Section 5.2)
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Consent decision form: the authorize parameters plus the user's answer
#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    #[serde(flatten)]
    pub request: AuthorizationRequest,
    pub decision: String,
}

/// Consent screen description returned by `GET /oauth2/authorize`
#[derive(Debug, Serialize, Deserialize)]
pub struct ConsentView {
    pub client_id: String,
    pub client_name: String,
    pub client_description: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Client registration body
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub redirect_uris: Vec<String>,
    /// Space-separated scopes
    pub scope: String,
    #[serde(default = "default_confidential")]
    pub confidential: bool,
}

fn default_confidential() -> bool {
    true
}

/// Partial client update
#[derive(Debug, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListClientsQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientDetailQuery {
    #[serde(default)]
    pub detail: bool,
}

/// Public view of a client
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner_id: Uuid,
    pub scopes: Vec<String>,
}

impl From<&Client> for ClientSummary {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id.clone(),
            name: client.name.clone(),
            description: client.description.clone(),
            owner_id: client.owner_id,
            scopes: client.scopes.to_names(),
        }
    }
}

/// Owner/admin view of a client; never includes the secret
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub summary: ClientSummary,
    pub redirect_uris: Vec<String>,
    pub confidential: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Client> for ClientDetail {
    fn from(client: &Client) -> Self {
        Self {
            summary: ClientSummary::from(client),
            redirect_uris: client.redirect_uris.clone(),
            confidential: client.confidential,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

/// Registration response; the plaintext secret appears only here
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedClient {
    #[serde(flatten)]
    pub detail: ClientDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevokedResponse {
    pub revoked: usize,
}
