//! RFC 6750: Bearer token validation
//!
//! Downstream API handlers hand the `Authorization` header to a
//! [`BearerValidator`] and get back who is calling, through which client, and
//! with which scopes.

use crate::crypto::fingerprint;
use crate::scope::{Scope, ScopeSet};
use crate::tokens::TokenStore;
use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Bearer token error types per RFC 6750 Section 3.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerError {
    /// No token provided
    MissingToken,
    /// Malformed header, or an unknown, expired or revoked token
    InvalidToken(String),
    /// Token doesn't have required scope
    InsufficientScope(Scope),
    /// Token store unreachable
    Unavailable,
}

impl BearerError {
    /// Get RFC 6750 error code
    pub fn error_code(&self) -> &'static str {
        match self {
            BearerError::MissingToken => "invalid_request",
            BearerError::InvalidToken(_) => "invalid_token",
            BearerError::InsufficientScope(_) => "insufficient_scope",
            BearerError::Unavailable => "temporarily_unavailable",
        }
    }

    pub fn error_description(&self) -> String {
        match self {
            BearerError::MissingToken => "No access token provided".to_string(),
            BearerError::InvalidToken(msg) => msg.clone(),
            BearerError::InsufficientScope(scope) => {
                format!("Insufficient scope, required: {scope}")
            }
            BearerError::Unavailable => "Token validation is temporarily unavailable".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BearerError::MissingToken | BearerError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            BearerError::InsufficientScope(_) => StatusCode::FORBIDDEN,
            BearerError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// WWW-Authenticate header builder per RFC 6750 Section 3
///
/// ```text
/// HTTP/1.1 401 Unauthorized
/// WWW-Authenticate: Bearer realm="huddle", error="invalid_token", error_description="..."
/// ```
pub struct WwwAuthenticate {
    realm: String,
    error: Option<BearerError>,
}

impl WwwAuthenticate {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: BearerError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn to_header_value(&self) -> HeaderValue {
        let mut parts = vec![format!("Bearer realm=\"{}\"", self.realm)];

        // RFC 6750 §3.1: no error attributes when the request carried no token
        if let Some(error) = self.error.as_ref().filter(|e| **e != BearerError::MissingToken) {
            parts.push(format!("error=\"{}\"", error.error_code()));
            parts.push(format!(
                "error_description=\"{}\"",
                error.error_description().replace('"', "'")
            ));
            if let BearerError::InsufficientScope(scope) = error {
                parts.push(format!("scope=\"{scope}\""));
            }
        }

        HeaderValue::from_str(&parts.join(", "))
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
    }

    /// Response with the status matching the error
    pub fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(header::WWW_AUTHENTICATE, self.to_header_value());

        let status = self
            .error
            .as_ref()
            .map_or(StatusCode::UNAUTHORIZED, BearerError::status);
        let body = match self.error {
            Some(ref error) => serde_json::json!({
                "error": error.error_code(),
                "error_description": error.error_description()
            })
            .to_string(),
            None => String::new(),
        };

        (status, headers, body).into_response()
    }
}

/// Create an error response with the RFC 6750 `WWW-Authenticate` header
pub fn unauthorized_response(error: BearerError, realm: &str) -> Response {
    WwwAuthenticate::new(realm).with_error(error).into_response()
}

/// The caller behind a valid bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerContext {
    /// `None` for client_credentials tokens
    pub user_id: Option<Uuid>,
    pub client_id: String,
    pub scopes: ScopeSet,
}

impl BearerContext {
    pub fn require_scope(&self, scope: Scope) -> Result<(), BearerError> {
        if self.scopes.contains(scope) {
            Ok(())
        } else {
            debug!(client_id = %self.client_id, required = %scope, "Insufficient scope");
            Err(BearerError::InsufficientScope(scope))
        }
    }
}

pub struct BearerValidator {
    tokens: Arc<TokenStore>,
    realm: String,
}

impl BearerValidator {
    pub fn new(tokens: Arc<TokenStore>, realm: impl Into<String>) -> Self {
        Self {
            tokens,
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Validate an `Authorization` header value
    pub async fn validate(&self, auth_header: Option<&str>) -> Result<BearerContext, BearerError> {
        let auth_header = auth_header.ok_or(BearerError::MissingToken)?;
        // Auth schemes are case-insensitive
        let token = auth_header
            .split_once(' ')
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
            .map(|(_, token)| token.trim())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BearerError::InvalidToken("Invalid authorization header format".into()))?;

        let record = match self.tokens.lookup_access_token(token).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(token = %fingerprint(token), "Rejected bearer token");
                return Err(BearerError::InvalidToken(
                    "Access token is invalid, expired or revoked".into(),
                ));
            }
            Err(e) => {
                warn!(error = %e, "Bearer validation failed on storage");
                return Err(BearerError::Unavailable);
            }
        };

        Ok(BearerContext {
            user_id: record.user_id,
            client_id: record.client_id,
            scopes: record.scopes,
        })
    }

    pub fn unauthorized_response(&self, error: BearerError) -> Response {
        unauthorized_response(error, &self.realm)
    }
}
