//! Error types for the authorization core
//!
//! Every failure the grant, registry and revocation components can produce is an
//! [`AuthError`]. Each variant maps onto an OAuth2 error code (RFC 6749 §5.2) or a
//! management-API status so the HTTP adapter never has to guess.

use crate::scope::ScopeError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors produced by the authorization core
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Client authentication failed: {0}")]
    InvalidClient(String),

    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Client is not authorized for this grant: {0}")]
    UnauthorizedClient(String),

    #[error("Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    #[error("Unsupported response type: {0}")]
    UnsupportedResponseType(String),

    #[error("The resource owner denied the request")]
    AccessDenied,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] StorageError),
}

impl AuthError {
    /// OAuth2 / API error code for the wire
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::Validation(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::AccessDenied => "access_denied",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::Unavailable(_) => "temporarily_unavailable",
        }
    }

    /// Human-readable description without the error-code prefix
    pub fn description(&self) -> String {
        match self {
            Self::InvalidRequest(msg)
            | Self::InvalidClient(msg)
            | Self::InvalidGrant(msg)
            | Self::InvalidScope(msg)
            | Self::UnauthorizedClient(msg)
            | Self::UnsupportedGrantType(msg)
            | Self::UnsupportedResponseType(msg)
            | Self::Validation(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg) => msg.clone(),
            Self::AccessDenied => "The resource owner denied the request".to_string(),
            Self::Unauthenticated => "Authentication required".to_string(),
            // Backend details stay in the logs
            Self::Unavailable(_) => "The authorization server is temporarily unavailable".to_string(),
        }
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_client(msg: impl Into<String>) -> Self {
        Self::InvalidClient(msg.into())
    }

    pub fn invalid_grant(msg: impl Into<String>) -> Self {
        Self::InvalidGrant(msg.into())
    }

    pub fn invalid_scope(msg: impl Into<String>) -> Self {
        Self::InvalidScope(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<ScopeError> for AuthError {
    fn from(err: ScopeError) -> Self {
        Self::InvalidScope(err.to_string())
    }
}
