//! HTTP mapping of authorization errors

use crate::error::AuthError;
use crate::grant::AuthorizeError;
use crate::oauth::models::OAuthError;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::error;
use url::Url;

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidClient(_) | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Unavailable(ref e) = self {
            error!(error = %e, "Storage failure while serving request");
        }

        let status = self.status();
        let body = Json(OAuthError {
            error: self.error_code().to_string(),
            error_description: Some(self.description()),
        });

        match self {
            // RFC 6749 §5.2
            AuthError::InvalidClient(_) => (
                status,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"huddle\"")],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

impl IntoResponse for AuthorizeError {
    fn into_response(self) -> Response {
        match self.redirect_location() {
            Some(location) => found(location),
            None => self.error.into_response(),
        }
    }
}

/// 302 to a client redirect URI
pub(crate) fn found(location: &Url) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.as_str())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::invalid_grant("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthError::invalid_client("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::from(StorageError::Unavailable("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_invalid_client_challenges_basic() {
        let response = AuthError::invalid_client("bad secret").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            response.headers()[header::WWW_AUTHENTICATE]
                .to_str()
                .unwrap()
                .starts_with("Basic")
        );
    }
}
