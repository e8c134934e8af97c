//! Request extractors: the session user, client credentials and bearer tokens

use crate::bearer::{BearerContext, BearerError};
use crate::error::AuthError;
use crate::models::{Actor, Client};
use crate::server::AuthorizationServer;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::debug;
use uuid::Uuid;

/// The user authenticated by the upstream session layer
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Actor);

#[axum::async_trait]
impl FromRequestParts<AuthorizationServer> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &AuthorizationServer,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(server.config().user_header.as_str())
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or(AuthError::Unauthenticated)?;

        server.resolve_actor(user_id).await.map(Self)
    }
}

/// A validated bearer token, for resource endpoints
#[derive(Debug, Clone)]
pub struct BearerAuth(pub BearerContext);

#[axum::async_trait]
impl FromRequestParts<AuthorizationServer> for BearerAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &AuthorizationServer,
    ) -> Result<Self, Self::Rejection> {
        let authorization = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                server
                    .bearer()
                    .unauthorized_response(BearerError::InvalidToken("Invalid header encoding".into()))
            })?),
            None => None,
        };

        server
            .bearer()
            .validate(authorization)
            .await
            .map(Self)
            .map_err(|e| server.bearer().unauthorized_response(e))
    }
}

/// Client credentials as presented on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl ClientCredentials {
    /// Credentials from HTTP Basic or the form body; using both is an error
    pub fn from_request(
        headers: &HeaderMap,
        form_client_id: Option<&str>,
        form_client_secret: Option<&str>,
    ) -> Result<Self, AuthError> {
        let basic = match headers.get(header::AUTHORIZATION) {
            Some(value) => parse_basic(value.to_str().unwrap_or_default())?,
            None => None,
        };

        match (basic, form_client_id.filter(|id| !id.is_empty())) {
            (Some(_), _) if form_client_secret.is_some() => Err(
                AuthError::invalid_request("Multiple client authentication methods used"),
            ),
            (Some(credentials), form_id) => {
                if form_id.is_some_and(|id| id != credentials.client_id) {
                    return Err(AuthError::invalid_request("client_id does not match credentials"));
                }
                Ok(credentials)
            }
            (None, Some(client_id)) => Ok(Self {
                client_id: client_id.to_string(),
                client_secret: form_client_secret.map(str::to_string),
            }),
            (None, None) => Err(AuthError::invalid_client("Client authentication required")),
        }
    }

    pub async fn authenticate(&self, server: &AuthorizationServer) -> Result<Client, AuthError> {
        server
            .registry()
            .authenticate(&self.client_id, self.client_secret.as_deref())
            .await
    }
}

/// `None` for non-Basic schemes so bearer-authenticated callers pass through
fn parse_basic(value: &str) -> Result<Option<ClientCredentials>, AuthError> {
    let Some(encoded) = value
        .split_once(' ')
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Basic"))
        .map(|(_, encoded)| encoded)
    else {
        return Ok(None);
    };

    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| {
            debug!("Malformed Basic credentials");
            AuthError::invalid_client("Malformed Basic credentials")
        })?;

    let (client_id, client_secret) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::invalid_client("Malformed Basic credentials"))?;

    Ok(Some(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: Some(client_secret.to_string()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn basic(id: &str, secret: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode(format!("{id}:{secret}"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_basic_credentials() {
        let credentials = ClientCredentials::from_request(&basic("app", "s3cret"), None, None).unwrap();
        assert_eq!(credentials.client_id, "app");
        assert_eq!(credentials.client_secret.as_deref(), Some("s3cret"));

        // Matching form client_id is tolerated
        assert!(ClientCredentials::from_request(&basic("app", "s3cret"), Some("app"), None).is_ok());
    }

    #[test]
    fn test_basic_scheme_is_case_insensitive() {
        let encoded = STANDARD.encode("app:s3cret");
        for scheme in ["basic", "BASIC", "bAsIc"] {
            let credentials = parse_basic(&format!("{scheme} {encoded}")).unwrap().unwrap();
            assert_eq!(credentials.client_id, "app", "{scheme}");
            assert_eq!(credentials.client_secret.as_deref(), Some("s3cret"));
        }

        // Other schemes pass through untouched
        assert!(parse_basic("Bearer abc").unwrap().is_none());
        assert!(parse_basic("Basicabc").unwrap().is_none());
    }

    #[test]
    fn test_form_credentials() {
        let credentials =
            ClientCredentials::from_request(&HeaderMap::new(), Some("app"), Some("s3cret")).unwrap();
        assert_eq!(credentials.client_secret.as_deref(), Some("s3cret"));

        let public = ClientCredentials::from_request(&HeaderMap::new(), Some("app"), None).unwrap();
        assert!(public.client_secret.is_none());
    }

    #[test]
    fn test_credential_errors() {
        assert!(matches!(
            ClientCredentials::from_request(&HeaderMap::new(), None, None),
            Err(AuthError::InvalidClient(_))
        ));
        assert!(matches!(
            ClientCredentials::from_request(&basic("app", "a"), Some("app"), Some("b")),
            Err(AuthError::InvalidRequest(_))
        ));
        assert!(matches!(
            ClientCredentials::from_request(&basic("app", "a"), Some("other"), None),
            Err(AuthError::InvalidRequest(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(matches!(
            ClientCredentials::from_request(&headers, None, None),
            Err(AuthError::InvalidClient(_))
        ));
    }
}
