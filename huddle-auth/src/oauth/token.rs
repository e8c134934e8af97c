//! Token endpoint
//!
//! Authenticates the client, then dispatches on `grant_type`.

use crate::error::AuthError;
use crate::oauth::extract::ClientCredentials;
use crate::oauth::models::{TokenRequest, TokenResponse};
use crate::server::AuthorizationServer;
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

/// POST /oauth2/token
///
/// # Authorization Code Grant
/// ```text
/// grant_type=authorization_code&code=...&redirect_uri=...&code_verifier=...
/// ```
///
/// # Refresh Token Grant
/// ```text
/// grant_type=refresh_token&refresh_token=...&scope=read
/// ```
///
/// # Client Credentials Grant
/// ```text
/// grant_type=client_credentials&scope=read
/// ```
///
/// Clients authenticate with HTTP Basic or `client_id`/`client_secret` form
/// fields. Public clients send only `client_id`.
///
/// # Response
/// ```json
/// {
///   "access_token": "...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "refresh_token": "...",
///   "scope": "read write"
/// }
/// ```
pub async fn token_endpoint(
    State(server): State<AuthorizationServer>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    match issue_tokens(&server, &headers, request).await {
        Ok(response) => (
            [(header::CACHE_CONTROL, "no-store"), (header::PRAGMA, "no-cache")],
            Json(response),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn issue_tokens(
    server: &AuthorizationServer,
    headers: &HeaderMap,
    request: TokenRequest,
) -> Result<TokenResponse, AuthError> {
    let client = ClientCredentials::from_request(
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )?
    .authenticate(server)
    .await?;

    debug!(client_id = %client.id, grant_type = %request.grant_type, "Token request");

    let grant = match request.grant_type.as_str() {
        "authorization_code" => {
            let code = request
                .code
                .as_deref()
                .ok_or_else(|| AuthError::invalid_request("code is required"))?;
            server
                .grants()
                .exchange_code(
                    &client,
                    code,
                    request.redirect_uri.as_deref(),
                    request.code_verifier.as_deref(),
                )
                .await?
        }
        "refresh_token" => {
            let refresh_token = request
                .refresh_token
                .as_deref()
                .ok_or_else(|| AuthError::invalid_request("refresh_token is required"))?;
            server
                .grants()
                .refresh(&client, refresh_token, request.scope.as_deref())
                .await?
        }
        "client_credentials" => {
            server
                .grants()
                .client_credentials(&client, request.scope.as_deref())
                .await?
        }
        other => {
            return Err(AuthError::UnsupportedGrantType(format!(
                "grant_type '{other}' not supported"
            )));
        }
    };

    Ok(TokenResponse::from(grant))
}
