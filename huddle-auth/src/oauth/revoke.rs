//! RFC 7009 revocation and RFC 7662 introspection endpoints

use crate::models::Client;
use crate::oauth::extract::ClientCredentials;
use crate::oauth::models::TokenActionRequest;
use crate::server::AuthorizationServer;
use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

/// POST /oauth2/revoke
///
/// Answers 200 for any well-formed request from an authenticated client,
/// whether or not the token existed.
pub async fn revoke_endpoint(
    State(server): State<AuthorizationServer>,
    headers: HeaderMap,
    Form(request): Form<TokenActionRequest>,
) -> Response {
    let client = match authenticate(&server, &headers, &request).await {
        Ok(client) => client,
        Err(response) => return response,
    };

    match server
        .revocation()
        .revoke_as_client(&client.id, &request.token, request.hint())
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /oauth2/introspect
pub async fn introspect_endpoint(
    State(server): State<AuthorizationServer>,
    headers: HeaderMap,
    Form(request): Form<TokenActionRequest>,
) -> Response {
    if let Err(response) = authenticate(&server, &headers, &request).await {
        return response;
    }
    Json(server.revocation().introspect(&request.token).await).into_response()
}

async fn authenticate(
    server: &AuthorizationServer,
    headers: &HeaderMap,
    request: &TokenActionRequest,
) -> Result<Client, Response> {
    let credentials = ClientCredentials::from_request(
        headers,
        request.client_id.as_deref(),
        request.client_secret.as_deref(),
    )
    .map_err(IntoResponse::into_response)?;

    credentials
        .authenticate(server)
        .await
        .map_err(IntoResponse::into_response)
}
