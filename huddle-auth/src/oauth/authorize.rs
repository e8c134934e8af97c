//! Authorization endpoint
//!
//! `GET /oauth2/authorize` verifies the request for the signed-in user and
//! describes the consent screen; `POST /oauth2/authorize/decide` applies the
//! user's answer and redirects back to the client.

use crate::error::AuthError;
use crate::grant::AuthorizationRequest;
use crate::oauth::error::found;
use crate::oauth::extract::AuthenticatedUser;
use crate::oauth::models::{ConsentView, DecisionForm};
use crate::server::AuthorizationServer;
use axum::{
    Form, Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};

/// GET /oauth2/authorize
///
/// # Query Parameters
/// - `response_type`: `code`, or `token` when the implicit grant is enabled
/// - `client_id`: Registered client identifier
/// - `redirect_uri`: Must exactly match one of the client's registered URIs
/// - `scope`: (Optional) Space-separated scopes; defaults to everything available
/// - `state`: (Optional) Opaque value echoed back to the client
/// - `code_challenge`, `code_challenge_method`: PKCE, required for public clients
pub async fn authorize_get(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    match server.grants().validate_authorization(&request, &user).await {
        Ok(pending) => Json(ConsentView {
            client_id: pending.client().id.clone(),
            client_name: pending.client().name.clone(),
            client_description: pending.client().description.clone(),
            scopes: pending.scopes().to_names(),
            redirect_uri: pending.redirect_uri().to_string(),
            state: pending.state().map(str::to_string),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /oauth2/authorize/decide
///
/// The request is verified again; nothing from the consent screen is trusted.
/// `decision` is `approve` or `deny`.
pub async fn authorize_decide(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Form(form): Form<DecisionForm>,
) -> Response {
    let approved = match form.decision.as_str() {
        "approve" => true,
        "deny" => false,
        other => {
            return AuthError::invalid_request(format!("Unknown decision '{other}'"))
                .into_response();
        }
    };

    let pending = match server.grants().validate_authorization(&form.request, &user).await {
        Ok(pending) => pending,
        Err(e) => return e.into_response(),
    };

    match server.grants().decide(pending, approved).await {
        Ok(location) => found(&location),
        Err(e) => e.into_response(),
    }
}
