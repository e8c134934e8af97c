//! Client self-management and the user's authorized apps

use crate::error::AuthError;
use crate::oauth::extract::AuthenticatedUser;
use crate::oauth::models::{
    ClientDetail, ClientDetailQuery, ClientSecretResponse, ClientSummary, CreateClientRequest,
    CreatedClient, ListClientsQuery, RevokedResponse, UpdateClientRequest,
};
use crate::registry::{ClientPatch, NewClient};
use crate::revocation::AuthorizedApp;
use crate::scope::ScopeSet;
use crate::server::AuthorizationServer;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// GET /clients?all=
pub async fn list_clients(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListClientsQuery>,
) -> Result<Json<Vec<ClientSummary>>, AuthError> {
    let clients = server.registry().list(&user, query.all).await?;
    Ok(Json(clients.iter().map(ClientSummary::from).collect()))
}

/// POST /clients
pub async fn create_client(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateClientRequest>,
) -> Result<Response, AuthError> {
    let scopes = ScopeSet::parse(&request.scope)?;
    let registered = server
        .registry()
        .register(
            &user,
            NewClient {
                name: request.name,
                description: request.description,
                redirect_uris: request.redirect_uris,
                scopes,
                confidential: request.confidential,
            },
        )
        .await?;

    let body = CreatedClient {
        detail: ClientDetail::from(&registered.client),
        client_secret: registered.client_secret,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// GET /clients/:id?detail=
pub async fn get_client(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(client_id): Path<String>,
    Query(query): Query<ClientDetailQuery>,
) -> Result<Response, AuthError> {
    if query.detail {
        let client = server.registry().get_detail(&client_id, &user).await?;
        Ok(Json(ClientDetail::from(&client)).into_response())
    } else {
        let client = server.registry().get(&client_id).await?;
        Ok(Json(ClientSummary::from(&client)).into_response())
    }
}

/// PATCH /clients/:id
pub async fn update_client(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(client_id): Path<String>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<ClientDetail>, AuthError> {
    let patch = ClientPatch {
        name: request.name,
        description: request.description,
        redirect_uris: request.redirect_uris,
        owner_id: request.owner_id,
    };
    let client = server.registry().update(&client_id, patch, &user).await?;
    Ok(Json(ClientDetail::from(&client)))
}

/// DELETE /clients/:id
pub async fn delete_client(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(client_id): Path<String>,
) -> Result<StatusCode, AuthError> {
    server.registry().delete(&client_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /clients/:id/secret
pub async fn rotate_client_secret(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(client_id): Path<String>,
) -> Result<Json<ClientSecretResponse>, AuthError> {
    let client_secret = server.registry().rotate_secret(&client_id, &user).await?;
    Ok(Json(ClientSecretResponse { client_secret }))
}

/// GET /users/me/tokens
pub async fn authorized_apps(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<AuthorizedApp>>, AuthError> {
    Ok(Json(server.revocation().authorized_apps(user.user_id).await?))
}

/// DELETE /users/me/clients/:id/tokens
pub async fn revoke_app(
    State(server): State<AuthorizationServer>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(client_id): Path<String>,
) -> Result<Json<RevokedResponse>, AuthError> {
    let revoked = server
        .revocation()
        .revoke_all_for_user(&client_id, user.user_id)
        .await?;
    Ok(Json(RevokedResponse {
        revoked: revoked.total(),
    }))
}
