//! HTTP adapter for the authorization server
//!
//! - RFC 6749: OAuth 2.0 authorization and token endpoints
//! - RFC 7636: PKCE
//! - RFC 7009: Token revocation
//! - RFC 7662: Token introspection
//! - RFC 8414: Authorization Server Metadata
//!
//! plus the client self-management API used by the chat's settings pages.

pub mod authorize;
pub mod clients;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod models;
pub mod revoke;
pub mod token;

pub use authorize::{authorize_decide, authorize_get};
pub use extract::{AuthenticatedUser, BearerAuth, ClientCredentials};
pub use metadata::authorization_server_metadata;
pub use revoke::{introspect_endpoint, revoke_endpoint};
pub use token::token_endpoint;

use crate::server::AuthorizationServer;
use axum::{
    Router,
    routing::{delete, get, post},
};

/// All endpoints, still expecting their state
pub fn oauth_routes() -> Router<AuthorizationServer> {
    Router::new()
        // RFC 8414: Authorization Server Metadata
        .route(
            "/.well-known/oauth-authorization-server",
            get(authorization_server_metadata),
        )
        .route("/oauth2/authorize", get(authorize_get))
        .route("/oauth2/authorize/decide", post(authorize_decide))
        .route("/oauth2/token", post(token_endpoint))
        .route("/oauth2/revoke", post(revoke_endpoint))
        .route("/oauth2/introspect", post(introspect_endpoint))
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:id",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/clients/:id/secret", post(clients::rotate_client_secret))
        .route("/users/me/tokens", get(clients::authorized_apps))
        .route("/users/me/clients/:id/tokens", delete(clients::revoke_app))
}

/// Create the OAuth router bound to `server`
pub fn oauth_router(server: AuthorizationServer) -> Router {
    oauth_routes().with_state(server)
}
