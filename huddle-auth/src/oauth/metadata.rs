//! RFC 8414: Authorization Server Metadata

use crate::scope::Scope;
use crate::server::AuthorizationServer;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::{Value, json};

/// Metadata document for `issuer`
pub fn server_metadata(issuer: &str, allow_implicit_grant: bool) -> Value {
    let response_types: &[&str] = if allow_implicit_grant {
        &["code", "token"]
    } else {
        &["code"]
    };
    let scopes: Vec<&str> = Scope::ALL.iter().map(|s| s.as_str()).collect();

    json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/oauth2/authorize"),
        "token_endpoint": format!("{issuer}/oauth2/token"),
        "revocation_endpoint": format!("{issuer}/oauth2/revoke"),
        "introspection_endpoint": format!("{issuer}/oauth2/introspect"),

        "response_types_supported": response_types,
        "grant_types_supported": ["authorization_code", "refresh_token", "client_credentials"],
        "code_challenge_methods_supported": ["plain", "S256"],
        "scopes_supported": scopes,

        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post", "none"],
        "revocation_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post", "none"],
        "introspection_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post", "none"],
    })
}

/// GET /.well-known/oauth-authorization-server
pub async fn authorization_server_metadata(
    State(server): State<AuthorizationServer>,
) -> impl IntoResponse {
    let config = server.config();
    (
        StatusCode::OK,
        Json(server_metadata(config.issuer_base(), config.allow_implicit_grant)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_endpoints_follow_issuer() {
        let metadata = server_metadata("https://chat.example.com", false);
        assert_eq!(metadata["issuer"], "https://chat.example.com");
        assert_eq!(
            metadata["token_endpoint"],
            "https://chat.example.com/oauth2/token"
        );
        assert_eq!(metadata["response_types_supported"], json!(["code"]));
        assert!(
            metadata["scopes_supported"]
                .as_array()
                .unwrap()
                .contains(&json!("manage_bot"))
        );
    }
}
