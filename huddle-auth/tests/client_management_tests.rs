//! Integration tests for client self-management and authorized apps


use axum::http::{Method, StatusCode};
use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use huddle_auth::{AccessToken, Actor, AuthError, NewClient, Role, ScopeSet};
use std::sync::Arc;
use serde_json::json;
use test_utils::*;

#[tokio::test]
async fn test_create_client() {
    let env = TestEnv::new();

    let response = send(
        env.app(),
        Method::POST,
        "/clients",
        Some(env.alice),
        json_body(json!({
            "name": "Standup Bot",
            "description": "Posts the daily standup",
            "redirect_uris": ["https://standup.example.com/cb", "http://localhost:8080/cb"],
            "scope": "read write",
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert!(response.body["id"].is_string());
    assert_eq!(response.body["owner_id"], env.alice.to_string());
    assert_eq!(response.body["scopes"], json!(["read", "write"]));
    assert_eq!(response.body["confidential"], true);
    assert!(response.body["client_secret"].is_string());
}

#[tokio::test]
async fn test_create_client_validation() {
    let env = TestEnv::new();

    let cases = [
        json!({"name": "", "description": "d", "redirect_uris": [REDIRECT_URI], "scope": "read"}),
        json!({"name": "x".repeat(33), "description": "d", "redirect_uris": [REDIRECT_URI], "scope": "read"}),
        json!({"name": "n", "description": "", "redirect_uris": [REDIRECT_URI], "scope": "read"}),
        json!({"name": "n", "description": "d", "redirect_uris": [], "scope": "read"}),
        json!({"name": "n", "description": "d", "redirect_uris": ["http://example.com/cb"], "scope": "read"}),
        json!({"name": "n", "description": "d", "redirect_uris": ["https://example.com/cb#frag"], "scope": "read"}),
        json!({"name": "n", "description": "d", "redirect_uris": ["javascript:alert(1)"], "scope": "read"}),
        json!({"name": "n", "description": "d", "redirect_uris": [REDIRECT_URI], "scope": ""}),
    ];

    for case in cases {
        let response = send(
            env.app(),
            Method::POST,
            "/clients",
            Some(env.alice),
            json_body(case.clone()),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{case}");
    }

    // Unknown scope names
    let response = send(
        env.app(),
        Method::POST,
        "/clients",
        Some(env.alice),
        json_body(json!({
            "name": "n", "description": "d", "redirect_uris": [REDIRECT_URI], "scope": "read admin"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_scope");
}

#[tokio::test]
async fn test_create_client_requires_permission() {
    let env = TestEnv::new();
    let bot = Actor::new(uuid::Uuid::new_v4(), Role::bot());

    // Anonymous callers never reach the registry
    let response = send(
        env.app(),
        Method::POST,
        "/clients",
        None,
        json_body(json!({
            "name": "n", "description": "d", "redirect_uris": [REDIRECT_URI], "scope": "read"
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Bots may not register clients
    let registered = env
        .server
        .registry()
        .register(
            &bot,
            NewClient {
                name: "n".to_string(),
                description: "d".to_string(),
                redirect_uris: vec![REDIRECT_URI.to_string()],
                scopes: ScopeSet::parse("read").unwrap(),
                confidential: true,
            },
        )
        .await;
    assert!(matches!(registered, Err(AuthError::Forbidden(_))));
}

#[tokio::test]
async fn test_list_clients() {
    let env = TestEnv::new();
    let mine = env.register_client(env.alice, "read", true).await;
    let theirs = env.register_client(env.bob, "read", true).await;

    let response = get(env.app(), "/clients", Some(env.alice)).await;
    assert_eq!(response.status, StatusCode::OK);
    let ids: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![mine.id.as_str()]);

    let response = get(env.app(), "/clients?all=true", Some(env.alice)).await;
    let all = response.body.as_array().unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|c| c["id"] == theirs.id.as_str()));
    // The listing never exposes secrets or redirect URIs
    assert!(all.iter().all(|c| c.get("client_secret").is_none()));
    assert!(all.iter().all(|c| c.get("redirect_uris").is_none()));
}

#[tokio::test]
async fn test_get_client() {
    let env = TestEnv::new();
    let client = env.register_client(env.alice, "read", true).await;

    // Summary is visible to anyone signed in
    let response = get(env.app(), &format!("/clients/{}", client.id), Some(env.bob)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Test App");
    assert!(response.body.get("redirect_uris").is_none());

    // Detail only for the owner or an admin
    let uri = format!("/clients/{}?detail=true", client.id);
    let response = get(env.app(), &uri, Some(env.bob)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = get(env.app(), &uri, Some(env.alice)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["redirect_uris"], json!([REDIRECT_URI]));
    assert!(response.body.get("client_secret").is_none());

    let response = get(env.app(), &uri, Some(env.admin)).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = get(env.app(), "/clients/missing", Some(env.alice)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");
}

#[tokio::test]
async fn test_update_client() {
    let env = TestEnv::new();
    let client = env.register_client(env.alice, "read", true).await;
    let uri = format!("/clients/{}", client.id);

    let response = send(
        env.app(),
        Method::PATCH,
        &uri,
        Some(env.bob),
        json_body(json!({"name": "Hijacked"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(
        env.app(),
        Method::PATCH,
        &uri,
        Some(env.alice),
        json_body(json!({"redirect_uris": ["ftp://example.com"]})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        env.app(),
        Method::PATCH,
        &uri,
        Some(env.alice),
        json_body(json!({"name": "Renamed", "description": "Still an app"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Renamed");
    assert_eq!(response.body["redirect_uris"], json!([REDIRECT_URI]));

    // Admins may transfer ownership
    let response = send(
        env.app(),
        Method::PATCH,
        &uri,
        Some(env.admin),
        json_body(json!({"owner_id": env.bob})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["owner_id"], env.bob.to_string());

    let response = send(
        env.app(),
        Method::PATCH,
        "/clients/missing",
        Some(env.alice),
        json_body(json!({"name": "x"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_client_revokes_tokens() {
    let env = TestEnv::new();
    let client = env.register_client(env.alice, "read", true).await;
    let code = env.authorize_code(&client, env.alice, "read", None).await;
    let tokens = env.exchange_code(&client, &code, None).await;
    let uri = format!("/clients/{}", client.id);

    let response = send(env.app(), Method::DELETE, &uri, Some(env.bob), TestBody::Empty).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = send(env.app(), Method::DELETE, &uri, Some(env.alice), TestBody::Empty).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let revocation = env.server.revocation();
    assert!(!revocation.introspect(&tokens.access_token()).await.active);
    assert!(!revocation.introspect(&tokens.refresh_token()).await.active);

    let response = get(env.app(), &uri, Some(env.alice)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = send(env.app(), Method::DELETE, &uri, Some(env.alice), TestBody::Empty).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_client_revokes_tokens_minted_during_delete() {
    let storage = Arc::new(FlakyStorage::new());
    let env = TestEnv::with_storage(storage.clone());
    let client = env.register_client(env.alice, "read", true).await;

    // A client_credentials token has no family to revoke it by
    let now = Utc::now();
    storage.mint_during_delete(AccessToken {
        token: "late-token".to_string(),
        client_id: client.id.clone(),
        user_id: None,
        scopes: ScopeSet::parse("read").unwrap(),
        family_id: None,
        issued_at: now,
        expires_at: now + Duration::hours(1),
        revoked: false,
    });

    let uri = format!("/clients/{}", client.id);
    let response = send(env.app(), Method::DELETE, &uri, Some(env.alice), TestBody::Empty).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert!(!env.server.revocation().introspect("late-token").await.active);
    assert!(
        env.server
            .bearer()
            .validate(Some("Bearer late-token"))
            .await
            .is_err()
    );
    assert_matches!(
        env.server
            .registry()
            .authenticate(&client.id, client.secret.as_deref())
            .await,
        Err(AuthError::InvalidClient(_))
    );
}

#[tokio::test]
async fn test_rotate_secret() {
    let env = TestEnv::new();
    let client = env.register_client(env.alice, "read", true).await;

    let response = send(
        env.app(),
        Method::POST,
        &format!("/clients/{}/secret", client.id),
        Some(env.alice),
        TestBody::Empty,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    let new_secret = response.body["client_secret"].as_str().unwrap().to_string();
    assert_ne!(Some(new_secret.clone()), client.secret);

    // The old secret stops working
    let response = env
        .token_request(&client, &[("grant_type", "client_credentials")])
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let rotated = TestClient {
        id: client.id.clone(),
        secret: Some(new_secret),
    };
    let response = env
        .token_request(&rotated, &[("grant_type", "client_credentials")])
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Public clients have nothing to rotate
    let public = env.register_client(env.alice, "read", false).await;
    let response = send(
        env.app(),
        Method::POST,
        &format!("/clients/{}/secret", public.id),
        Some(env.alice),
        TestBody::Empty,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_authorized_apps() {
    let env = TestEnv::new();
    let client = env.register_client(env.bob, "read write", true).await;

    let code = env.authorize_code(&client, env.alice, "read", None).await;
    let first = env.exchange_code(&client, &code, None).await;
    let code = env.authorize_code(&client, env.alice, "write", None).await;
    env.exchange_code(&client, &code, None).await;

    let response = get(env.app(), "/users/me/tokens", Some(env.alice)).await;
    assert_eq!(response.status, StatusCode::OK);
    let apps = response.body.as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["client_id"], client.id.as_str());
    assert_eq!(apps[0]["client_name"], "Test App");
    assert_eq!(apps[0]["active_tokens"], 2);

    // Bob holds no tokens of his own client
    let response = get(env.app(), "/users/me/tokens", Some(env.bob)).await;
    assert_eq!(response.body, json!([]));

    let response = send(
        env.app(),
        Method::DELETE,
        &format!("/users/me/clients/{}/tokens", client.id),
        Some(env.alice),
        TestBody::Empty,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["revoked"].as_u64().unwrap() >= 4);

    let info = env.introspect(&client, &first.access_token()).await;
    assert_eq!(info["active"], false);
    let response = env.refresh(&client, &first.refresh_token()).await;
    assert_eq!(response.body["error"], "invalid_grant");

    let response = get(env.app(), "/users/me/tokens", Some(env.alice)).await;
    assert_eq!(response.body, json!([]));
}
