//! End-to-end tests for the standalone server

use axum::body::Body;
use axum::http::{Request, StatusCode};
use huddle_auth::Role;
use huddle_server::{HuddleServer, SeedUser, ServerConfig};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;
use uuid::Uuid;

fn test_server(users: Vec<SeedUser>) -> HuddleServer {
    let mut config = ServerConfig {
        users,
        ..Default::default()
    };
    config.auth.issuer = "https://auth.huddle.example/".to_string();
    HuddleServer::new(config).unwrap()
}

async fn get_json(server: &HuddleServer, uri: &str, user: Option<Uuid>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(user) = user {
        request = request.header("x-huddle-user", user.to_string());
    }
    let response = server
        .router()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_and_ready() {
    let server = test_server(Vec::new());

    let (status, body) = get_json(&server, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = get_json(&server, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_metadata_uses_configured_issuer() {
    let server = test_server(Vec::new());

    let (status, body) = get_json(&server, "/.well-known/oauth-authorization-server", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["issuer"], "https://auth.huddle.example");
    assert_eq!(
        body["token_endpoint"],
        "https://auth.huddle.example/oauth2/token"
    );
}

#[tokio::test]
async fn test_seeded_users_can_manage_clients() {
    let alice = Uuid::new_v4();
    let server = test_server(vec![SeedUser {
        id: alice,
        role: Role::user(),
    }]);

    let (status, body) = get_json(&server, "/clients", Some(alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = get_json(&server, "/clients", Some(Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_serve_until_shutdown() {
    let server = test_server(Vec::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stopped.await;
    }));

    let mut stream = TcpStream::connect(address).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.contains("\"status\":\"healthy\""));

    stop.send(()).unwrap();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
