//! Liveness and readiness endpoints

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use huddle_auth::AuthorizationServer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Token value no store will ever hold; looking it up only exercises storage
const PROBE_TOKEN: &str = "readiness-probe";

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub message: Option<String>,
}

pub struct HealthState {
    pub server: AuthorizationServer,
    pub started: Instant,
}

/// Handler for /health (liveness probe)
pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started.elapsed().as_secs(),
    })
}

/// Handler for /ready (readiness probe); fails while token storage is unreachable
pub async fn ready_handler(
    State(state): State<Arc<HealthState>>,
) -> (StatusCode, Json<ReadyResponse>) {
    match state.server.tokens().lookup_access_token(PROBE_TOKEN).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some("Token storage unavailable".to_string()),
                }),
            )
        }
    }
}

pub fn health_router(server: AuthorizationServer) -> Router {
    let state = Arc::new(HealthState {
        server,
        started: Instant::now(),
    });

    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}
