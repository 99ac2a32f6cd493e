//! Integration tests for the HTTP surface of the game server.
//!
//! Game flow itself is covered by the orchestrator tests; these exercise
//! the router: health check, the WebSocket upgrade gate, and the fallback.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;

use half_suit::MemoryStore;
use hs_server::api::{AppState, create_router};
use hs_server::orchestrator::Orchestrator;
use tower::ServiceExt; // For `oneshot` method

fn test_app() -> axum::Router {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Arc::new(Orchestrator::new(store, Duration::from_secs(300)));
    create_router(AppState { orchestrator })
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = test_app();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert!(json["timestamp"].is_string());
}

// ============================================================================
// WebSocket Upgrade Tests
// ============================================================================

#[tokio::test]
async fn test_ws_without_upgrade_headers_is_rejected() {
    let app = test_app();

    // A plain GET without the upgrade handshake headers must not crash
    // the server; axum rejects it with a client error.
    let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

// ============================================================================
// Fallback Tests
// ============================================================================

#[tokio::test]
async fn test_fallback_points_at_websocket() {
    let app = test_app();

    let request = Request::builder()
        .uri("/nope")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("/ws"));
}
