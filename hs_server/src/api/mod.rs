//! HTTP/WebSocket API for the Half-Suit server.
//!
//! The surface is deliberately small: everything game-related happens over
//! one WebSocket endpoint, with a health check on the side.
//!
//! # Endpoints
//!
//! ```text
//! GET /health - Server health status (public)
//! GET /ws     - Establish WebSocket connection (public)
//! ```
//!
//! There is no authentication layer: games are private by virtue of their
//! unguessable codes, and a connection only gains an identity by creating,
//! joining, or rejoining a game.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod websocket;

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::orchestrator::Orchestrator;

/// Application state shared across all handlers and WebSocket connections.
/// Cloned per request; cheap thanks to the Arc.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .fallback(fallback)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"ok","version":"0.1.0","timestamp":"2026-08-29T10:30:00Z"}
/// ```
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Anything that is not `/health` or `/ws` gets a pointer to the right
/// place instead of a bare 404.
async fn fallback() -> impl IntoResponse {
    (
        StatusCode::OK,
        "Half-Suit game server. Connect via WebSocket at /ws.",
    )
}
