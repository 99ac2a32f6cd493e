//! WebSocket handler: one connection per client, all game traffic as JSON
//! text frames.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws` and the connection is upgraded.
//! 2. The connection is registered with the orchestrator under a fresh id;
//!    it has no player identity until a create/join/rejoin message binds one.
//! 3. A send task forwards orchestrator events to the socket while the
//!    receive loop feeds inbound frames to the orchestrator.
//! 4. On disconnect both halves are cleaned up; the player stays in their
//!    game and can rejoin from a new connection.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//! ws.onmessage = (event) => handleEvent(JSON.parse(event.data));
//! ws.send(JSON.stringify({ type: "createGame", playerName: "Alice" }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use uuid::Uuid;

use super::AppState;

/// Upgrade an HTTP connection to a WebSocket.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one established WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();
    tracing::info!(%conn_id, "websocket connected");

    // Channel the orchestrator pushes outbound events into.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<String>(32);
    state.orchestrator.register_connection(conn_id, event_tx).await;

    let send_task = tokio::spawn(async move {
        while let Some(json) = event_rx.recv().await {
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                state.orchestrator.handle_text(conn_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                tracing::info!(%conn_id, "websocket closed");
                break;
            }
            Err(err) => {
                tracing::warn!(%conn_id, %err, "websocket error");
                break;
            }
            // Ping/pong handled by axum; binary frames ignored.
            _ => {}
        }
    }

    send_task.abort();
    state.orchestrator.handle_disconnect(conn_id).await;
    tracing::info!(%conn_id, "websocket disconnected");
}
