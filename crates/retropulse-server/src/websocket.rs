//! WebSocket handler for real-time board updates
//!
//! Each socket subscribes to its board's broadcast channel and receives
//! every event as a JSON frame. The transport does not replay missed
//! events: a socket that lags behind the channel buffer is closed, which
//! sends the client back through its fetch-then-resubscribe cycle.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use tokio::sync::broadcast;

use retropulse_core::{BoardId, EventEnvelope};

use crate::AppState;

/// WebSocket upgrade handler for `/v1/boards/{id}/ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let board_id = BoardId::parse(&id)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let receiver = {
        let rooms = state.rooms.read().await;
        rooms
            .room(board_id)
            .map(|room| room.subscribe())
            .ok_or_else(|| (StatusCode::NOT_FOUND, format!("not found: {}", board_id)))?
    };

    let heartbeat = Duration::from_secs(u64::from(state.config.server.heartbeat_seconds));
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, receiver, board_id, heartbeat)))
}

async fn handle_socket(
    mut socket: WebSocket,
    mut events: broadcast::Receiver<EventEnvelope>,
    board_id: BoardId,
    heartbeat: Duration,
) {
    tracing::debug!(board = %board_id, "socket subscribed");
    let mut ping = tokio::time::interval(heartbeat);
    // The first tick fires immediately; skip it
    ping.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(envelope) => {
                    let frame = match serde_json::to_string(&envelope) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!("unencodable event: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Missed events are not replayed; force a refetch
                    tracing::warn!(board = %board_id, missed, "socket lagged, closing");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ping.tick() => {
                if socket.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => match msg {
                // Clients only listen; pongs and stray frames are ignored
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }
    tracing::debug!(board = %board_id, "socket closed");
}
