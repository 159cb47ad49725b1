//! Axum HTTP + WebSocket gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::{Json, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::shutdown::ShutdownCoordinator;
use crate::sync::SyncService;
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::connection::ClientConnection;
use crate::websocket::handler::handle_message;

/// Per-connection outbound buffer. Slow clients overflow this and start
/// accruing drops against the disconnect budget.
const SEND_BUFFER: usize = 256;

/// Shared state accessible from route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Fan-out manager.
    pub broadcast: Arc<BroadcastManager>,
    /// Reconnection sync history.
    pub sync: Arc<SyncService>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the gateway started.
    pub start_time: Instant,
    /// Model the gateway reports as configured.
    pub model: String,
}

/// GET /health response body.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    connections: usize,
    model: String,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.start_time.elapsed().as_secs(),
        connections: state.broadcast.connection_count(),
        model: state.model.clone(),
    })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection: a write task draining the outbound
/// channel, and a read loop dispatching console messages until the socket
/// closes or the gateway shuts down.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<String>>(SEND_BUFFER);

    let conn_id = format!("conn_{}", Uuid::now_v7());
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), tx));
    state.broadcast.add(Arc::clone(&connection)).await;
    info!(%conn_id, "console connected");

    let write_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_tx
                .send(Message::Text(message.as_str().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let cancel = state.shutdown.token();
    loop {
        let incoming = tokio::select! {
            () = cancel.cancelled() => break,
            incoming = ws_rx.next() => incoming,
        };
        let Some(Ok(message)) = incoming else {
            break;
        };

        match message {
            Message::Text(text) => {
                if let Some(reply) = handle_message(text.as_str(), &connection, &state.sync) {
                    match serde_json::to_string(&reply) {
                        Ok(json) => {
                            if !connection.send(Arc::new(json)) {
                                warn!(%conn_id, "reply dropped, channel full");
                            }
                        }
                        Err(err) => warn!(%conn_id, error = %err, "failed to serialize reply"),
                    }
                }
            }
            Message::Close(_) => break,
            // Pings are answered by axum; everything else is ignored.
            _ => {}
        }
    }

    state.broadcast.remove(&conn_id).await;
    write_task.abort();
    debug!(%conn_id, "console disconnected");
}
