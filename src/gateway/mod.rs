pub mod events;
pub mod heartbeat;
pub mod ingest;
pub mod registry;
pub mod session;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::StreamExt;

use crate::middleware::auth::bearer_token;
use crate::state::AppState;
use events::ConnectParams;

/// `GET /ws`: upgrades and hands the socket to a session task. The token may
/// come from `?token=` or an `Authorization: Bearer` header.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let credential = params.token.or_else(|| {
        headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string)
    });

    ws.on_upgrade(move |socket| handle_socket(socket, state, credential))
}

async fn handle_socket(socket: WebSocket, state: AppState, credential: Option<String>) {
    let (ws_sink, ws_stream) = socket.split();
    session::serve_connection(state, credential, ws_stream, ws_sink).await;
}
