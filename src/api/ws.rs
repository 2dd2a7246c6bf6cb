//! WebSocket endpoint.
//!
//! The upgrade request is authenticated from the session cookie before the
//! socket is accepted. The socket itself never touches the cookie.

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::{AuthState, inspect};

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Authenticated WebSocket user info.
#[derive(Debug, Clone, Serialize)]
pub struct WsUser {
    pub uuid: String,
    pub username: String,
}

/// Messages sent from server to client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established with user info
    Connected { user: WsUser },
    /// Ping to keep connection alive
    Ping,
}

pub fn router(state: AuthState) -> Router {
    Router::new().route("/", get(ws_handler)).with_state(state)
}

async fn ws_handler(
    State(state): State<AuthState>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let current = match inspect(&headers, &state).await {
        Ok(current) => current,
        Err(rejection) => return rejection.into_response(),
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Expected WebSocket upgrade").into_response();
        }
    };

    let ws_user = WsUser {
        uuid: current.user.uuid,
        username: current.user.username,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, ws_user))
}

async fn handle_socket(mut socket: WebSocket, user: WsUser) {
    info!(user_id = %user.uuid, "WebSocket connected");

    let connected = ServerMessage::Connected { user: user.clone() };
    if send(&mut socket, &connected).await.is_err() {
        return;
    }

    let mut ping = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if send(&mut socket, &ServerMessage::Ping).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!(user_id = %user.uuid, "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to encode socket message");
            Ok(())
        }
    }
}
