use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{api::state::AppState, realtime::RealtimeHub};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// WebSocket endpoint. The client authenticates the connection with its
/// session token at connect time; sockets without a valid token stay open
/// but are never joined to a user group, so they receive nothing.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_id = params
        .token
        .as_deref()
        .and_then(|token| state.tokens.verify(token).ok())
        .map(|claims| claims.sub);

    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, user_id))
}

async fn handle_socket(socket: WebSocket, hub: Arc<RealtimeHub>, user_id: Option<Uuid>) {
    let Some(user_id) = user_id else {
        drain(socket).await;
        return;
    };

    let (session_id, mut events) = hub.subscribe(user_id).await;
    tracing::debug!(%user_id, session_id, "Realtime session opened");

    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    // Clients only listen on this channel; inbound frames
                    // other than close/ping are ignored.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unsubscribe(user_id, session_id).await;
    tracing::debug!(%user_id, session_id, "Realtime session closed");
}

async fn drain(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.next().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}
