use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::ws::hub::SubscriptionHub;

/// Longest client identifier accepted on `/ws/{client_id}`.
const MAX_CLIENT_ID_LEN: usize = 128;

/// GET /ws -- anonymous subscription, receives broadcasts only.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub, None))
}

/// GET /ws/{client_id} -- subscription addressable by `client_id`.
pub async fn ws_client_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    if client_id.trim().is_empty() || client_id.len() > MAX_CLIENT_ID_LEN {
        return Err(AppError::BadRequest(format!(
            "client_id must be 1 to {MAX_CLIENT_ID_LEN} characters"
        )));
    }
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state.hub, Some(client_id)))
        .into_response())
}

/// Manage a single WebSocket connection after upgrade.
///
/// Outbound messages are forwarded from the hub channel by a spawned task;
/// inbound frames are read on this task only to notice disconnects.
async fn handle_socket(socket: WebSocket, hub: Arc<SubscriptionHub>, client_id: Option<String>) {
    let (subscription_id, mut rx) = hub.connect(client_id.clone());
    let client = client_id.as_deref().unwrap_or("-").to_string();
    tracing::info!(
        subscription_id = %subscription_id,
        client_id = %client,
        "WebSocket connected"
    );

    let (mut sink, mut stream) = socket.split();

    let sender_subscription_id = subscription_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(
                    subscription_id = %sender_subscription_id,
                    "WebSocket sink closed"
                );
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(subscription_id = %subscription_id, "Pong received");
            }
            // Client frames carry no commands; anything else is keep-alive.
            Ok(_msg) => {}
            Err(e) => {
                tracing::debug!(
                    subscription_id = %subscription_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
        }
    }

    hub.disconnect(&subscription_id);
    send_task.abort();
    tracing::info!(
        subscription_id = %subscription_id,
        client_id = %client,
        "WebSocket disconnected"
    );
}
