use axum::{
    extract::{State, ws::{WebSocket, WebSocketUpgrade, Message}},
    response::IntoResponse,
};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use futures::{SinkExt, StreamExt};
use crate::api::rest::AppState;

const HEARTBEAT: Duration = Duration::from_secs(10);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Pushes the status object on connect and on every snapshot change.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = state.snapshot.clone();
    let mut heartbeat_ticker = interval(HEARTBEAT);

    let initial = updates.borrow_and_update().status_json();
    if sender.send(Message::Text(initial.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    // Driver gone; nothing more will be published.
                    let _ = sender.send(Message::Close(None)).await;
                    return;
                }
                let msg = updates.borrow_and_update().status_json();

                match tokio::time::timeout(
                    SEND_TIMEOUT,
                    sender.send(Message::Text(msg.to_string()))
                ).await {
                    Ok(Ok(_)) => {},
                    _ => return,
                }
            }

            _ = heartbeat_ticker.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    return;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(cmd) = serde_json::from_str::<serde_json::Value>(&text) {
                            if cmd["type"] == "refresh" {
                                state.refresh.notify_one();
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
