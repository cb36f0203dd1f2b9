/// WebSocket endpoint for live games.
///
/// Each socket gets an unbounded outbound queue. A writer task drains it into
/// the socket while this task reads commands and hands them to the
/// coordinator, so broadcasts from other connections never wait on this one.
use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::db::GameId;
use crate::error::SessionError;
use crate::session::{ServerMessage, SessionCoordinator, UserGameCommand};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(coordinator): Extension<Arc<SessionCoordinator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}

async fn handle_socket(socket: WebSocket, coordinator: Arc<SessionCoordinator>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut queue) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = queue.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to encode server message: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut registrations: HashSet<(GameId, String)> = HashSet::new();
    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        let command: UserGameCommand = match serde_json::from_str(&text) {
            Ok(c) => c,
            Err(e) => {
                let _ = outbound.send(SessionError::InvalidMessage(e.to_string()).to_message());
                continue;
            }
        };

        registrations.insert((command.game_id, command.auth_token.clone()));
        coordinator.handle(command, &outbound).await;
    }

    coordinator.disconnect(
        registrations.iter().map(|(game_id, credential)| (*game_id, credential.as_str())),
        &outbound,
    );
    writer.abort();
    tracing::debug!("WebSocket closed");
}
