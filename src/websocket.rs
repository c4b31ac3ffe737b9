use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use uuid::Uuid;

use crate::actions::ServerMessage;
use crate::manager::Lobby;
use crate::player_system::{channel, PlayerLink};

/// Upgrades `GET /ws` and puts the new player in the lobby.
pub async fn ws_handler(ws: WebSocketUpgrade, State(lobby): State<Arc<Lobby>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, lobby))
}

async fn handle_socket(socket: WebSocket, lobby: Arc<Lobby>) {
    let player_id = format!("player_{}", Uuid::new_v4());
    log::info!("🔌 WebSocket connected: {}", player_id);

    let (port, link) = channel(player_id.clone());
    if let Err(e) = lobby.join(Arc::new(port)).await {
        log::error!("❌ Could not seat {}: {}", player_id, e);
        return;
    }

    bridge(socket, link).await;
    log::info!("WebSocket connection {} terminated", player_id);
}

/// Pumps messages between a socket and a player link until either side hangs up.
pub async fn bridge(socket: WebSocket, mut link: PlayerLink) {
    let (mut sender, mut receiver) = socket.split();
    let responder = link.responder();
    let player_id = link.player_id().clone();

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = link.next_message().await {
            let game_over = matches!(message, ServerMessage::GameOver { .. });
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break; // Client disconnected
                    }
                }
                Err(e) => log::error!("Failed to serialize message: {}", e),
            }
            if game_over {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    });

    let reader_responder = responder.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => {
                    reader_responder.respond(text.to_string());
                }
                Message::Close(_) => {
                    log::info!("WebSocket closed by {}", player_id);
                    break;
                }
                _ => {
                    // Ping, pong and binary frames carry no moves.
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }
    responder.close();
}
