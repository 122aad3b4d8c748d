//! WebSocket upgrade handler
//!
//! Each connection gets a fresh player id and a private outbound channel
//! registered with the room before any inbound frame is forwarded, so the
//! init reply always has somewhere to go.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::RoomEvent;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler. The room is open, no authentication.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4().to_string();
    info!(player_id = %player_id, "new websocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (direct_tx, direct_rx) = mpsc::unbounded_channel::<ServerMsg>();

    let event_tx = state.room.event_tx.clone();
    if event_tx
        .send(RoomEvent::Connected {
            player_id: player_id.clone(),
            tx: direct_tx,
        })
        .await
        .is_err()
    {
        error!(player_id = %player_id, "room task gone, dropping connection");
        return;
    }

    run_session(&player_id, ws_sink, ws_stream, &event_tx, direct_rx).await;

    // transport-level disconnect: the room swaps the player for a bot
    let _ = event_tx
        .send(RoomEvent::Disconnected {
            player_id: player_id.clone(),
        })
        .await;

    info!(player_id = %player_id, "websocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: &str,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    event_tx: &mpsc::Sender<RoomEvent>,
    mut direct_rx: mpsc::UnboundedReceiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Writer task: room events -> WebSocket
    let writer_player_id = player_id.to_string();
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = direct_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %writer_player_id, error = %e, "websocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> room
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(player_id = %player_id, "rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let event = RoomEvent::Message {
                            player_id: player_id.to_string(),
                            msg,
                            received_at: unix_millis(),
                        };
                        if event_tx.send(event).await.is_err() {
                            debug!(player_id = %player_id, "room event channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "websocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
