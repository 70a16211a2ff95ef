//! `WebSocket` connection boundary.
//!
//! Clients connect to `GET /ws/{room_id}`. The connection is registered
//! with the room's hub and immediately receives a `room_update`. Each
//! text frame is parsed as a [`ClientAction`] and handed to the
//! coordinator; results reach the client through the room broadcast, not
//! as direct replies.
//!
//! The socket is split. A writer task drains the connection's bounded
//! outbound queue into the sink with a per-send timeout; if a send fails
//! or stalls the writer exits, its queue closes, and the next broadcast
//! prunes the connection. The reader loop ends when the client closes,
//! the socket errors, or the writer is gone.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use ludo_types::{ClientAction, RoomId, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coordinator::{Connection, Dispatch};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::StoreError;

/// Upgrade to a `WebSocket` bound to one room.
///
/// Unknown rooms are refused with 404 before any upgrade happens.
///
/// # Route
///
/// `GET /ws/{room_id}`
pub async fn ws_room(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(raw): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let room_id = match RoomId::parse(&raw) {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };
    if state.store.get(&room_id).await.is_none() {
        return ApiError::from(StoreError::RoomNotFound(room_id)).into_response();
    }
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, room_id)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Run one connection until either side goes away.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room_id: RoomId) {
    let settings = state.store.settings();
    let (tx, mut rx) = mpsc::channel::<String>(settings.outbound_buffer);
    let send_timeout = Duration::from_millis(settings.send_timeout_ms);

    let connection = match state.coordinator.connect(&room_id, tx).await {
        Ok(connection) => connection,
        Err(e) => {
            debug!(%room_id, error = %e, "Room vanished before registration");
            return;
        }
    };
    debug!(%room_id, connection = %connection.id, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            match tokio::time::timeout(send_timeout, sink.send(Message::Text(text.into()))).await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("WebSocket send failed: {e}");
                    return;
                }
                Err(_) => {
                    warn!(timeout_ms = send_timeout.as_millis(), "WebSocket send timed out");
                    return;
                }
            }
        }
        // Queue closed: the room is gone or the connection was pruned.
        if let Err(e) = sink.close().await {
            debug!("WebSocket close failed: {e}");
        }
    });

    loop {
        tokio::select! {
            _ = &mut writer => {
                debug!(connection = %connection.id, "Writer finished, ending session");
                break;
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(&state, &connection, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(connection = %connection.id, "WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(connection = %connection.id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Pings are answered by the protocol layer; binary is ignored.
                    }
                }
            }
        }
    }

    state.coordinator.disconnect(&connection).await;
    writer.abort();
}

/// Parse and dispatch one inbound text frame.
async fn handle_text(state: &AppState, connection: &Connection, text: &str) {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            warn!(connection = %connection.id, "Rejected malformed action: {e}");
            let reply = ServerMessage::Error {
                message: format!("invalid action: {e}"),
            };
            state.coordinator.reply(connection, &reply).await;
            return;
        }
    };

    match state.coordinator.handle(&connection.room_id, action).await {
        Ok(Dispatch::Applied(_) | Dispatch::Ignored(_)) => {}
        Ok(Dispatch::Faulted) => {
            let reply = ServerMessage::Error {
                message: format!("room {} is unavailable", connection.room_id),
            };
            state.coordinator.reply(connection, &reply).await;
        }
        Err(e) => debug!(connection = %connection.id, error = %e, "Action for missing room"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ludo_types::PlayerId;
    use serde_json::Value;

    struct Session {
        state: AppState,
        connection: Connection,
        rx: mpsc::Receiver<String>,
        host: PlayerId,
        guest: PlayerId,
    }

    /// A started two-player room with one connected viewer whose
    /// snapshot has already been read.
    async fn session() -> Session {
        let state = AppState::default();
        let (room_id, host) = state.store.create_room("Ana").await.unwrap();
        let guest = state.coordinator.join_room(&room_id, "Ben").await.unwrap();
        state
            .coordinator
            .handle(&room_id, ClientAction::StartGame)
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let connection = state.coordinator.connect(&room_id, tx).await.unwrap();
        rx.recv().await.unwrap();
        Session {
            state,
            connection,
            rx,
            host,
            guest,
        }
    }

    fn roll(player_id: PlayerId) -> String {
        format!(r#"{{"action":"roll_dice","player_id":"{player_id}"}}"#)
    }

    fn next(rx: &mut mpsc::Receiver<String>) -> Value {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn unknown_action_gets_error_reply() {
        let mut s = session().await;
        handle_text(&s.state, &s.connection, r#"{"action":"cheat"}"#).await;
        let reply = next(&mut s.rx);
        assert_eq!(reply["type"], "error");
        assert!(reply["message"].as_str().unwrap().starts_with("invalid action"));
        assert!(s.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_json_gets_error_reply() {
        let mut s = session().await;
        handle_text(&s.state, &s.connection, "not json at all").await;
        assert_eq!(next(&mut s.rx)["type"], "error");

        // A known action missing its fields is rejected the same way.
        handle_text(&s.state, &s.connection, r#"{"action":"move_piece"}"#).await;
        assert_eq!(next(&mut s.rx)["type"], "error");
    }

    #[tokio::test]
    async fn rule_violation_sends_nothing() {
        let mut s = session().await;
        handle_text(&s.state, &s.connection, &roll(s.guest)).await;
        assert!(s.rx.try_recv().is_err());

        handle_text(&s.state, &s.connection, &roll(s.host)).await;
        assert_eq!(next(&mut s.rx)["type"], "dice_rolled");
    }

    #[tokio::test]
    async fn faulted_room_gets_error_reply() {
        let mut s = session().await;
        {
            let slot = s.state.store.slot(&s.connection.room_id).await.unwrap();
            slot.lock().await.room.turn_index = 9;
        }
        handle_text(&s.state, &s.connection, &roll(s.host)).await;
        let reply = next(&mut s.rx);
        assert_eq!(reply["type"], "error");
        assert!(reply["message"].as_str().unwrap().contains("unavailable"));

        // Still refused on the next action.
        handle_text(&s.state, &s.connection, &roll(s.host)).await;
        assert_eq!(next(&mut s.rx)["type"], "error");
    }
}
