//! Session coordinator: serialized access to each room.
//!
//! Every mutation of a room goes through here. The coordinator takes the
//! room's lock (Idle -> Busy), runs the rules engine against the
//! authoritative state, and, if the action applied, queues the resulting
//! message for every viewer before releasing the lock (Busy -> Idle).
//! Because the lock is FIFO, concurrent actions for one room run one at
//! a time in arrival order, and every viewer sees each action's broadcast
//! before the next action's. Rooms never share a lock.
//!
//! Rule violations are logged and dropped. An invariant violation marks
//! the room faulted; later actions for it are refused while every other
//! room carries on.

use std::sync::Arc;

use ludo_core::engine::{self, EngineError, Rejection};
use ludo_types::{
    ClientAction, MoveEvent, Player, PlayerId, Room, RoomId, RoomPhase, ServerMessage,
};
use tracing::{debug, error, info, warn};

use crate::hub::{ConnectionId, Outbound};
use crate::store::{RoomStore, StoreError};

/// What became of one inbound action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The action applied; this message was broadcast.
    Applied(ServerMessage),
    /// A rule violation; nothing changed and nothing was sent.
    Ignored(Rejection),
    /// The room is quarantined and refuses actions.
    Faulted,
}

/// A registered viewer of a room.
///
/// Holds the room code rather than the slot, so an evicted room's
/// connection queues are dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// The connection's identifier within the hub.
    pub id: ConnectionId,
    /// The room it views.
    pub room_id: RoomId,
}

/// Serializes actions per room and relays the results.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    store: Arc<RoomStore>,
}

impl SessionCoordinator {
    /// Create a coordinator over `store`.
    pub const fn new(store: Arc<RoomStore>) -> Self {
        Self { store }
    }

    /// The underlying room store.
    pub const fn store(&self) -> &Arc<RoomStore> {
        &self.store
    }

    /// Seat a new player in a waiting room and tell its viewers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`], [`StoreError::RoomFull`],
    /// [`StoreError::GameAlreadyStarted`], [`StoreError::RoomUnavailable`],
    /// or [`StoreError::InvalidInput`] for a bad name.
    pub async fn join_room(
        &self,
        room_id: &RoomId,
        player_name: &str,
    ) -> Result<PlayerId, StoreError> {
        let name = self.store.validate_name(player_name)?;
        let slot = self.store.slot(room_id).await?;
        let mut state = slot.lock().await;
        if state.faulted {
            return Err(StoreError::RoomUnavailable(room_id.clone()));
        }
        if state.room.phase != RoomPhase::Waiting {
            return Err(StoreError::GameAlreadyStarted(room_id.clone()));
        }
        let color = state
            .room
            .next_color()
            .ok_or_else(|| StoreError::RoomFull(room_id.clone()))?;

        let player = Player::new(name, color);
        let player_id = player.id;
        state.room.players.push(player);
        state.touch();
        info!(%room_id, %player_id, %color, seats = state.room.players.len(), "Player joined");

        slot.broadcast(&ServerMessage::RoomUpdate {
            room: state.room.clone(),
        })
        .await;
        Ok(player_id)
    }

    /// Register a viewer and send it the current snapshot.
    ///
    /// A new viewer counts as activity for idle eviction.
    ///
    /// The snapshot is queued while the room is locked, so it is ordered
    /// before any broadcast from a later action.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`] if no such room exists.
    pub async fn connect(&self, room_id: &RoomId, tx: Outbound) -> Result<Connection, StoreError> {
        let slot = self.store.slot(room_id).await?;
        let id = self.store.next_connection_id();
        let mut state = slot.lock().await;
        state.touch();
        slot.register(id, tx).await;
        slot.send_to(
            id,
            &ServerMessage::RoomUpdate {
                room: state.room.clone(),
            },
        )
        .await;
        drop(state);
        Ok(Connection {
            id,
            room_id: room_id.clone(),
        })
    }

    /// Remove a viewer. Not an error if it or its room is already gone.
    pub async fn disconnect(&self, connection: &Connection) {
        if let Some(slot) = self.store.get(&connection.room_id).await {
            slot.unregister(connection.id).await;
        }
    }

    /// Send `message` to one viewer only. Returns whether it was queued.
    pub async fn reply(&self, connection: &Connection, message: &ServerMessage) -> bool {
        match self.store.get(&connection.room_id).await {
            Some(slot) => slot.send_to(connection.id, message).await,
            None => false,
        }
    }

    /// Apply one inbound action to a room.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RoomNotFound`] if the room no longer exists.
    pub async fn handle(
        &self,
        room_id: &RoomId,
        action: ClientAction,
    ) -> Result<Dispatch, StoreError> {
        let slot = self.store.slot(room_id).await?;
        let mut state = slot.lock().await;

        if state.faulted {
            warn!(%room_id, action = action.name(), "Action for faulted room refused");
            return Ok(Dispatch::Faulted);
        }

        let action_name = action.name();
        match apply(&mut state.room, action) {
            Ok(message) => {
                state.touch();
                slot.broadcast(&message).await;
                Ok(Dispatch::Applied(message))
            }
            Err(EngineError::Rejected(reason)) => {
                debug!(%room_id, action = action_name, %reason, "Action ignored");
                Ok(Dispatch::Ignored(reason))
            }
            Err(err @ EngineError::CorruptState(_)) => {
                error!(%room_id, action = action_name, error = %err, "Room quarantined");
                state.faulted = true;
                Ok(Dispatch::Faulted)
            }
        }
    }
}

/// Run one action through the engine and build the message to relay.
fn apply(room: &mut Room, action: ClientAction) -> Result<ServerMessage, EngineError> {
    match action {
        ClientAction::StartGame => {
            engine::start_game(room)?;
            info!(room_id = %room.id, players = room.players.len(), "Game started");
            Ok(ServerMessage::GameStarted { room: room.clone() })
        }
        ClientAction::RollDice { player_id } => {
            let dice = engine::roll_dice(room, player_id, &mut rand::rng())?;
            debug!(room_id = %room.id, %player_id, dice, "Dice rolled");
            Ok(ServerMessage::DiceRolled {
                player_id,
                dice,
                room: room.clone(),
            })
        }
        ClientAction::MovePiece {
            player_id,
            piece_id,
        } => {
            let outcome = engine::move_piece(room, player_id, piece_id)?;
            if outcome.event == MoveEvent::Won {
                let winner_name = room
                    .player(player_id)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_default();
                info!(room_id = %room.id, %player_id, winner = %winner_name, "Game won");
                return Ok(ServerMessage::GameWon {
                    winner_id: player_id,
                    winner_name,
                    outcome,
                    room: room.clone(),
                });
            }
            Ok(ServerMessage::PieceMoved {
                event: outcome.event,
                outcome,
                room: room.clone(),
            })
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use ludo_core::config::RoomsConfig;
    use ludo_types::{PieceId, PiecePhase};
    use tokio::sync::mpsc;

    async fn setup(players: &[&str]) -> (SessionCoordinator, RoomId, Vec<PlayerId>) {
        let store = Arc::new(RoomStore::new(RoomsConfig::default()));
        let coordinator = SessionCoordinator::new(store);
        let (room_id, host) = coordinator.store().create_room(players[0]).await.unwrap();
        let mut ids = vec![host];
        for name in &players[1..] {
            ids.push(coordinator.join_room(&room_id, name).await.unwrap());
        }
        (coordinator, room_id, ids)
    }

    async fn started(players: &[&str]) -> (SessionCoordinator, RoomId, Vec<PlayerId>) {
        let (coordinator, room_id, ids) = setup(players).await;
        let result = coordinator
            .handle(&room_id, ClientAction::StartGame)
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Applied(ServerMessage::GameStarted { .. })));
        (coordinator, room_id, ids)
    }

    fn parse(text: &str) -> serde_json::Value {
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test]
    async fn join_assigns_colors_in_order_and_fills_up() {
        let (coordinator, room_id, _) = setup(&["Ana", "Ben", "Cy", "Di"]).await;
        let room = coordinator.store().snapshot(&room_id).await.unwrap();
        let colors: Vec<_> = room.players.iter().map(|p| p.color).collect();
        assert_eq!(colors, ludo_types::Color::ALL.to_vec());
        assert_eq!(
            coordinator.join_room(&room_id, "Eve").await,
            Err(StoreError::RoomFull(room_id.clone()))
        );
    }

    #[tokio::test]
    async fn join_after_start_is_refused() {
        let (coordinator, room_id, _) = started(&["Ana", "Ben"]).await;
        assert_eq!(
            coordinator.join_room(&room_id, "Cy").await,
            Err(StoreError::GameAlreadyStarted(room_id.clone()))
        );
    }

    #[tokio::test]
    async fn start_with_one_player_is_ignored() {
        let (coordinator, room_id, _) = setup(&["Ana"]).await;
        let result = coordinator
            .handle(&room_id, ClientAction::StartGame)
            .await
            .unwrap();
        assert_eq!(result, Dispatch::Ignored(Rejection::NotEnoughPlayers));
    }

    #[tokio::test]
    async fn connect_sends_snapshot_to_new_viewer() {
        let (coordinator, room_id, _) = setup(&["Ana"]).await;
        let (tx, mut rx) = mpsc::channel(8);
        let conn = coordinator.connect(&room_id, tx).await.unwrap();
        let first = parse(&rx.recv().await.unwrap());
        assert_eq!(first["type"], "room_update");
        assert_eq!(first["room"]["id"], room_id.as_str());
        let slot = coordinator.store().slot(&room_id).await.unwrap();
        assert_eq!(slot.connection_count().await, 1);

        assert!(
            coordinator
                .reply(&conn, &ServerMessage::Error { message: "only you".to_owned() })
                .await
        );
        assert_eq!(parse(&rx.recv().await.unwrap())["message"], "only you");

        coordinator.disconnect(&conn).await;
        assert_eq!(slot.connection_count().await, 0);
        // Disconnecting twice is harmless.
        coordinator.disconnect(&conn).await;
    }

    #[tokio::test]
    async fn failed_direct_send_leaves_pruning_to_broadcast() {
        let (coordinator, room_id, ids) = started(&["Ana", "Ben"]).await;
        // Capacity one: the snapshot fills the queue.
        let (tx, _rx) = mpsc::channel(1);
        let conn = coordinator.connect(&room_id, tx).await.unwrap();
        let slot = coordinator.store().slot(&room_id).await.unwrap();

        let message = ServerMessage::Error {
            message: "no room".to_owned(),
        };
        assert!(!coordinator.reply(&conn, &message).await);
        assert_eq!(slot.connection_count().await, 1);

        coordinator
            .handle(&room_id, ClientAction::RollDice { player_id: ids[0] })
            .await
            .unwrap();
        assert_eq!(slot.connection_count().await, 0);
    }

    #[tokio::test]
    async fn connecting_keeps_a_lobby_alive() {
        let (coordinator, room_id, _) = setup(&["Ana"]).await;
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        let (tx, _rx) = mpsc::channel(8);
        coordinator.connect(&room_id, tx).await.unwrap();

        let evicted = coordinator
            .store()
            .evict_idle(std::time::Duration::from_millis(20))
            .await;
        assert!(evicted.is_empty());
        assert!(coordinator.store().get(&room_id).await.is_some());
    }

    #[tokio::test]
    async fn evicting_a_room_closes_its_queues() {
        let (coordinator, room_id, _) = setup(&["Ana"]).await;
        let (tx, mut rx) = mpsc::channel(8);
        let conn = coordinator.connect(&room_id, tx).await.unwrap();
        rx.recv().await.unwrap();

        assert!(coordinator.store().remove(&room_id).await);
        assert!(rx.recv().await.is_none());
        assert!(!coordinator.reply(&conn, &ServerMessage::Error { message: "gone".to_owned() }).await);
        coordinator.disconnect(&conn).await;
    }

    #[tokio::test]
    async fn join_is_broadcast_to_viewers() {
        let (coordinator, room_id, _) = setup(&["Ana"]).await;
        let (tx, mut rx) = mpsc::channel(8);
        coordinator.connect(&room_id, tx).await.unwrap();
        rx.recv().await.unwrap();

        coordinator.join_room(&room_id, "Ben").await.unwrap();
        let update = parse(&rx.recv().await.unwrap());
        assert_eq!(update["type"], "room_update");
        assert_eq!(update["room"]["players"][1]["name"], "Ben");
        assert_eq!(update["room"]["players"][1]["color"], "blue");
    }

    #[tokio::test]
    async fn roll_is_broadcast_and_out_of_turn_is_silent() {
        let (coordinator, room_id, ids) = started(&["Ana", "Ben"]).await;
        let (tx, mut rx) = mpsc::channel(8);
        coordinator.connect(&room_id, tx).await.unwrap();
        rx.recv().await.unwrap();

        let ignored = coordinator
            .handle(&room_id, ClientAction::RollDice { player_id: ids[1] })
            .await
            .unwrap();
        assert_eq!(ignored, Dispatch::Ignored(Rejection::NotYourTurn));
        assert!(rx.try_recv().is_err());

        let applied = coordinator
            .handle(&room_id, ClientAction::RollDice { player_id: ids[0] })
            .await
            .unwrap();
        let Dispatch::Applied(ServerMessage::DiceRolled { dice, .. }) = applied else {
            panic!("expected dice_rolled, got {applied:?}");
        };
        let pushed = parse(&rx.recv().await.unwrap());
        assert_eq!(pushed["type"], "dice_rolled");
        assert_eq!(pushed["dice"], dice);
        assert_eq!(pushed["room"]["pending_dice"], dice);
    }

    #[tokio::test]
    async fn broadcast_prunes_dead_viewer_and_reaches_the_rest() {
        let (coordinator, room_id, ids) = started(&["Ana", "Ben"]).await;
        let mut live = Vec::new();
        let mut conns = Vec::new();
        for _ in 0..3 {
            let (tx, mut rx) = mpsc::channel(8);
            conns.push(coordinator.connect(&room_id, tx).await.unwrap());
            rx.recv().await.unwrap();
            live.push(rx);
        }
        // The second viewer vanishes without saying goodbye.
        let dead = live.remove(1);
        drop(dead);

        coordinator
            .handle(&room_id, ClientAction::RollDice { player_id: ids[0] })
            .await
            .unwrap();

        for rx in &mut live {
            assert_eq!(parse(&rx.recv().await.unwrap())["type"], "dice_rolled");
        }
        let slot = coordinator.store().slot(&room_id).await.unwrap();
        assert_eq!(slot.connection_count().await, 2);
        assert_eq!(conns.len(), 3);
    }

    #[tokio::test]
    async fn concurrent_moves_never_both_apply() {
        let (coordinator, room_id, ids) = started(&["Ana", "Ben"]).await;
        {
            let slot = coordinator.store().slot(&room_id).await.unwrap();
            let mut state = slot.lock().await;
            state.room.pending_dice = Some(3);
        }

        let mut tasks = Vec::new();
        for piece in 0..4u8 {
            let coordinator = coordinator.clone();
            let room_id = room_id.clone();
            let player_id = ids[0];
            tasks.push(tokio::spawn(async move {
                coordinator
                    .handle(
                        &room_id,
                        ClientAction::MovePiece {
                            player_id,
                            piece_id: PieceId(piece),
                        },
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for task in tasks {
            match task.await.unwrap() {
                Dispatch::Applied(_) => applied += 1,
                Dispatch::Ignored(reason) => {
                    assert!(matches!(
                        reason,
                        Rejection::NoPendingRoll | Rejection::NotYourTurn
                    ));
                }
                Dispatch::Faulted => panic!("room should not fault"),
            }
        }
        assert_eq!(applied, 1);
        let room = coordinator.store().snapshot(&room_id).await.unwrap();
        assert_eq!(room.pending_dice, None);
        assert_eq!(room.turn_index, 1);
    }

    #[tokio::test]
    async fn corrupt_room_is_quarantined_alone() {
        let (coordinator, bad_room, bad_ids) = started(&["Ana", "Ben"]).await;
        let (other_room, other_host) = coordinator.store().create_room("Cy").await.unwrap();
        coordinator.join_room(&other_room, "Di").await.unwrap();
        coordinator
            .handle(&other_room, ClientAction::StartGame)
            .await
            .unwrap();

        {
            let slot = coordinator.store().slot(&bad_room).await.unwrap();
            slot.lock().await.room.turn_index = 9;
        }
        let first = coordinator
            .handle(&bad_room, ClientAction::RollDice { player_id: bad_ids[0] })
            .await
            .unwrap();
        assert_eq!(first, Dispatch::Faulted);

        // Repairing the index does not revive it.
        {
            let slot = coordinator.store().slot(&bad_room).await.unwrap();
            slot.lock().await.room.turn_index = 0;
        }
        let again = coordinator
            .handle(&bad_room, ClientAction::RollDice { player_id: bad_ids[0] })
            .await
            .unwrap();
        assert_eq!(again, Dispatch::Faulted);

        let fine = coordinator
            .handle(&other_room, ClientAction::RollDice { player_id: other_host })
            .await
            .unwrap();
        assert!(matches!(fine, Dispatch::Applied(_)));
    }

    #[tokio::test]
    async fn winning_move_broadcasts_game_won_once() {
        let (coordinator, room_id, ids) = started(&["Ana", "Ben"]).await;
        {
            let slot = coordinator.store().slot(&room_id).await.unwrap();
            let mut state = slot.lock().await;
            for piece in &mut state.room.players[0].pieces {
                piece.phase = PiecePhase::Finished;
                piece.progress = 56;
                piece.track_index = 57;
            }
            let last = &mut state.room.players[0].pieces[3];
            last.phase = PiecePhase::OnTrack;
            last.progress = 51;
            last.track_index = 52;
            state.room.pending_dice = Some(5);
        }
        let (tx, mut rx) = mpsc::channel(8);
        coordinator.connect(&room_id, tx).await.unwrap();
        rx.recv().await.unwrap();

        let result = coordinator
            .handle(
                &room_id,
                ClientAction::MovePiece {
                    player_id: ids[0],
                    piece_id: PieceId(3),
                },
            )
            .await
            .unwrap();
        assert!(matches!(result, Dispatch::Applied(ServerMessage::GameWon { .. })));
        let pushed = parse(&rx.recv().await.unwrap());
        assert_eq!(pushed["type"], "game_won");
        assert_eq!(pushed["winner_name"], "Ana");
        assert_eq!(pushed["room"]["phase"], "finished");

        let after = coordinator
            .handle(&room_id, ClientAction::RollDice { player_id: ids[0] })
            .await
            .unwrap();
        assert_eq!(after, Dispatch::Ignored(Rejection::GameFinished));
        assert!(rx.try_recv().is_err());
        let room = coordinator.store().snapshot(&room_id).await.unwrap();
        assert_eq!(room.phase, RoomPhase::Finished);
    }

    #[tokio::test]
    async fn unknown_room_is_an_error() {
        let (coordinator, _, _) = setup(&["Ana"]).await;
        let missing = RoomId::parse("ZZZZ9999").unwrap();
        assert_eq!(
            coordinator.handle(&missing, ClientAction::StartGame).await,
            Err(StoreError::RoomNotFound(missing))
        );
    }
}
