//! Wire messages exchanged over a room's `WebSocket`.
//!
//! Inbound frames are a closed set of actions tagged by `action`; an
//! unknown tag fails to deserialize and is treated as rejected input.
//! Outbound frames are tagged by `type` and always carry the committed
//! room snapshot (except `error`, which goes to one connection only).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::MoveEvent;
use crate::ids::{PieceId, PlayerId};
use crate::structs::Room;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// An action sent by a client.
///
/// ```json
/// {"action": "start_game"}
/// {"action": "roll_dice", "player_id": "…"}
/// {"action": "move_piece", "player_id": "…", "piece_id": 2}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "action", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientAction {
    /// Move the room from the lobby into play.
    StartGame,
    /// Roll the die for the player holding the turn.
    RollDice {
        /// Who claims to be rolling.
        player_id: PlayerId,
    },
    /// Spend the pending roll on one piece.
    MovePiece {
        /// Who claims to be moving.
        player_id: PlayerId,
        /// Which of their pieces to move.
        piece_id: PieceId,
    },
}

impl ClientAction {
    /// Short name for log fields.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartGame => "start_game",
            Self::RollDice { .. } => "roll_dice",
            Self::MovePiece { .. } => "move_piece",
        }
    }
}

// ---------------------------------------------------------------------------
// Move outcome
// ---------------------------------------------------------------------------

/// A piece sent back to its pen by a capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CapturedPiece {
    /// Owner of the captured piece.
    pub player_id: PlayerId,
    /// Which of the owner's pieces it was.
    pub piece_id: PieceId,
}

/// Everything a resolved move changed, besides the snapshot itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoveOutcome {
    /// The mover.
    pub player_id: PlayerId,
    /// The piece that was (or failed to be) moved.
    pub piece_id: PieceId,
    /// The die value that was consumed.
    pub dice: u8,
    /// Track index before the move.
    pub from_index: u8,
    /// Track index after the move.
    pub to_index: u8,
    /// Opposing pieces sent home.
    pub captured: Vec<CapturedPiece>,
    /// Whether the mover keeps the turn.
    pub extra_turn: bool,
    /// Summary tag.
    pub event: MoveEvent,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A message pushed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Current snapshot: sent on connect and after someone joins.
    RoomUpdate {
        /// Committed room state.
        room: Room,
    },
    /// The room left the lobby.
    GameStarted {
        /// Committed room state.
        room: Room,
    },
    /// The current player rolled.
    DiceRolled {
        /// Who rolled.
        player_id: PlayerId,
        /// The value rolled (1-6).
        dice: u8,
        /// Committed room state.
        room: Room,
    },
    /// A move was resolved without ending the game.
    PieceMoved {
        /// `moved` or `captured`.
        event: MoveEvent,
        /// Details of the move.
        outcome: MoveOutcome,
        /// Committed room state.
        room: Room,
    },
    /// A move finished the mover's last piece.
    GameWon {
        /// The winner.
        winner_id: PlayerId,
        /// The winner's display name.
        winner_name: String,
        /// Details of the winning move.
        outcome: MoveOutcome,
        /// Committed room state.
        room: Room,
    },
    /// Rejected input, sent only to the connection that sent it.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// The `type` tag, for log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RoomUpdate { .. } => "room_update",
            Self::GameStarted { .. } => "game_started",
            Self::DiceRolled { .. } => "dice_rolled",
            Self::PieceMoved { .. } => "piece_moved",
            Self::GameWon { .. } => "game_won",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::Color;
    use crate::ids::RoomId;
    use crate::structs::Player;

    #[test]
    fn parses_all_inbound_actions() {
        let start: ClientAction = serde_json::from_str(r#"{"action":"start_game"}"#).unwrap();
        assert_eq!(start, ClientAction::StartGame);

        let id = PlayerId::new();
        let roll: ClientAction =
            serde_json::from_str(&format!(r#"{{"action":"roll_dice","player_id":"{id}"}}"#))
                .unwrap();
        assert_eq!(roll, ClientAction::RollDice { player_id: id });

        let mv: ClientAction = serde_json::from_str(&format!(
            r#"{{"action":"move_piece","player_id":"{id}","piece_id":2}}"#
        ))
        .unwrap();
        assert_eq!(
            mv,
            ClientAction::MovePiece {
                player_id: id,
                piece_id: PieceId(2)
            }
        );
    }

    #[test]
    fn unknown_action_is_an_error() {
        let result: Result<ClientAction, _> = serde_json::from_str(r#"{"action":"cheat"}"#);
        assert!(result.is_err());
        let missing: Result<ClientAction, _> = serde_json::from_str(r#"{"action":"roll_dice"}"#);
        assert!(missing.is_err());
    }

    #[test]
    fn outbound_messages_carry_type_tag() {
        let room = Room::new(
            RoomId::parse("ABCD1234").unwrap(),
            Player::new("Ana", Color::Red),
            4,
        );
        let msg = ServerMessage::RoomUpdate { room };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "room_update");
        assert_eq!(json["room"]["id"], "ABCD1234");
        assert_eq!(json["room"]["phase"], "waiting");
        assert_eq!(msg.kind(), "room_update");
    }
}
