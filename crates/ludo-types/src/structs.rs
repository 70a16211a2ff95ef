//! Core entity structs: [`Piece`], [`Player`], and [`Room`].
//!
//! These are plain data. All rule logic lives in `ludo-core`; all
//! concurrency lives in `ludo-server`. The structs serialize directly
//! into the `room` field of every outbound message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Color, PiecePhase, RoomPhase};
use crate::ids::{PieceId, PlayerId, RoomId};

/// Number of pieces every player owns.
pub const PIECES_PER_PLAYER: u8 = 4;

/// Track index of a piece that has not left its pen.
pub const UNSTARTED_INDEX: u8 = 0;

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// One of a player's four tokens.
///
/// `track_index` is the absolute shared-ring cell (1-52) while the piece
/// is on the ring, and `progress + 1` (52-57) once it is in its color's
/// home stretch. `progress` counts the steps traveled from the color's
/// entry cell and disambiguates the two ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Piece {
    /// Stable index within the owner's pieces.
    pub id: PieceId,
    /// Board position (see type docs).
    pub track_index: u8,
    /// Steps traveled since leaving the pen.
    pub progress: u8,
    /// Lifecycle phase.
    pub phase: PiecePhase,
}

impl Piece {
    /// A piece sitting in its starting pen.
    pub const fn at_home(id: PieceId) -> Self {
        Self {
            id,
            track_index: UNSTARTED_INDEX,
            progress: 0,
            phase: PiecePhase::AtHome,
        }
    }

    /// Send the piece back to its pen (after being captured).
    pub const fn send_home(&mut self) {
        self.track_index = UNSTARTED_INDEX;
        self.progress = 0;
        self.phase = PiecePhase::AtHome;
    }

    /// Whether the piece has reached the terminal index.
    pub fn is_finished(&self) -> bool {
        self.phase == PiecePhase::Finished
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One seat in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Player {
    /// Identifier handed back to the client on create/join.
    pub id: PlayerId,
    /// Name shown to the other players.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Seat color, fixed for the room's lifetime.
    pub color: Color,
    /// Exactly [`PIECES_PER_PLAYER`] pieces.
    pub pieces: Vec<Piece>,
}

impl Player {
    /// Seat a new player with all pieces at home.
    pub fn new(display_name: impl Into<String>, color: Color) -> Self {
        Self {
            id: PlayerId::new(),
            display_name: display_name.into(),
            color,
            pieces: (0..PIECES_PER_PLAYER)
                .map(|i| Piece::at_home(PieceId(i)))
                .collect(),
        }
    }

    /// Look up one of this player's pieces.
    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    /// Mutable lookup of one of this player's pieces.
    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.iter_mut().find(|p| p.id == id)
    }

    /// True once every piece is [`PiecePhase::Finished`].
    pub fn all_finished(&self) -> bool {
        !self.pieces.is_empty() && self.pieces.iter().all(Piece::is_finished)
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// Authoritative state of one game session.
///
/// `players` is in join order, which is also turn order and color order.
/// `turn_index` always points into `players`: players never leave, and
/// the engine only ever advances it modulo the current length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Room {
    /// Canonical room code.
    pub id: RoomId,
    /// Seated players in join order.
    pub players: Vec<Player>,
    /// Whose turn it is, as an index into `players`.
    pub turn_index: usize,
    /// Last roll, waiting to be spent on a move.
    pub pending_dice: Option<u8>,
    /// Lifecycle phase.
    pub phase: RoomPhase,
    /// Set once, when the room enters [`RoomPhase::Finished`].
    pub winner: Option<PlayerId>,
    /// Seat limit for this room.
    pub max_players: usize,
    /// When the room was created.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Open a room in the lobby with its creator seated first.
    pub fn new(id: RoomId, host: Player, max_players: usize) -> Self {
        Self {
            id,
            players: vec![host],
            turn_index: 0,
            pending_dice: None,
            phase: RoomPhase::Waiting,
            winner: None,
            max_players,
            created_at: Utc::now(),
        }
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.turn_index)
    }

    /// Look up a seated player.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Whether every seat is taken.
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Color the next player to join would receive.
    pub fn next_color(&self) -> Option<Color> {
        if self.is_full() {
            return None;
        }
        Color::for_seat(self.players.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_player_has_four_pieces_at_home() {
        let player = Player::new("Ana", Color::Red);
        assert_eq!(player.pieces.len(), 4);
        assert!(player.pieces.iter().all(|p| p.phase == PiecePhase::AtHome));
        assert!(
            player
                .pieces
                .iter()
                .all(|p| p.track_index == UNSTARTED_INDEX)
        );
        assert!(!player.all_finished());
    }

    #[test]
    fn next_color_follows_seat_count() {
        let mut room = Room::new(
            RoomId::parse("ROOM1").unwrap(),
            Player::new("Ana", Color::Red),
            4,
        );
        assert_eq!(room.next_color(), Some(Color::Blue));
        room.players.push(Player::new("Ben", Color::Blue));
        room.players.push(Player::new("Cy", Color::Green));
        room.players.push(Player::new("Di", Color::Yellow));
        assert!(room.is_full());
        assert_eq!(room.next_color(), None);
    }

    #[test]
    fn send_home_resets_position() {
        let mut piece = Piece {
            id: PieceId(2),
            track_index: 30,
            progress: 29,
            phase: PiecePhase::OnTrack,
        };
        piece.send_home();
        assert_eq!(piece, Piece::at_home(PieceId(2)));
    }

    #[test]
    fn player_serializes_name_field() {
        let player = Player::new("Ana", Color::Green);
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["name"], "Ana");
        assert_eq!(json["color"], "green");
        assert_eq!(json["pieces"][0]["phase"], "at_home");
    }
}
