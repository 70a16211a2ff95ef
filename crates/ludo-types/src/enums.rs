//! Enumeration types for the Ludo game server.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Seat colors
// ---------------------------------------------------------------------------

/// Seat color. Assigned in join order and never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Color {
    /// First seat (the room creator).
    Red,
    /// Second seat.
    Blue,
    /// Third seat.
    Green,
    /// Fourth seat.
    Yellow,
}

impl Color {
    /// All colors in seat (join) order.
    pub const ALL: [Self; 4] = [Self::Red, Self::Blue, Self::Green, Self::Yellow];

    /// Color for the player taking seat number `seat` (0-based).
    ///
    /// Returns `None` once all four colors are taken.
    pub fn for_seat(seat: usize) -> Option<Self> {
        Self::ALL.get(seat).copied()
    }
}

impl core::fmt::Display for Color {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle phases
// ---------------------------------------------------------------------------

/// Where a piece is in its journey around the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum PiecePhase {
    /// Still in the starting pen; needs a six to come out.
    AtHome,
    /// Somewhere on the shared ring or the color's home stretch.
    OnTrack,
    /// Reached the terminal index. Never moves again.
    Finished,
}

/// Phase of a room. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum RoomPhase {
    /// Lobby: players may still join.
    Waiting,
    /// Game in progress.
    Playing,
    /// Somebody won; the room accepts no more actions.
    Finished,
}

/// What a resolved move did, relayed to clients with the new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MoveEvent {
    /// A plain move (including a wasted roll).
    Moved,
    /// The move sent one or more opposing pieces home.
    Captured,
    /// The move finished the mover's last piece.
    Won,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seats_follow_join_order() {
        assert_eq!(Color::for_seat(0), Some(Color::Red));
        assert_eq!(Color::for_seat(1), Some(Color::Blue));
        assert_eq!(Color::for_seat(2), Some(Color::Green));
        assert_eq!(Color::for_seat(3), Some(Color::Yellow));
        assert_eq!(Color::for_seat(4), None);
    }

    #[test]
    fn wire_names() {
        assert_eq!(serde_json::to_string(&Color::Yellow).unwrap(), "\"yellow\"");
        assert_eq!(
            serde_json::to_string(&PiecePhase::AtHome).unwrap(),
            "\"at_home\""
        );
        assert_eq!(
            serde_json::to_string(&RoomPhase::Waiting).unwrap(),
            "\"waiting\""
        );
    }
}
