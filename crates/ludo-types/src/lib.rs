//! Shared type definitions for the Ludo game server.
//!
//! This crate is the single source of truth for the room data model and
//! the `WebSocket` message shapes. Types flow downstream to `TypeScript`
//! via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Player UUIDs, piece indices, and case-insensitive room codes
//! - [`enums`] -- Colors and lifecycle phases
//! - [`structs`] -- `Piece`, `Player`, and `Room`
//! - [`messages`] -- Inbound actions and outbound push messages

pub mod enums;
pub mod ids;
pub mod messages;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Color, MoveEvent, PiecePhase, RoomPhase};
pub use ids::{MAX_ROOM_CODE_LENGTH, PieceId, PlayerId, RoomId, RoomIdError};
pub use messages::{CapturedPiece, ClientAction, MoveOutcome, ServerMessage};
pub use structs::{PIECES_PER_PLAYER, Piece, Player, Room, UNSTARTED_INDEX};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // Files land in `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::PieceId::export_all();
        let _ = crate::ids::RoomId::export_all();

        let _ = crate::enums::Color::export_all();
        let _ = crate::enums::PiecePhase::export_all();
        let _ = crate::enums::RoomPhase::export_all();
        let _ = crate::enums::MoveEvent::export_all();

        let _ = crate::structs::Piece::export_all();
        let _ = crate::structs::Player::export_all();
        let _ = crate::structs::Room::export_all();

        let _ = crate::messages::ClientAction::export_all();
        let _ = crate::messages::CapturedPiece::export_all();
        let _ = crate::messages::MoveOutcome::export_all();
        let _ = crate::messages::ServerMessage::export_all();
    }
}
