//! Game rules: starting, rolling, moving, capturing, and winning.
//!
//! Every operation takes the authoritative [`Room`] by `&mut` and either
//! applies the action completely or leaves the room untouched. The engine
//! holds no state of its own; callers are responsible for serializing
//! access to a room (see `ludo-server`'s session coordinator).
//!
//! Failures come in two flavours:
//!
//! - [`EngineError::Rejected`] -- a rule violation (out of turn, no
//!   pending roll, unknown piece, ...). The room is unchanged and the
//!   caller should drop the action silently.
//! - [`EngineError::CorruptState`] -- the room broke one of its own
//!   invariants. The room must not be processed any further.

use ludo_types::{
    CapturedPiece, MoveEvent, MoveOutcome, PieceId, PiecePhase, Player, PlayerId, Room, RoomPhase,
};
use rand::Rng;

use crate::board::{self, DICE_FACES};

/// Minimum number of seated players needed to start.
pub const MIN_PLAYERS: usize = 2;

/// Why an action was refused without touching the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The game has not started yet.
    #[error("game has not started")]
    NotStarted,
    /// The game is over.
    #[error("game is already finished")]
    GameFinished,
    /// `start_game` on a room that already left the lobby.
    #[error("game already started")]
    AlreadyStarted,
    /// `start_game` with fewer than [`MIN_PLAYERS`] seated.
    #[error("not enough players to start")]
    NotEnoughPlayers,
    /// The acting player does not hold the turn.
    #[error("not this player's turn")]
    NotYourTurn,
    /// Rolled again before spending the previous roll.
    #[error("dice already rolled")]
    DiceAlreadyRolled,
    /// Tried to move without rolling first.
    #[error("no pending dice roll")]
    NoPendingRoll,
    /// The piece does not belong to the acting player.
    #[error("unknown piece")]
    UnknownPiece,
    /// Finished pieces never move.
    #[error("piece already finished")]
    PieceFinished,
}

/// Errors returned by the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A rule violation; the room was not modified.
    #[error("action rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The room violated an invariant and must be quarantined.
    #[error("room state is corrupt: {0}")]
    CorruptState(String),
}

impl EngineError {
    /// Whether the room must stop processing actions.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::CorruptState(_))
    }
}

/// Move a room from the lobby into play.
///
/// # Errors
///
/// Rejects if the room is not in [`RoomPhase::Waiting`] or has fewer than
/// [`MIN_PLAYERS`] players.
pub fn start_game(room: &mut Room) -> Result<(), EngineError> {
    match room.phase {
        RoomPhase::Waiting => {}
        RoomPhase::Playing => return Err(Rejection::AlreadyStarted.into()),
        RoomPhase::Finished => return Err(Rejection::GameFinished.into()),
    }
    if room.players.len() < MIN_PLAYERS {
        return Err(Rejection::NotEnoughPlayers.into());
    }
    room.phase = RoomPhase::Playing;
    Ok(())
}

/// Roll the die for the player holding the turn.
///
/// The value (1-6) is stored as the room's pending roll; the turn does
/// not advance until a move spends it.
///
/// # Errors
///
/// Rejects if the game is not in play, `player_id` does not hold the
/// turn, or a roll is already pending.
pub fn roll_dice(
    room: &mut Room,
    player_id: PlayerId,
    rng: &mut impl Rng,
) -> Result<u8, EngineError> {
    authorize(room, player_id)?;
    if room.pending_dice.is_some() {
        return Err(Rejection::DiceAlreadyRolled.into());
    }
    let value = rng.random_range(1..=DICE_FACES);
    room.pending_dice = Some(value);
    Ok(value)
}

/// Spend the pending roll on one of the current player's pieces.
///
/// - A piece at home comes out onto its entry cell on a six; any other
///   value is wasted.
/// - A piece on the track advances via [`board::compute_next_index`].
///   Reaching the terminal index finishes it. Landing on an unsafe ring
///   cell sends every opposing ring piece on that cell home.
/// - A six, a finish, or a capture keeps the turn; otherwise it passes
///   to the next seat. The pending roll is cleared either way.
/// - Finishing the last piece ends the game with the mover as winner.
///
/// # Errors
///
/// Rejects (room unchanged) if the game is not in play, it is not the
/// player's turn, nothing is rolled, or the piece is unknown or already
/// finished. Returns [`EngineError::CorruptState`] if the pending roll is
/// out of range.
pub fn move_piece(
    room: &mut Room,
    player_id: PlayerId,
    piece_id: PieceId,
) -> Result<MoveOutcome, EngineError> {
    let seat = authorize(room, player_id)?;
    let dice = room.pending_dice.ok_or(Rejection::NoPendingRoll)?;
    if !(1..=DICE_FACES).contains(&dice) {
        return Err(EngineError::CorruptState(format!(
            "pending dice value {dice} out of range"
        )));
    }

    let mover = room
        .players
        .get_mut(seat)
        .ok_or_else(|| corrupt_turn(seat))?;
    let color = mover.color;
    let piece = mover.piece_mut(piece_id).ok_or(Rejection::UnknownPiece)?;

    let from_index = piece.track_index;
    let mut finished = false;
    let mut landed_on = None;

    match piece.phase {
        PiecePhase::Finished => return Err(Rejection::PieceFinished.into()),
        PiecePhase::AtHome => {
            if dice == DICE_FACES {
                piece.phase = PiecePhase::OnTrack;
                piece.progress = 0;
                piece.track_index = board::entry_cell(color);
            }
        }
        PiecePhase::OnTrack => {
            let advance = board::compute_next_index(piece.progress, dice, color);
            piece.progress = advance.progress;
            piece.track_index = advance.track_index;
            if advance.is_terminal() {
                piece.phase = PiecePhase::Finished;
                finished = true;
            } else if advance.on_shared_track() && !board::is_safe(advance.track_index) {
                landed_on = Some(advance.track_index);
            }
        }
    }
    let to_index = piece.track_index;

    let captured = landed_on.map_or_else(Vec::new, |cell| capture_at(room, seat, cell));

    room.pending_dice = None;

    let won = room.players.get(seat).is_some_and(Player::all_finished);
    let extra_turn = dice == DICE_FACES || finished || !captured.is_empty();

    let event = if won {
        room.phase = RoomPhase::Finished;
        room.winner = Some(player_id);
        MoveEvent::Won
    } else {
        if !extra_turn {
            advance_turn(room);
        }
        if captured.is_empty() {
            MoveEvent::Moved
        } else {
            MoveEvent::Captured
        }
    };

    Ok(MoveOutcome {
        player_id,
        piece_id,
        dice,
        from_index,
        to_index,
        captured,
        extra_turn,
        event,
    })
}

/// Check the room is in play and `player_id` holds the turn.
///
/// Returns the current seat index.
fn authorize(room: &Room, player_id: PlayerId) -> Result<usize, EngineError> {
    match room.phase {
        RoomPhase::Playing => {}
        RoomPhase::Waiting => return Err(Rejection::NotStarted.into()),
        RoomPhase::Finished => return Err(Rejection::GameFinished.into()),
    }
    let current = room
        .current_player()
        .ok_or_else(|| corrupt_turn(room.turn_index))?;
    if current.id != player_id {
        return Err(Rejection::NotYourTurn.into());
    }
    Ok(room.turn_index)
}

/// Send every opposing ring piece on `cell` back home.
fn capture_at(room: &mut Room, mover_seat: usize, cell: u8) -> Vec<CapturedPiece> {
    let mut captured = Vec::new();
    for (seat, opponent) in room.players.iter_mut().enumerate() {
        if seat == mover_seat {
            continue;
        }
        for piece in &mut opponent.pieces {
            if piece.phase == PiecePhase::OnTrack
                && board::on_shared_track(piece.progress)
                && piece.track_index == cell
            {
                piece.send_home();
                captured.push(CapturedPiece {
                    player_id: opponent.id,
                    piece_id: piece.id,
                });
            }
        }
    }
    captured
}

/// Pass the turn to the next seat.
fn advance_turn(room: &mut Room) {
    let seats = room.players.len();
    if seats > 0 {
        room.turn_index = room.turn_index.wrapping_add(1) % seats;
    }
}

fn corrupt_turn(turn_index: usize) -> EngineError {
    EngineError::CorruptState(format!("turn index {turn_index} has no player"))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use ludo_types::{Color, RoomId};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use crate::board::TERMINAL_INDEX;

    fn room_with(players: usize) -> Room {
        let names = ["Ana", "Ben", "Cy", "Di"];
        let mut room = Room::new(
            RoomId::parse("TEST").unwrap(),
            Player::new(names[0], Color::Red),
            4,
        );
        for seat in 1..players {
            room.players
                .push(Player::new(names[seat], Color::for_seat(seat).unwrap()));
        }
        room.phase = RoomPhase::Playing;
        room
    }

    /// Put a piece on ring cell `cell`.
    fn place_on_ring(room: &mut Room, seat: usize, piece: u8, cell: u8) {
        let player = &mut room.players[seat];
        let progress = board::progress_for_cell(player.color, cell).unwrap();
        let p = player.piece_mut(PieceId(piece)).unwrap();
        p.phase = PiecePhase::OnTrack;
        p.progress = progress;
        p.track_index = cell;
    }

    /// Put a piece `progress` steps along its path.
    fn place_at_progress(room: &mut Room, seat: usize, piece: u8, progress: u8) {
        let player = &mut room.players[seat];
        let color = player.color;
        let p = player.piece_mut(PieceId(piece)).unwrap();
        p.progress = progress;
        p.track_index = board::index_for_progress(color, progress);
        p.phase = if p.track_index == TERMINAL_INDEX {
            PiecePhase::Finished
        } else {
            PiecePhase::OnTrack
        };
    }

    fn id_of(room: &Room, seat: usize) -> PlayerId {
        room.players[seat].id
    }

    fn move_seat(room: &mut Room, seat: usize, piece: PieceId) -> Result<MoveOutcome, EngineError> {
        let player_id = id_of(room, seat);
        move_piece(room, player_id, piece)
    }

    fn roll_seat(room: &mut Room, seat: usize, rng: &mut SmallRng) -> Result<u8, EngineError> {
        let player_id = id_of(room, seat);
        roll_dice(room, player_id, rng)
    }

    // -- start_game ---------------------------------------------------------

    #[test]
    fn start_requires_two_players() {
        let mut room = room_with(1);
        room.phase = RoomPhase::Waiting;
        assert_eq!(
            start_game(&mut room),
            Err(EngineError::Rejected(Rejection::NotEnoughPlayers))
        );
        assert_eq!(room.phase, RoomPhase::Waiting);

        room.players.push(Player::new("Ben", Color::Blue));
        assert_eq!(start_game(&mut room), Ok(()));
        assert_eq!(room.phase, RoomPhase::Playing);
        assert_eq!(
            start_game(&mut room),
            Err(EngineError::Rejected(Rejection::AlreadyStarted))
        );
    }

    // -- roll_dice ----------------------------------------------------------

    #[test]
    fn roll_stores_pending_value() {
        let mut room = room_with(2);
        let mut rng = SmallRng::seed_from_u64(7);
        let value = roll_seat(&mut room, 0, &mut rng).unwrap();
        assert!((1..=6).contains(&value));
        assert_eq!(room.pending_dice, Some(value));
        assert_eq!(room.turn_index, 0);
    }

    #[test]
    fn second_roll_is_rejected_for_every_value() {
        let mut rng = SmallRng::seed_from_u64(1);
        for pending in 1..=6 {
            let mut room = room_with(2);
            room.pending_dice = Some(pending);
            let before = room.clone();
            assert_eq!(
                roll_seat(&mut room, 0, &mut rng),
                Err(EngineError::Rejected(Rejection::DiceAlreadyRolled))
            );
            assert_eq!(room, before);
        }
    }

    #[test]
    fn out_of_turn_actions_are_rejected() {
        let mut room = room_with(2);
        let mut rng = SmallRng::seed_from_u64(3);
        let before = room.clone();
        assert_eq!(
            roll_seat(&mut room, 1, &mut rng),
            Err(EngineError::Rejected(Rejection::NotYourTurn))
        );
        assert_eq!(room, before);
        room.pending_dice = Some(6);
        let before_move = room.clone();
        assert_eq!(
            move_seat(&mut room, 1, PieceId(0)),
            Err(EngineError::Rejected(Rejection::NotYourTurn))
        );
        assert_eq!(room, before_move);
    }

    #[test]
    fn actions_rejected_before_start() {
        let mut room = room_with(2);
        room.phase = RoomPhase::Waiting;
        let mut rng = SmallRng::seed_from_u64(3);
        assert_eq!(
            roll_seat(&mut room, 0, &mut rng),
            Err(EngineError::Rejected(Rejection::NotStarted))
        );
    }

    // -- move_piece ---------------------------------------------------------

    #[test]
    fn move_without_roll_is_rejected() {
        let mut room = room_with(2);
        assert_eq!(
            move_seat(&mut room, 0, PieceId(0)),
            Err(EngineError::Rejected(Rejection::NoPendingRoll))
        );
    }

    #[test]
    fn unknown_piece_is_rejected_and_roll_kept() {
        let mut room = room_with(2);
        room.pending_dice = Some(4);
        assert_eq!(
            move_seat(&mut room, 0, PieceId(9)),
            Err(EngineError::Rejected(Rejection::UnknownPiece))
        );
        assert_eq!(room.pending_dice, Some(4));
    }

    #[test]
    fn six_releases_piece_onto_entry_with_extra_turn() {
        for seat in 0..4 {
            let mut room = room_with(4);
            room.turn_index = seat;
            room.pending_dice = Some(6);
            let outcome = move_seat(&mut room, seat, PieceId(1)).unwrap();
            let piece = room.players[seat].piece(PieceId(1)).unwrap();
            assert_eq!(piece.phase, PiecePhase::OnTrack);
            assert_eq!(piece.track_index, board::entry_cell(room.players[seat].color));
            assert!(outcome.extra_turn);
            assert_eq!(room.turn_index, seat);
            assert_eq!(room.pending_dice, None);
        }
    }

    #[test]
    fn non_six_from_home_is_wasted_and_turn_passes() {
        let mut room = room_with(3);
        room.pending_dice = Some(4);
        let outcome = move_seat(&mut room, 0, PieceId(0)).unwrap();
        assert_eq!(outcome.event, MoveEvent::Moved);
        assert!(!outcome.extra_turn);
        assert_eq!(
            room.players[0].piece(PieceId(0)).unwrap().phase,
            PiecePhase::AtHome
        );
        assert_eq!(room.turn_index, 1);
        assert_eq!(room.pending_dice, None);
    }

    #[test]
    fn turn_wraps_around_last_seat() {
        let mut room = room_with(3);
        room.turn_index = 2;
        room.pending_dice = Some(2);
        move_seat(&mut room, 2, PieceId(0)).unwrap();
        assert_eq!(room.turn_index, 0);
    }

    #[test]
    fn capture_on_unsafe_cell_sends_opponent_home() {
        // Red on 48 (safe) rolls 3 and lands on 51 where Blue is sitting.
        let mut room = room_with(2);
        place_on_ring(&mut room, 0, 0, 48);
        place_on_ring(&mut room, 1, 2, 51);
        room.pending_dice = Some(3);

        let outcome = move_seat(&mut room, 0, PieceId(0)).unwrap();

        assert_eq!(outcome.to_index, 51);
        assert_eq!(outcome.event, MoveEvent::Captured);
        assert!(outcome.extra_turn);
        assert_eq!(room.turn_index, 0);
        assert_eq!(
            outcome.captured,
            vec![CapturedPiece {
                player_id: id_of(&room, 1),
                piece_id: PieceId(2)
            }]
        );
        let victim = room.players[1].piece(PieceId(2)).unwrap();
        assert_eq!(victim.phase, PiecePhase::AtHome);
        assert_eq!(victim.track_index, ludo_types::UNSTARTED_INDEX);
    }

    #[test]
    fn capture_works_for_every_color() {
        for attacker in 0..4 {
            let victim = (attacker + 1) % 4;
            let mut room = room_with(4);
            room.turn_index = attacker;
            let color = room.players[attacker].color;
            // Two steps past the entry cell is never a safe cell.
            let start = board::index_for_progress(color, 0);
            let target = board::index_for_progress(color, 2);
            assert!(!board::is_safe(target));
            place_on_ring(&mut room, attacker, 0, start);
            place_on_ring(&mut room, victim, 3, target);
            room.pending_dice = Some(2);

            let outcome = move_seat(&mut room, attacker, PieceId(0)).unwrap();
            assert_eq!(outcome.captured.len(), 1);
            assert_eq!(
                room.players[victim].piece(PieceId(3)).unwrap().phase,
                PiecePhase::AtHome
            );
        }
    }

    #[test]
    fn stacked_opponents_are_all_captured() {
        let mut room = room_with(3);
        place_on_ring(&mut room, 0, 0, 3);
        place_on_ring(&mut room, 1, 0, 5);
        place_on_ring(&mut room, 1, 1, 5);
        place_on_ring(&mut room, 2, 0, 5);
        room.pending_dice = Some(2);
        let outcome = move_seat(&mut room, 0, PieceId(0)).unwrap();
        assert_eq!(outcome.captured.len(), 3);
    }

    #[test]
    fn own_pieces_are_never_captured() {
        let mut room = room_with(2);
        place_on_ring(&mut room, 0, 0, 3);
        place_on_ring(&mut room, 0, 1, 5);
        room.pending_dice = Some(2);
        let outcome = move_seat(&mut room, 0, PieceId(0)).unwrap();
        assert!(outcome.captured.is_empty());
        assert_eq!(
            room.players[0].piece(PieceId(1)).unwrap().phase,
            PiecePhase::OnTrack
        );
        assert_eq!(room.turn_index, 1);
    }

    #[test]
    fn safe_cells_never_capture() {
        for &safe in &board::SAFE_CELLS {
            let mut room = room_with(2);
            // Red never steps onto its own entry cell, so Blue attacks there.
            let attacker = usize::from(board::progress_for_cell(Color::Red, safe) == Some(0));
            let victim = 1 - attacker;
            let color = room.players[attacker].color;
            let progress = board::progress_for_cell(color, safe).unwrap();
            let from = board::index_for_progress(color, progress - 1);
            place_on_ring(&mut room, attacker, 0, from);
            place_on_ring(&mut room, victim, 0, safe);
            room.turn_index = attacker;
            room.pending_dice = Some(1);

            let outcome = move_seat(&mut room, attacker, PieceId(0)).unwrap();

            assert_eq!(outcome.to_index, safe);
            assert!(outcome.captured.is_empty(), "captured on safe cell {safe}");
            assert_eq!(
                room.players[victim].piece(PieceId(0)).unwrap().phase,
                PiecePhase::OnTrack
            );
        }
    }

    #[test]
    fn home_stretch_pieces_cannot_be_captured() {
        // Red's first home-stretch cell and Blue's ring cell are both
        // numbered 52. Green landing on 52 captures only the ring piece.
        let mut room = room_with(4);
        place_at_progress(&mut room, 0, 0, 51);
        assert_eq!(room.players[0].pieces[0].track_index, 52);
        place_on_ring(&mut room, 1, 0, 52);
        place_on_ring(&mut room, 2, 1, 51);
        room.turn_index = 2;
        room.pending_dice = Some(1);

        let outcome = move_seat(&mut room, 2, PieceId(1)).unwrap();

        assert_eq!(outcome.to_index, 52);
        assert_eq!(
            outcome.captured,
            vec![CapturedPiece {
                player_id: id_of(&room, 1),
                piece_id: PieceId(0)
            }]
        );
        assert_eq!(
            room.players[0].piece(PieceId(0)).unwrap().phase,
            PiecePhase::OnTrack
        );
    }

    #[test]
    fn exact_roll_finishes_piece_with_extra_turn() {
        let mut room = room_with(2);
        place_at_progress(&mut room, 0, 0, 53);
        room.pending_dice = Some(3);
        let outcome = move_seat(&mut room, 0, PieceId(0)).unwrap();
        let piece = room.players[0].piece(PieceId(0)).unwrap();
        assert_eq!(piece.phase, PiecePhase::Finished);
        assert_eq!(piece.track_index, TERMINAL_INDEX);
        assert!(outcome.extra_turn);
        assert_eq!(room.turn_index, 0);
    }

    #[test]
    fn finished_piece_cannot_move() {
        let mut room = room_with(2);
        place_at_progress(&mut room, 0, 0, 56);
        room.pending_dice = Some(2);
        assert_eq!(
            move_seat(&mut room, 0, PieceId(0)),
            Err(EngineError::Rejected(Rejection::PieceFinished))
        );
        assert_eq!(room.pending_dice, Some(2));
    }

    #[test]
    fn last_piece_home_wins_once() {
        let mut room = room_with(1);
        for piece in 0..3 {
            place_at_progress(&mut room, 0, piece, 56);
        }
        place_at_progress(&mut room, 0, 3, 51);
        assert_eq!(room.players[0].pieces[3].track_index, 52);
        room.pending_dice = Some(5);

        let outcome = move_seat(&mut room, 0, PieceId(3)).unwrap();
        assert_eq!(outcome.event, MoveEvent::Won);
        assert_eq!(room.phase, RoomPhase::Finished);
        assert_eq!(room.winner, Some(id_of(&room, 0)));

        let frozen = room.clone();
        let mut rng = SmallRng::seed_from_u64(9);
        assert_eq!(
            roll_seat(&mut room, 0, &mut rng),
            Err(EngineError::Rejected(Rejection::GameFinished))
        );
        room.pending_dice = Some(6);
        let before_move = room.clone();
        assert_eq!(
            move_seat(&mut room, 0, PieceId(0)),
            Err(EngineError::Rejected(Rejection::GameFinished))
        );
        assert_eq!(room, before_move);
        assert_eq!(frozen.winner, room.winner);
    }

    #[test]
    fn turn_advance_rule_holds_for_all_rolls() {
        for dice in 1..=6 {
            let mut room = room_with(2);
            place_on_ring(&mut room, 0, 0, 2);
            room.pending_dice = Some(dice);
            let outcome = move_seat(&mut room, 0, PieceId(0)).unwrap();
            let keeps_turn = dice == 6 || !outcome.captured.is_empty();
            assert_eq!(outcome.extra_turn, keeps_turn);
            assert_eq!(room.turn_index, if keeps_turn { 0 } else { 1 });
        }
    }

    #[test]
    fn corrupt_turn_index_is_fatal() {
        let mut room = room_with(2);
        room.turn_index = 7;
        let mut rng = SmallRng::seed_from_u64(0);
        let err = roll_dice(&mut room, PlayerId::new(), &mut rng).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn corrupt_dice_value_is_fatal() {
        let mut room = room_with(2);
        room.pending_dice = Some(9);
        let err = move_seat(&mut room, 0, PieceId(0)).unwrap_err();
        assert!(err.is_fatal());
    }
}
