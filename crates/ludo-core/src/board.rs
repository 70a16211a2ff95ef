//! Board topology and index arithmetic.
//!
//! The shared ring has 52 cells numbered 1-52. Every color enters the
//! ring at its own cell, walks 51 steps around it, then turns off into a
//! private six-cell home stretch ending at [`TERMINAL_INDEX`].
//!
//! A piece's position is tracked as `progress` (steps since leaving the
//! pen, 0-56). The visible `track_index` is derived from it: the absolute
//! ring cell while `progress < 51`, otherwise `progress + 1` (52-57).
//! Progress is what keeps ring cell 52 and home-stretch index 52 apart
//! for colors other than red.

use ludo_types::Color;

/// Number of cells on the shared ring.
pub const RING_LENGTH: u8 = 52;

/// Cells on which a piece cannot be captured.
pub const SAFE_CELLS: [u8; 8] = [1, 9, 14, 22, 27, 35, 40, 48];

/// Progress at which a piece leaves the ring for its home stretch.
pub const HOME_STRETCH_START: u8 = 51;

/// Track index of a finished piece.
pub const TERMINAL_INDEX: u8 = 57;

/// Progress of a finished piece.
pub const MAX_PROGRESS: u8 = 56;

/// Highest face on the die. Rolling it releases a piece and grants an
/// extra turn.
pub const DICE_FACES: u8 = 6;

/// Result of advancing a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// Steps traveled from the entry cell after the move.
    pub progress: u8,
    /// Track index after the move.
    pub track_index: u8,
}

impl Advance {
    /// Whether the piece is still on the shared ring (capturable).
    pub const fn on_shared_track(self) -> bool {
        on_shared_track(self.progress)
    }

    /// Whether the piece reached the terminal index.
    pub const fn is_terminal(self) -> bool {
        self.track_index == TERMINAL_INDEX
    }
}

/// Ring cell where `color` leaves its pen.
pub const fn entry_cell(color: Color) -> u8 {
    match color {
        Color::Red => 1,
        Color::Green => 14,
        Color::Yellow => 27,
        Color::Blue => 40,
    }
}

/// Whether `cell` is immune to capture.
pub fn is_safe(cell: u8) -> bool {
    SAFE_CELLS.contains(&cell)
}

/// Whether a piece with this much progress is still on the shared ring.
pub const fn on_shared_track(progress: u8) -> bool {
    progress < HOME_STRETCH_START
}

/// Track index for a piece of `color` that has traveled `progress` steps.
///
/// `progress` is clamped to [`MAX_PROGRESS`].
// Bounded: entry <= 40 and progress <= 50 on the ring, progress <= 56 off it.
#[allow(clippy::arithmetic_side_effects)]
pub fn index_for_progress(color: Color, progress: u8) -> u8 {
    let progress = progress.min(MAX_PROGRESS);
    if on_shared_track(progress) {
        (entry_cell(color) - 1 + progress) % RING_LENGTH + 1
    } else {
        progress + 1
    }
}

/// Progress a piece of `color` standing on ring cell `cell` has made.
///
/// Returns `None` if `cell` is not a ring cell (1-52) or if a piece of
/// that color could not be standing on it: the cell just behind the
/// entry is never revisited before turning into the home stretch.
// Bounded: all operands are at most 2 * RING_LENGTH.
#[allow(clippy::arithmetic_side_effects)]
pub fn progress_for_cell(color: Color, cell: u8) -> Option<u8> {
    if !(1..=RING_LENGTH).contains(&cell) {
        return None;
    }
    let progress = (cell + RING_LENGTH - entry_cell(color)) % RING_LENGTH;
    on_shared_track(progress).then_some(progress)
}

/// Advance a piece of `color` by `dice` steps from `progress`.
///
/// Moves around the ring, turns into the home stretch after 51 steps,
/// and stops at [`TERMINAL_INDEX`]. Overshoot does not bounce back or
/// wrap: surplus pips are simply lost.
pub fn compute_next_index(progress: u8, dice: u8, color: Color) -> Advance {
    let progress = progress.saturating_add(dice).min(MAX_PROGRESS);
    Advance {
        progress,
        track_index: index_for_progress(color, progress),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn entry_cells_are_safe_and_evenly_spaced() {
        for color in Color::ALL {
            assert!(is_safe(entry_cell(color)));
            assert_eq!(index_for_progress(color, 0), entry_cell(color));
        }
        assert_eq!(entry_cell(Color::Green) - entry_cell(Color::Red), 13);
        assert_eq!(entry_cell(Color::Yellow) - entry_cell(Color::Green), 13);
        assert_eq!(entry_cell(Color::Blue) - entry_cell(Color::Yellow), 13);
    }

    #[test]
    fn red_ring_index_matches_progress() {
        let adv = compute_next_index(47, 3, Color::Red);
        assert_eq!(adv.track_index, 51);
        assert!(adv.on_shared_track());
    }

    #[test]
    fn ring_wraps_past_cell_52() {
        // Blue enters at 40; twelve steps later it sits on 52, then 1.
        assert_eq!(index_for_progress(Color::Blue, 12), 52);
        let adv = compute_next_index(12, 1, Color::Blue);
        assert_eq!(adv.track_index, 1);
        assert!(adv.on_shared_track());
    }

    #[test]
    fn turns_into_home_stretch_after_51_steps() {
        let adv = compute_next_index(50, 1, Color::Yellow);
        assert_eq!(adv.progress, 51);
        assert_eq!(adv.track_index, 52);
        assert!(!adv.on_shared_track());
    }

    #[test]
    fn overshoot_stops_at_terminal() {
        let adv = compute_next_index(54, 6, Color::Green);
        assert_eq!(adv.track_index, TERMINAL_INDEX);
        assert!(adv.is_terminal());
        let exact = compute_next_index(51, 5, Color::Red);
        assert_eq!(exact.track_index, TERMINAL_INDEX);
    }

    #[test]
    fn index_is_always_in_bounds() {
        for color in Color::ALL {
            for progress in 0..=MAX_PROGRESS {
                for dice in 1..=DICE_FACES {
                    let adv = compute_next_index(progress, dice, color);
                    assert!((1..=TERMINAL_INDEX).contains(&adv.track_index));
                    assert!(adv.progress >= progress);
                }
            }
        }
    }

    #[test]
    fn progress_for_cell_inverts_ring_index() {
        for color in Color::ALL {
            for progress in 0..HOME_STRETCH_START {
                let cell = index_for_progress(color, progress);
                assert_eq!(progress_for_cell(color, cell), Some(progress));
            }
        }
        assert_eq!(progress_for_cell(Color::Red, 0), None);
        assert_eq!(progress_for_cell(Color::Red, 53), None);
        // Red never stands on 52 of the ring: that step is its home stretch.
        assert_eq!(progress_for_cell(Color::Red, 52), None);
    }
}
