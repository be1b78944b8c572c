//! Fixtures shared by the unit tests: game state over an anonymous
//! mapping, so tests exercise the exact segment-backed accessors the
//! processes use, without touching the named segments.

use crate::chomp::prelude::*;

/// A configured state on private memory. The board starts all-zero
/// (captured by player 0); tests scatter rewards or set cells as needed.
pub(crate) fn fresh_state(width: u16, height: u16, player_count: u32) -> BoardSegment {
    let mut board = BoardSegment::anonymous(width, height).expect("anonymous board segment");
    board.state_mut().configure(width, height, player_count);
    board
}
