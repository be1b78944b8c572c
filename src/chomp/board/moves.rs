use crate::chomp::prelude::*;

/// The outcome of one submitted move. Everything except `Valid` counts
/// against the player's invalid-move tally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveResult {
    /// The destination held this reward; it is now captured.
    Valid { reward: i32 },
    /// The octet was above 7 and names no direction.
    BadDirection,
    /// The destination falls off the board.
    OutOfBounds,
    /// The destination was already captured.
    Occupied,
}

impl MoveResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, MoveResult::Valid { .. })
    }
}

impl GameState {
    /// Applies one move request for `player`. Updates the score, position,
    /// move counters and the captured cell on a valid move; bumps the
    /// invalid counter otherwise. Callers hold the writer lock.
    pub fn apply_move(&mut self, player: usize, octet: u8) -> MoveResult {
        let Some(direction) = Direction::from_octet(octet) else {
            self.players[player].invalid_moves += 1;
            return MoveResult::BadDirection;
        };

        let destination = self.players[player].position() + direction.offset();
        if !destination.in_bounds_signed(self.width, self.height) {
            self.players[player].invalid_moves += 1;
            return MoveResult::OutOfBounds;
        }

        let destination = destination.coerce();
        let reward = self.cell(destination);
        if reward <= 0 {
            self.players[player].invalid_moves += 1;
            return MoveResult::Occupied;
        }

        self.players[player].valid_moves += 1;
        self.players[player].score += reward as u32;
        self.players[player].x = destination.x;
        self.players[player].y = destination.y;
        self.set_cell(destination, captured_by(player));

        MoveResult::Valid { reward }
    }
}
