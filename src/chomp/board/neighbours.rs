use crate::chomp::prelude::*;

impl GameState {
    /// Whether `player` still has a legal destination: some neighbour cell
    /// that is both in bounds and uncaptured.
    pub fn can_move(&self, player: usize) -> bool {
        let at = self.players[player].position();
        Direction::all().iter().any(|dir| {
            let step = at + dir.offset();
            step.in_bounds_signed(self.width, self.height) && self.cell(step.coerce()) > 0
        })
    }

    /// Re-derives every blocked flag. A player with no legal destination is
    /// blocked for good; the flag never clears. Returns the number of
    /// blocked players. Callers hold the writer lock.
    pub fn refresh_blocked(&mut self) -> usize {
        let mut blocked = 0;
        for i in 0..self.player_count as usize {
            if !self.players[i].blocked && !self.can_move(i) {
                self.players[i].blocked = true;
            }
            if self.players[i].blocked {
                blocked += 1;
            }
        }
        blocked
    }

    /// Whether every player is blocked.
    pub fn all_blocked(&self) -> bool {
        self.players().iter().all(|p| p.blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fresh_state;

    #[test]
    fn open_neighbourhood_is_not_blocked() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.scatter_rewards(5);
        state.seat_players();
        assert!(state.can_move(0));
    }

    /// Scenario: a player whose eight neighbours are all captured is
    /// blocked, even in a corner where most neighbours are off-board.
    #[test]
    fn surrounded_player_is_blocked() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.scatter_rewards(5);
        state.seat_players();

        let at = state.players[0].position();
        for dir in Direction::all() {
            let step = at + dir.offset();
            if step.in_bounds_signed(10, 10) {
                state.set_cell(step.coerce(), captured_by(0));
            }
        }
        assert!(!state.can_move(0));

        assert_eq!(state.refresh_blocked(), 1);
        assert!(state.players[0].blocked);
        assert!(state.all_blocked());
    }

    #[test]
    fn corner_player_only_looks_at_in_bounds_neighbours() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.scatter_rewards(5);
        state.seat(0, Coord::new(0, 0));

        // Its three real neighbours captured; the five off-board ones must
        // not count as escapes.
        for at in [Coord::new(1, 0), Coord::new(0, 1), Coord::new(1, 1)] {
            state.set_cell(at, captured_by(0));
        }
        assert!(!state.can_move(0));
    }

    #[test]
    fn blocked_flags_stick() {
        let mut board = fresh_state(10, 10, 2);
        let state = board.state_mut();
        state.scatter_rewards(5);
        state.seat(0, Coord::new(2, 2));
        state.seat(1, Coord::new(7, 7));

        state.players[0].blocked = true;
        assert_eq!(state.refresh_blocked(), 1);
        assert!(state.players[0].blocked);
        assert!(!state.players[1].blocked);
        assert!(!state.all_blocked());
    }
}
