use rand::Rng;

use crate::chomp::prelude::*;

/// The reference player's move choice: take the neighbouring cell with the
/// highest reward, preferring the lowest wire code on ties. When no
/// neighbour is open the player is blocked anyway, so any direction does;
/// a random one keeps the submission honest.
pub fn choose_direction<R: Rng>(state: &GameState, player: usize, rng: &mut R) -> Direction {
    let at = state.players[player].position();

    let mut best: Option<(i32, Direction)> = None;
    for dir in Direction::all() {
        let step = at + dir.offset();
        if !step.in_bounds_signed(state.width, state.height) {
            continue;
        }
        let reward = state.cell(step.coerce());
        if reward > 0 && best.is_none_or(|(r, _)| reward > r) {
            best = Some((reward, dir));
        }
    }

    match best {
        Some((_, dir)) => dir,
        None => Direction::all()[rng.gen_range(0..8)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fresh_state;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn picks_the_richest_neighbour() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.seat(0, Coord::new(5, 5));
        state.set_cell(Coord::new(5, 4), 2);
        state.set_cell(Coord::new(6, 5), 9);
        state.set_cell(Coord::new(4, 6), 4);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(choose_direction(state, 0, &mut rng), Direction::Right);
    }

    #[test]
    fn ties_resolve_to_the_lowest_wire_code() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.seat(0, Coord::new(5, 5));
        state.set_cell(Coord::new(5, 4), 6);
        state.set_cell(Coord::new(6, 5), 6);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(choose_direction(state, 0, &mut rng), Direction::Up);
    }

    #[test]
    fn falls_back_to_some_direction_when_walled_in() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.seat(0, Coord::new(0, 0));
        for at in [Coord::new(1, 0), Coord::new(0, 1), Coord::new(1, 1)] {
            state.set_cell(at, captured_by(0));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(123);
        for _ in 0..32 {
            // any direction is fine; it just has to be a legal octet
            let dir = choose_direction(state, 0, &mut rng);
            assert!(dir.octet() <= 7);
        }
    }
}
