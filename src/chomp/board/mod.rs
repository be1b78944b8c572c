pub(crate) mod moves;
pub(crate) mod neighbours;
pub(crate) mod pretty;
pub(crate) mod scores;

use std::slice;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::chomp::prelude::*;
use crate::ipc::shm::Segment;

pub use moves::MoveResult;
pub use scores::Standings;

/// Encodes "captured by `player`" as a cell value. Player 0 writes `0`,
/// which is unambiguous because rewards are always positive.
pub fn captured_by(player: usize) -> i32 {
    -(player as i32)
}

/// Decodes a cell value into its owner, if the cell is captured.
pub fn owner_of(value: i32) -> Option<usize> {
    (value <= 0).then(|| (-value) as usize)
}

/// One slot of the shared player table.
///
/// The layout is part of the wire contract between the master, players and
/// the view: `repr(C)`, 40 bytes, natural alignment only. Field order is
/// name, score, invalid, valid, x, y, pid, blocked.
#[repr(C)]
#[derive(Debug)]
pub struct PlayerRecord {
    pub name: [u8; NAME_LEN],
    pub score: u32,
    pub invalid_moves: u32,
    pub valid_moves: u32,
    pub x: u16,
    pub y: u16,
    pub pid: i32,
    pub blocked: bool,
}

impl PlayerRecord {
    /// The player's position as a coord.
    pub fn position(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    /// The display name, up to the first NUL.
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        std::str::from_utf8(&self.name[..end]).unwrap_or("?")
    }

    /// Writes a display name, truncated to 15 bytes plus the NUL.
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; NAME_LEN];
        let n = name.len().min(NAME_LEN - 1);
        self.name[..n].copy_from_slice(&name.as_bytes()[..n]);
    }
}

/// The authoritative game state, shared between every process of a game.
///
/// `repr(C)` with a 372-byte header; the `width * height` array of `i32`
/// cells follows the header immediately, row-major. The struct is never
/// constructed by value: it is a view over a shared memory segment, and
/// all-zero bytes are a valid (empty) state.
#[repr(C)]
pub struct GameState {
    pub width: u16,
    pub height: u16,
    pub player_count: u32,
    pub players: [PlayerRecord; MAX_PLAYERS],
    /// The only field read outside the reader protocol, hence atomic.
    game_over: AtomicBool,
}

impl GameState {
    /// Total segment size for a `width x height` board.
    pub fn shm_size(width: u16, height: u16) -> usize {
        std::mem::size_of::<GameState>()
            + width as usize * height as usize * std::mem::size_of::<i32>()
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// The cell array. Valid because a `GameState` only ever lives at the
    /// head of a segment sized with [`GameState::shm_size`].
    pub fn board(&self) -> &[i32] {
        unsafe {
            let cells = (self as *const GameState).add(1) as *const i32;
            slice::from_raw_parts(cells, self.cell_count())
        }
    }

    pub fn board_mut(&mut self) -> &mut [i32] {
        unsafe {
            let cells = (self as *mut GameState).add(1) as *mut i32;
            slice::from_raw_parts_mut(cells, self.cell_count())
        }
    }

    pub fn cell(&self, at: Coord) -> i32 {
        self.board()[at.index(self.width)]
    }

    pub fn set_cell(&mut self, at: Coord, value: i32) {
        let idx = at.index(self.width);
        self.board_mut()[idx] = value;
    }

    pub fn game_over(&self) -> bool {
        self.game_over.load(Ordering::SeqCst)
    }

    pub fn set_game_over(&self) {
        self.game_over.store(true, Ordering::SeqCst);
    }

    /// The live player slots.
    pub fn players(&self) -> &[PlayerRecord] {
        &self.players[..self.player_count as usize]
    }

    /// Locates the player owning `pid`, if any.
    pub fn player_by_pid(&self, pid: i32) -> Option<usize> {
        self.players().iter().position(|p| p.pid == pid)
    }

    /// Fills in dimensions, player count and default names on a zeroed state.
    pub fn configure(&mut self, width: u16, height: u16, player_count: u32) {
        self.width = width;
        self.height = height;
        self.player_count = player_count;
        for i in 0..player_count as usize {
            self.players[i].set_name(&format!("Player {}", i + 1));
        }
    }

    /// Scatters a reward of 1..=9 into every cell, deterministically in the
    /// seed. Runs before seating so starting cells get overwritten.
    pub fn scatter_rewards(&mut self, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for cell in self.board_mut() {
            *cell = rng.gen_range(1..=MAX_REWARD);
        }
    }

    /// Seats every player on the board and marks their starting cells as
    /// captured. A lone player sits at the centre; otherwise players go on
    /// an ellipse of radii (width/3, height/3) around it. Seats that land
    /// on an already-captured cell probe forward row-major instead.
    pub fn seat_players(&mut self) {
        let (width, height) = (self.width, self.height);
        let count = self.player_count as usize;
        let centre = Coord::new(width / 2, height / 2);

        if count == 1 {
            self.seat(0, centre);
            return;
        }

        let radius_x = width as f64 / 3.0;
        let radius_y = height as f64 / 3.0;
        for i in 0..count {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / count as f64;
            let x = (centre.x as f64 + radius_x * angle.cos()) as i64;
            let y = (centre.y as f64 + radius_y * angle.sin()) as i64;
            let seat = Coord::new(
                x.clamp(0, width as i64 - 1) as u16,
                y.clamp(0, height as i64 - 1) as u16,
            );
            let seat = self.probe_free(seat);
            self.seat(i, seat);
        }
    }

    pub(crate) fn seat(&mut self, player: usize, at: Coord) {
        self.players[player].x = at.x;
        self.players[player].y = at.y;
        self.set_cell(at, captured_by(player));
    }

    /// First uncaptured cell at or after `from` in row-major order, wrapping.
    fn probe_free(&self, from: Coord) -> Coord {
        let total = self.cell_count();
        let start = from.index(self.width);
        for step in 0..total {
            let idx = (start + step) % total;
            if self.board()[idx] > 0 {
                return Coord::new(
                    (idx % self.width as usize) as u16,
                    (idx / self.width as usize) as u16,
                );
            }
        }
        from
    }
}

/// A shared memory segment holding a [`GameState`].
///
/// The master creates the named segment read-write and unlinks it on drop;
/// players and the view attach it read-only. [`BoardSegment::anonymous`]
/// backs the same state with a private mapping for single-process use.
pub struct BoardSegment {
    seg: Segment,
}

impl BoardSegment {
    pub fn create(width: u16, height: u16) -> Result<BoardSegment> {
        let seg = Segment::create(STATE_SHM_NAME, GameState::shm_size(width, height))?;
        Ok(BoardSegment { seg })
    }

    pub fn attach(width: u16, height: u16) -> Result<BoardSegment> {
        let seg = Segment::attach(STATE_SHM_NAME, GameState::shm_size(width, height), true)?;
        Ok(BoardSegment { seg })
    }

    pub fn anonymous(width: u16, height: u16) -> Result<BoardSegment> {
        let seg = Segment::anonymous(GameState::shm_size(width, height))?;
        Ok(BoardSegment { seg })
    }

    pub fn state(&self) -> &GameState {
        unsafe { &*(self.seg.as_ptr() as *const GameState) }
    }

    /// Only meaningful on segments mapped read-write (create / anonymous).
    pub fn state_mut(&mut self) -> &mut GameState {
        unsafe { &mut *(self.seg.as_ptr() as *mut GameState) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fresh_state;

    #[test]
    fn layout_matches_the_documented_contract() {
        assert_eq!(std::mem::size_of::<PlayerRecord>(), 40);
        assert_eq!(std::mem::align_of::<PlayerRecord>(), 4);
        assert_eq!(std::mem::size_of::<GameState>(), 372);
        assert_eq!(std::mem::align_of::<GameState>(), 4);
        assert_eq!(GameState::shm_size(10, 10), 372 + 400);
    }

    #[test]
    fn cell_encoding_round_trips_for_every_player() {
        for i in 0..MAX_PLAYERS {
            let cell = captured_by(i);
            assert!(cell <= 0);
            assert_eq!(owner_of(cell), Some(i));
        }
        for reward in 1..=MAX_REWARD {
            assert_eq!(owner_of(reward), None);
        }
    }

    #[test]
    fn names_truncate_and_terminate() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        assert_eq!(state.players[0].name(), "Player 1");

        state.players[0].set_name("a name much longer than fifteen bytes");
        assert_eq!(state.players[0].name().len(), NAME_LEN - 1);
        assert_eq!(state.players[0].name[NAME_LEN - 1], 0);
    }

    #[test]
    fn rewards_are_seed_deterministic_and_in_range() {
        let mut a = fresh_state(12, 11, 1);
        let mut b = fresh_state(12, 11, 1);
        a.state_mut().scatter_rewards(42);
        b.state_mut().scatter_rewards(42);
        assert_eq!(a.state().board(), b.state().board());
        assert!(a.state().board().iter().all(|&v| (1..=MAX_REWARD).contains(&v)));

        b.state_mut().scatter_rewards(43);
        assert_ne!(a.state().board(), b.state().board());
    }

    #[test]
    fn lone_player_sits_at_the_centre() {
        let mut board = fresh_state(10, 10, 1);
        let state = board.state_mut();
        state.scatter_rewards(1);
        state.seat_players();
        assert_eq!(state.players[0].position(), Coord::new(5, 5));
        assert_eq!(state.cell(Coord::new(5, 5)), captured_by(0));
    }

    #[test]
    fn every_seat_is_distinct_and_marked() {
        for count in 2..=MAX_PLAYERS as u32 {
            let mut board = fresh_state(10, 10, count);
            let state = board.state_mut();
            state.scatter_rewards(7);
            state.seat_players();

            for i in 0..count as usize {
                let at = state.players[i].position();
                assert!(at.in_bounds(10, 10));
                assert_eq!(owner_of(state.cell(at)), Some(i), "player {i} of {count}");
            }
        }
    }

    #[test]
    fn player_lookup_by_pid() {
        let mut board = fresh_state(10, 10, 3);
        let state = board.state_mut();
        state.players[0].pid = 100;
        state.players[1].pid = 200;
        state.players[2].pid = 300;
        assert_eq!(state.player_by_pid(200), Some(1));
        assert_eq!(state.player_by_pid(999), None);
    }

    #[test]
    fn game_over_is_monotone() {
        let board = fresh_state(10, 10, 1);
        assert!(!board.state().game_over());
        board.state().set_game_over();
        board.state().set_game_over();
        assert!(board.state().game_over());
    }
}
