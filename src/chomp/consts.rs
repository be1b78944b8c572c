/// Hard cap on the number of players; the shared player table has exactly
/// this many slots.
pub const MAX_PLAYERS: usize = 9;

/// Boards smaller than 10x10 are bumped up to the floor.
pub const MIN_WIDTH: u16 = 10;
pub const MIN_HEIGHT: u16 = 10;

/// Milliseconds slept by the master after each committed valid move.
pub const DEFAULT_DELAY_MS: u64 = 200;

/// Seconds without a valid move before the game is called off.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Player name field width, including the terminating NUL.
pub const NAME_LEN: usize = 16;

/// Uncaptured cells hold a reward in 1..=MAX_REWARD.
pub const MAX_REWARD: i32 = 9;

/// Fixed names of the two shared memory segments. Every process in a game
/// agrees on these, so only one game can run per host at a time.
pub const STATE_SHM_NAME: &str = "/chompchamps_state";
pub const SYNC_SHM_NAME: &str = "/chompchamps_sync";
