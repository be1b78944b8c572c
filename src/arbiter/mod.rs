mod options;
pub mod spawn;

use std::fmt;
use std::os::fd::RawFd;
use std::process::Child;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use options::{MasterConfig, MasterOptions};

use crate::chomp::prelude::*;
use crate::ipc::prelude::*;

/// Why a game ended. Every variant is a clean termination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ending {
    AllBlocked,
    ChannelsClosed,
    Timeout,
    Signalled,
}

impl fmt::Display for Ending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Ending::AllBlocked => "all players are blocked",
            Ending::ChannelsClosed => "every player channel closed",
            Ending::Timeout => "no valid move within the timeout",
            Ending::Signalled => "termination signal received",
        })
    }
}

struct PlayerSlot {
    channel: MoveChannel,
    child: Option<Child>,
}

/// The master side of a game: owns both segments, the spawned children and
/// their channels, and runs the one-move-per-iteration scheduler.
pub struct Arbiter {
    board: BoardSegment,
    sync: SyncSegment,
    players: Vec<PlayerSlot>,
    view: Option<Child>,
    view_attached: bool,
    config: MasterConfig,
    shutdown: Arc<AtomicBool>,
}

impl Arbiter {
    /// Creates and seeds both segments, then spawns the view and every
    /// player. Children come up with the segments fully initialised, per
    /// the lifecycle contract.
    pub fn new(config: MasterConfig) -> Result<Arbiter> {
        let shutdown = Arc::new(AtomicBool::new(false));
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&shutdown))
                .context("register signal flag")?;
        }

        let mut board = BoardSegment::create(config.width, config.height)?;
        let sync = SyncSegment::create()?;
        {
            let state = board.state_mut();
            state.configure(config.width, config.height, config.players.len() as u32);
            state.scatter_rewards(config.seed);
            state.seat_players();
        }
        sync.sync().init(config.players.len())?;

        let mut arbiter = Arbiter {
            board,
            sync,
            players: vec![],
            view: None,
            view_attached: config.view.is_some(),
            config,
            shutdown,
        };
        arbiter.spawn_children()?;
        Ok(arbiter)
    }

    fn spawn_children(&mut self) -> Result<()> {
        if let Some(path) = &self.config.view {
            self.view = Some(spawn::spawn_view(path, self.config.width, self.config.height)?);
        }
        for i in 0..self.config.players.len() {
            let path = self.config.players[i].clone();
            let (child, channel) =
                spawn::spawn_player(&path, self.config.width, self.config.height)?;
            // Written before the next spawn; players look themselves up by pid.
            self.board.state_mut().players[i].pid = child.id() as i32;
            self.players.push(PlayerSlot {
                channel,
                child: Some(child),
            });
        }
        Ok(())
    }

    /// Runs the game to its end and winds the children down.
    pub fn run(&mut self) -> Result<Ending> {
        let ending = self.game_loop()?;
        println!("Game over: {ending}");
        self.conclude(ending)?;
        Ok(ending)
    }

    /// The scheduler: one committed move per iteration, round-robin over
    /// ready channels, bounded by the no-progress deadline.
    fn game_loop(&mut self) -> Result<Ending> {
        let player_count = self.players.len();
        let mut last_valid_move = Instant::now();
        let mut start_index = 0usize;

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(Ending::Signalled);
            }

            let sync = self.sync.sync();
            sync.writer_acquire()?;
            let blocked = self.board.state_mut().refresh_blocked();
            sync.writer_release()?;

            if blocked == player_count {
                return Ok(if self.players.iter().all(|p| !p.channel.is_open()) {
                    Ending::ChannelsClosed
                } else {
                    Ending::AllBlocked
                });
            }

            let Some(remaining) = self.config.timeout.checked_sub(last_valid_move.elapsed())
            else {
                return Ok(Ending::Timeout);
            };

            let watch: Vec<(usize, RawFd)> = self
                .players
                .iter()
                .enumerate()
                .filter(|(i, _)| !self.board.state().players[*i].blocked)
                .filter_map(|(i, slot)| slot.channel.fd().map(|fd| (i, fd)))
                .collect();

            match wait_ready(&watch, remaining)? {
                Readiness::TimedOut => return Ok(Ending::Timeout),
                Readiness::Interrupted => continue,
                Readiness::Ready(ready) => {
                    if self.dispatch(&ready, start_index, &mut last_valid_move)? {
                        start_index = (start_index + 1) % player_count;
                    }
                }
            }
        }
    }

    /// Serves at most one octet, scanning ready players round-robin from
    /// `start_index`. EOFs and failed channels retire their players without
    /// consuming the iteration's move.
    fn dispatch(
        &mut self,
        ready: &[usize],
        start_index: usize,
        last_valid_move: &mut Instant,
    ) -> Result<bool> {
        let player_count = self.players.len();
        for i in 0..player_count {
            let idx = (start_index + i) % player_count;
            if !ready.contains(&idx) || self.board.state().players[idx].blocked {
                continue;
            }

            match self.players[idx].channel.read_octet() {
                Ok(ChannelRead::Octet(octet)) => {
                    self.commit(idx, octet, last_valid_move)?;
                    return Ok(true);
                }
                Ok(ChannelRead::NotReady) => {}
                Ok(ChannelRead::Closed) => {
                    log::info!("player {idx} closed its channel");
                    self.retire(idx)?;
                }
                Err(e) => {
                    log::warn!("player {idx} channel failed: {e:#}");
                    self.players[idx].channel.close();
                    self.retire(idx)?;
                }
            }
        }
        Ok(false)
    }

    /// Commits one move: engine plus blocked-flag refresh inside a single
    /// writer section, then the turn signal so the player learns its
    /// request was consumed, then the repaint and the pacing delay for
    /// valid moves only.
    fn commit(&mut self, player: usize, octet: u8, last_valid_move: &mut Instant) -> Result<()> {
        let sync = self.sync.sync();
        sync.writer_acquire()?;
        let result = self.board.state_mut().apply_move(player, octet);
        self.board.state_mut().refresh_blocked();
        sync.writer_release()?;

        sync.turn_signal(player).post()?;
        log::debug!("player {player} sent {octet:#04x}: {result:?}");

        if result.is_valid() {
            *last_valid_move = Instant::now();
            self.repaint()?;
            std::thread::sleep(self.config.delay);
        }
        Ok(())
    }

    /// Marks a player blocked for channel reasons (EOF or read failure).
    fn retire(&mut self, player: usize) -> Result<()> {
        self.players[player].channel.close();
        let sync = self.sync.sync();
        sync.writer_acquire()?;
        self.board.state_mut().players[player].blocked = true;
        sync.writer_release()?;
        Ok(())
    }

    /// One strict view ping-pong: never post `view_update` again before the
    /// matching `view_done` arrived.
    fn repaint(&self) -> Result<()> {
        if !self.view_attached {
            return Ok(());
        }
        let sync = self.sync.sync();
        sync.view_update().post()?;
        sync.view_done().wait()
    }

    /// Flags the end of the game and releases every waiter once, so no
    /// child stays parked on a semaphore that is about to be destroyed.
    fn conclude(&mut self, ending: Ending) -> Result<()> {
        self.board.state().set_game_over();

        let sync = self.sync.sync();
        for i in 0..self.players.len() {
            sync.turn_signal(i).post()?;
        }
        if self.view_attached {
            sync.view_update().post()?;
            if ending != Ending::Signalled {
                // the final frame; on the signal path children may already
                // be dying, so the master does not wait on them
                sync.view_done().wait()?;
            }
        }

        std::thread::sleep(Duration::from_millis(100));
        for slot in &self.players {
            if let Some(child) = &slot.child {
                spawn::terminate(child);
            }
        }
        if let Some(view) = &self.view {
            spawn::terminate(view);
        }
        Ok(())
    }

    /// Reaps every child, prints the termination report and the winner
    /// block, and destroys the semaphores. Segment unmapping and unlinking
    /// happen on drop.
    pub fn report(&mut self) -> Result<()> {
        for i in 0..self.players.len() {
            if let Some(mut child) = self.players[i].child.take() {
                let status = child.wait().context("waitpid player")?;
                let p = &self.board.state().players[i];
                println!(
                    "Player {i} ({}) {}. Score: {} (valid {}, invalid {})",
                    p.name(),
                    spawn::exit_label(status),
                    p.score,
                    p.valid_moves,
                    p.invalid_moves
                );
            }
        }
        if let Some(mut view) = self.view.take() {
            let status = view.wait().context("waitpid view")?;
            println!("View {}", spawn::exit_label(status));
        }

        print!("{}", self.board.state().winner_block());

        self.sync.sync().destroy(self.players.len());
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn harness(
        width: u16,
        height: u16,
        channels: Vec<MoveChannel>,
        timeout: Duration,
    ) -> Result<Arbiter> {
        let mut board = BoardSegment::anonymous(width, height)?;
        let sync = SyncSegment::anonymous()?;
        {
            let state = board.state_mut();
            state.configure(width, height, channels.len() as u32);
            state.scatter_rewards(5);
            state.seat_players();
        }
        sync.sync().init(channels.len())?;

        Ok(Arbiter {
            board,
            sync,
            players: channels
                .into_iter()
                .map(|channel| PlayerSlot {
                    channel,
                    child: None,
                })
                .collect(),
            view: None,
            view_attached: false,
            config: MasterConfig {
                width,
                height,
                delay: Duration::ZERO,
                timeout,
                seed: 5,
                view: None,
                players: vec![],
            },
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &GameState {
        self.board.state()
    }

    #[cfg(test)]
    pub(crate) fn sync(&self) -> &GameSync {
        self.sync.sync()
    }
}

impl Drop for Arbiter {
    fn drop(&mut self) {
        // Error paths can leave children running; never exit above them.
        for slot in &mut self.players {
            if let Some(child) = &mut slot.child {
                spawn::terminate(child);
                let _ = child.try_wait();
            }
        }
        if let Some(view) = &mut self.view {
            spawn::terminate(view);
            let _ = view.try_wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::fd::{FromRawFd, RawFd};

    fn pipe_channel() -> (MoveChannel, RawFd) {
        let (read_end, write_end) = nix::unistd::pipe().unwrap();
        let file = unsafe { File::from_raw_fd(read_end) };
        (MoveChannel::new(file).unwrap(), write_end)
    }

    /// Scenario: players that never write anything end the game cleanly on
    /// the no-progress timeout.
    #[test]
    fn silent_players_time_out() {
        let (channel, write_end) = pipe_channel();
        let mut arbiter =
            Arbiter::harness(10, 10, vec![channel], Duration::from_millis(80)).unwrap();

        let started = Instant::now();
        let ending = arbiter.game_loop().unwrap();
        assert_eq!(ending, Ending::Timeout);
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert_eq!(arbiter.state().players[0].valid_moves, 0);
        assert_eq!(arbiter.state().players[0].invalid_moves, 0);

        nix::unistd::close(write_end).unwrap();
    }

    /// One scripted move flows through the whole pipeline: engine, turn
    /// signal repost, and the no-progress clock reset.
    #[test]
    fn a_scripted_move_is_committed_and_acknowledged() {
        let (channel, write_end) = pipe_channel();
        let mut arbiter =
            Arbiter::harness(10, 10, vec![channel], Duration::from_millis(80)).unwrap();

        // centre seat; up is open on a fresh board
        nix::unistd::write(write_end, &[Direction::Up.octet()]).unwrap();

        let ending = arbiter.game_loop().unwrap();
        assert_eq!(ending, Ending::Timeout);

        let state = arbiter.state();
        assert_eq!(state.players[0].valid_moves, 1);
        assert_eq!(state.players[0].position(), Coord::new(5, 4));
        assert_eq!(owner_of(state.cell(Coord::new(5, 4))), Some(0));
        assert!(state.players[0].score > 0);

        // initial authorization was never consumed, plus one repost
        assert!(arbiter.sync().turn_signal(0).try_wait().unwrap());
        assert!(arbiter.sync().turn_signal(0).try_wait().unwrap());
        assert!(!arbiter.sync().turn_signal(0).try_wait().unwrap());

        nix::unistd::close(write_end).unwrap();
    }

    #[test]
    fn round_robin_serves_every_ready_player() {
        let (a, write_a) = pipe_channel();
        let (b, write_b) = pipe_channel();
        let mut arbiter =
            Arbiter::harness(10, 10, vec![a, b], Duration::from_millis(80)).unwrap();

        nix::unistd::write(write_a, &[Direction::Up.octet()]).unwrap();
        nix::unistd::write(write_b, &[0x09]).unwrap(); // over-range, still consumed

        let ending = arbiter.game_loop().unwrap();
        assert_eq!(ending, Ending::Timeout);

        let state = arbiter.state();
        assert_eq!(state.players[0].valid_moves + state.players[0].invalid_moves, 1);
        assert_eq!(state.players[1].invalid_moves, 1);

        nix::unistd::close(write_a).unwrap();
        nix::unistd::close(write_b).unwrap();
    }

    /// Scenario: a player walled in on every side ends the game before any
    /// channel is consulted.
    #[test]
    fn walled_in_players_end_the_game() {
        let (channel, write_end) = pipe_channel();
        let mut arbiter =
            Arbiter::harness(10, 10, vec![channel], Duration::from_secs(5)).unwrap();

        {
            let state = arbiter.board.state_mut();
            let at = state.players[0].position();
            for dir in Direction::all() {
                let step = at + dir.offset();
                if step.in_bounds_signed(10, 10) {
                    state.set_cell(step.coerce(), captured_by(0));
                }
            }
        }

        let ending = arbiter.game_loop().unwrap();
        assert_eq!(ending, Ending::AllBlocked);
        assert!(arbiter.state().players[0].blocked);

        nix::unistd::close(write_end).unwrap();
    }

    /// An EOF retires the player; once every channel is gone the loop
    /// reports the dedicated ending.
    #[test]
    fn eof_on_every_channel_ends_the_game() {
        let (channel, write_end) = pipe_channel();
        let mut arbiter =
            Arbiter::harness(10, 10, vec![channel], Duration::from_secs(5)).unwrap();
        nix::unistd::close(write_end).unwrap();

        let ending = arbiter.game_loop().unwrap();
        assert_eq!(ending, Ending::ChannelsClosed);
        assert!(arbiter.state().players[0].blocked);
        assert!(!arbiter.players[0].channel.is_open());
    }

    #[test]
    fn a_raised_shutdown_flag_ends_the_game() {
        let (channel, write_end) = pipe_channel();
        let mut arbiter =
            Arbiter::harness(10, 10, vec![channel], Duration::from_secs(5)).unwrap();
        arbiter.shutdown.store(true, Ordering::Relaxed);

        assert_eq!(arbiter.game_loop().unwrap(), Ending::Signalled);

        // conclude still releases the waiters and flags the end
        arbiter.conclude(Ending::Signalled).unwrap();
        assert!(arbiter.state().game_over());
        assert!(arbiter.sync().turn_signal(0).try_wait().unwrap());

        nix::unistd::close(write_end).unwrap();
    }
}
