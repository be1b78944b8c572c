use std::io::Write;
use std::time::SystemTime;

use clap::Parser;
use flexi_logger::Logger;
use lib_chomp::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Argv contract: the master invokes every player with exactly two
/// positional arguments, the board width and height.
#[derive(Debug, Parser)]
#[command(name = "player")]
struct PlayerArgs {
    width: u16,
    height: u16,
}

fn main() -> Result<()> {
    let args = PlayerArgs::parse();
    // stdout is the wire; everything human-facing goes to stderr.
    let _logger = Logger::try_with_env_or_str("info")?.log_to_stderr().start()?;

    let board = BoardSegment::attach(args.width, args.height)?;
    let sync_segment = SyncSegment::attach()?;
    let sync = sync_segment.sync();

    let me = find_self(board.state())?;
    log::debug!("player {me} attached (pid {})", std::process::id());

    let mut rng = ChaCha8Rng::seed_from_u64(std::process::id() as u64 ^ clock_entropy());
    let mut wire = std::io::stdout().lock();

    loop {
        // The turn signal is the sole authorization to submit one move.
        sync.turn_signal(me).wait()?;
        if board.state().game_over() {
            break;
        }

        sync.reader_enter()?;
        let blocked = board.state().players[me].blocked;
        let direction = (!blocked).then(|| choose_direction(board.state(), me, &mut rng));
        sync.reader_exit()?;

        let Some(direction) = direction else {
            break;
        };
        if let Err(e) = wire.write_all(&[direction.octet()]).and_then(|_| wire.flush()) {
            log::debug!("move channel went away: {e}");
            break;
        }
    }

    Ok(())
}

/// Locates this process in the shared player table. The master writes the
/// pid right after spawning, so a fast-starting child briefly retries.
fn find_self(state: &GameState) -> Result<usize> {
    let pid = std::process::id() as i32;
    for _ in 0..50 {
        if let Some(me) = state.player_by_pid(pid) {
            return Ok(me);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    Err(anyhow!("pid {pid} never appeared in the player table"))
}

fn clock_entropy() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |t| t.as_nanos() as u64)
}
