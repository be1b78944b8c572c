use std::io::Write;

use clap::Parser;
use flexi_logger::Logger;
use lib_chomp::prelude::*;

/// Argv contract: the master invokes the view with exactly two positional
/// arguments, the board width and height.
#[derive(Debug, Parser)]
#[command(name = "view")]
struct ViewArgs {
    width: u16,
    height: u16,
}

fn main() -> Result<()> {
    let args = ViewArgs::parse();
    // stdout carries the frames; logs go to stderr.
    let _logger = Logger::try_with_env_or_str("info")?.log_to_stderr().start()?;

    let board = BoardSegment::attach(args.width, args.height)?;
    let sync_segment = SyncSegment::attach()?;
    let sync = sync_segment.sync();

    loop {
        // Strict ping-pong with the master: one frame per committed move,
        // plus a final frame once the game is over.
        sync.view_update().wait()?;

        sync.reader_enter()?;
        let frame = board.state().render();
        let over = board.state().game_over();
        sync.reader_exit()?;

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(frame.as_bytes())?;
        stdout.flush()?;
        drop(stdout);

        sync.view_done().post()?;
        if over {
            break;
        }
    }

    log::debug!("view done after final frame");
    Ok(())
}
