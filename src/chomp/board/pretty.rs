use std::fmt::Write as _;

use crate::chomp::prelude::*;

const RESET: &str = "\x1b[0m";
const CLEAR: &str = "\x1b[2J\x1b[H";
const REWARD: &str = "\x1b[32m";
const MARKER: &str = "\x1b[1;33m";

/// One colour per player slot for captured territory.
const PLAYER_COLOURS: [&str; MAX_PLAYERS] = [
    "\x1b[31m",    // red
    "\x1b[34m",    // blue
    "\x1b[35m",    // magenta
    "\x1b[36m",    // cyan
    "\x1b[33m",    // yellow
    "\x1b[97m",    // white
    "\x1b[37;44m", // white on blue
    "\x1b[37;45m", // white on magenta
    "\x1b[37;46m", // white on cyan
];

impl GameState {
    /// Renders one full ANSI frame: status header, player table, the board
    /// grid, and a legend. The view prints this verbatim after every
    /// committed move.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(CLEAR);

        let _ = writeln!(out, "===== ChompChamps =====");
        let status = if self.game_over() { "GAME OVER" } else { "IN PROGRESS" };
        let _ = writeln!(out, "Game Status: {status}\n");

        let _ = writeln!(out, "Players:");
        for (i, p) in self.players().iter().enumerate() {
            let colour = PLAYER_COLOURS[i];
            let activity = if p.blocked { "BLOCKED" } else { "ACTIVE" };
            let _ = writeln!(
                out,
                "{colour}[{i}] {} - Score: {}, Position: ({},{}), Valid Moves: {}, Invalid Moves: {}, {activity}{RESET}",
                p.name(),
                p.score,
                p.x,
                p.y,
                p.valid_moves,
                p.invalid_moves,
            );
        }
        out.push('\n');

        let _ = writeln!(out, "Board:");
        out.push_str("   ");
        for x in 0..self.width {
            let _ = write!(out, "{x:2} ");
        }
        out.push('\n');

        for y in 0..self.height {
            let _ = write!(out, "{y:2} ");
            for x in 0..self.width {
                let at = Coord::new(x, y);
                let value = self.cell(at);
                if self.players().iter().any(|p| p.position() == at) {
                    let _ = write!(out, "{MARKER} # {RESET}");
                } else if value > 0 {
                    let _ = write!(out, "{REWARD}{value:2} {RESET}");
                } else {
                    match owner_of(value).filter(|&o| o < self.player_count as usize) {
                        Some(owner) => {
                            let _ = write!(out, "{}{owner:2} {RESET}", PLAYER_COLOURS[owner]);
                        }
                        None => {
                            let _ = write!(out, "\x1b[31m ? {RESET}");
                        }
                    }
                }
            }
            out.push('\n');
        }

        let _ = writeln!(out, "\nLegend:");
        let _ = writeln!(out, "{REWARD}1-9{RESET} - Reward value");
        for i in 0..self.player_count as usize {
            let _ = writeln!(
                out,
                "{}{i:2} {RESET} - Player {i}'s captured cells",
                PLAYER_COLOURS[i]
            );
        }
        let _ = writeln!(out, "{MARKER} # {RESET} - Player's current position");

        out
    }
}
