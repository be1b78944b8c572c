use std::path::PathBuf;
use std::time::SystemTime;

use clap::Parser;
use itertools::Itertools;

use crate::chomp::prelude::*;

/// Arbiter command line. `-h` is the board height, so clap's automatic
/// help short is disabled and help lives on `--help` alone.
#[derive(Clone, Debug, Parser)]
#[command(name = "master", about = "ChompChamps arbiter", disable_help_flag = true)]
pub struct MasterOptions {
    /// Board width; floored at 10.
    #[arg(short = 'w', long, default_value_t = MIN_WIDTH)]
    pub width: u16,

    /// Board height; floored at 10.
    #[arg(short = 'h', long, default_value_t = MIN_HEIGHT)]
    pub height: u16,

    /// Milliseconds slept after each committed valid move.
    #[arg(short = 'd', long, default_value_t = DEFAULT_DELAY_MS)]
    pub delay: u64,

    /// Seconds without a valid move before the game is called off.
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Seed for the reward board; defaults to the current time.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// View binary to spawn, if any.
    #[arg(short = 'v', long)]
    pub view: Option<PathBuf>,

    /// One to nine player binaries.
    #[arg(short = 'p', long, num_args = 1..=9, required = true)]
    pub players: Vec<PathBuf>,

    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, action = clap::ArgAction::HelpLong, help = "Print help")]
    help: Option<bool>,
}

/// The resolved parameters a game actually runs with.
#[derive(Clone, Debug)]
pub struct MasterConfig {
    pub width: u16,
    pub height: u16,
    pub delay: Duration,
    pub timeout: Duration,
    pub seed: u64,
    pub view: Option<PathBuf>,
    pub players: Vec<PathBuf>,
}

impl MasterOptions {
    pub fn resolve(&self) -> MasterConfig {
        let seed = self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_or(0, |t| t.as_secs())
        });
        MasterConfig {
            width: self.width.max(MIN_WIDTH),
            height: self.height.max(MIN_HEIGHT),
            delay: Duration::from_millis(self.delay),
            timeout: Duration::from_secs(self.timeout),
            seed,
            view: self.view.clone(),
            players: self.players.clone(),
        }
    }
}

impl MasterConfig {
    /// The startup banner listing every resolved parameter.
    pub fn banner(&self) -> String {
        format!(
            "ChompChamps arbiter\n  board:   {}x{}\n  delay:   {} ms\n  timeout: {} s\n  seed:    {}\n  view:    {}\n  players: {}",
            self.width,
            self.height,
            self.delay.as_millis(),
            self.timeout.as_secs(),
            self.seed,
            self.view
                .as_ref()
                .map_or("none".to_owned(), |v| v.display().to_string()),
            self.players.iter().map(|p| p.display()).join(" "),
        )
    }
}
