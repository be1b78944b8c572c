use clap::Parser;
use flexi_logger::{AdaptiveFormat, Logger, WriteMode};
use lib_chomp::prelude::*;

fn main() -> Result<()> {
    // Initialize program options and environment.
    dotenvy::dotenv().ok();
    let options = MasterOptions::parse();
    let _logger = Logger::try_with_env_or_str(
        options.log_level.clone().unwrap_or("info".into()).as_str(),
    )?
    .write_mode(WriteMode::BufferAndFlush)
    .log_to_stderr()
    .adaptive_format_for_stderr(match cfg!(debug_assertions) {
        true => AdaptiveFormat::WithThread,
        _ => AdaptiveFormat::Default,
    })
    .start()?;

    let config = options.resolve();
    println!("{}", config.banner());

    // Segments first, then children, then the game itself.
    let mut arbiter = Arbiter::new(config)?;
    let ending = arbiter.run()?;
    log::info!("game ended: {ending}");
    arbiter.report()?;
    Ok(())
}
