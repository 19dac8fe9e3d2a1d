//! meshview entry point
//!
//! Controls while viewing:
//!   - WASD / Arrow Keys: Rotate
//!   - E/R: Roll rotation
//!   - +/-: Scale
//!   - M: Cycle display mode
//!   - Q/ESC: Quit

use anyhow::Result;
use clap::Parser;

use meshview_terminal::cli::{execute, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; redirect it while the viewer owns the screen
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    execute(cli)
}
