//! Command line entry point.

mod commands;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    log::info!("Starting askboard");

    let cli = commands::Cli::parse();
    let output = commands::run(cli)?;
    print!("{output}");
    Ok(())
}
