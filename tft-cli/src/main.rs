//! TFT CLI - Command line tool for extracting transect flows from simulation output.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "tft",
    version,
    about = "Transect flow extraction and alternative comparison toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: tft_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    tft_cmd::run(cli.command)
}
