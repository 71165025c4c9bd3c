//! Local store maintenance binary.

mod cli;
mod logging;

use clap::Parser;

fn main() -> eyre::Result<()> {
    let cli = cli::LocalStoreCli::parse();
    logging::init_logging(&cli.logs)?;
    cli::run(cli)
}
