//! plugsync CLI: scrape two plugin/theme catalogs and reconcile them.
//!
//! Finds which items listed on one site are listed on the other, and whether
//! the versions are behind, equal or ahead.

mod commands;
mod progress;
mod report;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
