//! ListScout CLI — automated discovery of new entries for a curated,
//! category-organized resource catalog.
//!
//! Plans search terms per category, fans out bounded concurrent searches,
//! deduplicates against the existing corpus, and checkpoints progress
//! under strict wall-clock budgets.

mod commands;

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
