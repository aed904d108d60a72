//! eventdigest CLI: weekly event digests for Discord.
//!
//! Consolidates raw event search results into a deduplicated, weekday-grouped
//! digest, writes the result files and optionally posts to a webhook.

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
