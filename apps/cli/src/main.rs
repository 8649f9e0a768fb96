//! crmsync CLI: mirror business-development stage changes into the CRM.
//!
//! Runs one-off syncs against the local client registry and inspects
//! clients, contacts and stage journeys.

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
