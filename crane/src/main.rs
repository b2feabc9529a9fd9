//! crane - Entry Point
//!
//! Upgrades Rancher services from a CI job and tells everyone about it.

use anyhow::Context;
use clap::Parser;

use crane::app::run::{run_announce, run_deploy};
use crane::cli::{Cli, Commands};
use crane::logs::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_options()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Deploy(args) => run_deploy(args.options())
            .await
            .context("Deployment failed"),
        Commands::Announce(args) => {
            let stage = args.stage.into();
            run_announce(stage, args.options())
                .await
                .context("Announcement failed")
        }
    }
}
