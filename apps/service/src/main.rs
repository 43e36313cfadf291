mod config;
mod database;
mod orchestrator;
mod pool;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ledgerping::RunMode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::orchestrator::Orchestrator;

/// Synthetic transaction probes for ledger RPC clusters
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Clusters to probe: `all`, or one or more of mainnet, testnet, devnet separated by commas
    #[arg(default_value = "all")]
    clusters: RunMode,

    /// Config file, defaults to $XDG_CONFIG_HOME/ledgerping/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Raise log verbosity when RUST_LOG is unset (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_tracing(cli.verbose);

    let config = Config::from_config(cli.config.as_ref()).context("failed to load configuration")?;
    info!("\n{config}");
    info!(mode = %cli.clusters, "Ping service will run clusters");

    let pool = if config.database.enabled {
        Some(pool::open_pool(&config.database.path, 4).await?)
    } else {
        None
    };

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, stopping workers"),
            Err(error) => error!(%error, "Failed to listen for Ctrl-C, stopping workers"),
        }
        signal.cancel();
    });

    Orchestrator::start(config, pool, cli.clusters, cancel).await
}
