// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use clap::Parser;

use ethclient_tutorial::cli::Cli;
use ethclient_tutorial::commands;
use ethclient_tutorial::config::Config;
use ethclient_tutorial::telemetry::{init_tracing, LogFormat};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = Config::load();
    cli.apply_overrides(&mut config);

    if let Err(e) = init_tracing(&config.log_level, LogFormat::parse(&config.log_format)) {
        eprintln!("Warning: {e}");
    }

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }
    match config.network() {
        Some(network) => tracing::info!(
            network = network.name,
            chain_id = network.chain_id,
            test_mode = config.is_test_mode(),
            "Configured network"
        ),
        None if !config.ethereum_network.is_empty() => {
            tracing::warn!(network = %config.ethereum_network, "Unknown ETHEREUM_NETWORK value")
        }
        None => {}
    }
    if config.is_production_mode() {
        tracing::warn!("Running against mainnet, transfers spend real ETH");
    }

    if let Err(e) = commands::execute(cli.command, &config, cli.json).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
