// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Command line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::blockchain::events::DEFAULT_CHUNK_SIZE;
use crate::config::Config;

/// Main CLI.
#[derive(Debug, Parser)]
#[command(name = "ethclient")]
#[command(about = "Ethereum client tutorial: queries, transfers, deployment and subscriptions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// HTTP JSON-RPC base URL (overrides ETHEREUM_HTTP_URL)
    #[arg(long, global = true)]
    pub http_url: Option<String>,

    /// WebSocket base URL (overrides ETHEREUM_WS_URL)
    #[arg(long, global = true)]
    pub ws_url: Option<String>,

    /// Signing key as hex or a path to a .pem file (overrides TEST_PRIVATE_KEY)
    #[arg(long, global = true)]
    pub private_key: Option<String>,

    /// Log filter (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Print query results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command line overrides on top of the environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.http_url {
            config.ethereum_http_url = url.clone();
        }
        if let Some(url) = &self.ws_url {
            config.ethereum_ws_url = url.clone();
        }
        if let Some(key) = &self.private_key {
            config.test_private_key = key.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Wallet management
    #[command(subcommand)]
    Wallet(WalletCommands),

    /// Show a block (latest when no number is given)
    Block {
        /// Block number
        number: Option<u64>,
    },

    /// Show a transaction by hash
    Tx {
        /// Transaction hash
        hash: String,
    },

    /// Show a transaction receipt
    Receipt {
        /// Transaction hash
        hash: String,
    },

    /// ETH or token balance of an address
    Balance {
        /// Address to query
        address: String,
        /// ERC-20 contract; ETH balance when omitted
        #[arg(short, long)]
        token: Option<String>,
        /// Build the balanceOf calldata by hand instead of through the ABI binding
        #[arg(long, requires = "token")]
        manual: bool,
    },

    /// Token name, symbol and decimals
    TokenInfo {
        /// ERC-20 contract (defaults to CONTRACT_ADDRESS)
        token: Option<String>,
    },

    /// Token total supply
    Supply {
        /// ERC-20 contract (defaults to CONTRACT_ADDRESS)
        token: Option<String>,
    },

    /// Send ETH
    SendEth {
        /// Recipient (defaults to TEST_RECIPIENT_ADDRESS)
        #[arg(long)]
        to: Option<String>,
        /// Amount in ether
        #[arg(default_value = "0.001")]
        amount: String,
        /// Wait for one confirmation
        #[arg(long)]
        wait: bool,
    },

    /// Send ERC-20 tokens
    SendToken {
        /// Recipient (defaults to TEST_RECIPIENT_ADDRESS)
        #[arg(long)]
        to: Option<String>,
        /// Amount in whole tokens
        #[arg(default_value = "10")]
        amount: String,
        /// ERC-20 contract (defaults to CONTRACT_ADDRESS)
        #[arg(short, long)]
        token: Option<String>,
        /// Build calldata by hand instead of through the ABI binding
        #[arg(long)]
        manual: bool,
        /// Return right after broadcasting
        #[arg(long)]
        no_wait: bool,
    },

    /// Estimate gas and cost of an ETH or token transfer
    Estimate {
        /// Recipient
        to: String,
        /// Amount in ether, or in whole tokens with --token
        #[arg(default_value = "0.001")]
        amount: String,
        /// ERC-20 contract; estimates an ETH transfer when omitted
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Deploy the MYERC20 token
    Deploy {
        /// Initial supply recipient (defaults to TEST_SEND_ADDRESS)
        #[arg(long)]
        recipient: Option<String>,
        /// Hex creation bytecode (defaults to CONTRACT_BYTECODE_PATH)
        #[arg(long)]
        bytecode: Option<PathBuf>,
    },

    /// Wait for a transaction to be mined and confirmed
    Wait {
        /// Transaction hash
        hash: String,
        /// Required confirmations
        #[arg(short, long, default_value = "1")]
        confirmations: u64,
        /// Timeout in seconds
        #[arg(long, default_value = "180")]
        timeout: u64,
    },

    /// Print new blocks as they arrive (WebSocket)
    WatchBlocks {
        /// Stop after this many blocks
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Print contract events
    WatchEvents {
        /// Contract to watch (defaults to CONTRACT_ADDRESS)
        #[arg(long)]
        contract: Option<String>,
        /// Replay events from this block before going live
        #[arg(long)]
        from_block: Option<u64>,
        /// Only replay history, do not subscribe
        #[arg(long, requires = "from_block")]
        history_only: bool,
        /// Blocks per eth_getLogs query when replaying history
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },

    /// Chain id, network id and latest block
    NodeInfo,

    /// Run the guided walkthrough of every feature
    Demo,
}

/// Wallet commands.
#[derive(Debug, Subcommand)]
pub enum WalletCommands {
    /// Generate a new random wallet
    New {
        /// Also write the key as PKCS#8 PEM to this file
        #[arg(long)]
        pem_out: Option<PathBuf>,
    },
    /// Print the address of the configured key
    Address,
    /// Check that a string is a well-formed address
    Validate {
        /// Address to check
        address: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ethclient").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_token_defaults() {
        let cli = parse(&["send-token"]);
        match cli.command {
            Commands::SendToken {
                to,
                amount,
                token,
                manual,
                no_wait,
            } => {
                assert!(to.is_none());
                assert_eq!(amount, "10");
                assert!(token.is_none());
                assert!(!manual);
                assert!(!no_wait);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_overrides_apply() {
        let cli = parse(&[
            "block",
            "--http-url",
            "http://127.0.0.1:9545",
            "--log-level",
            "debug",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.ethereum_http_url, "http://127.0.0.1:9545");
        assert_eq!(config.log_level, "debug");
        assert!(matches!(cli.command, Commands::Block { number: None }));
        assert!(!cli.json);
        assert!(parse(&["node-info", "--json"]).json);
    }

    #[test]
    fn wait_parses_confirmations() {
        let cli = parse(&["wait", "0xabc", "-c", "3", "--timeout", "600"]);
        assert!(matches!(
            cli.command,
            Commands::Wait {
                confirmations: 3,
                timeout: 600,
                ..
            }
        ));
    }

    #[test]
    fn history_only_requires_from_block() {
        let result =
            Cli::try_parse_from(["ethclient", "watch-events", "--history-only"]);
        assert!(result.is_err());

        let cli = parse(&["watch-events", "--from-block", "100", "--history-only"]);
        assert!(matches!(
            cli.command,
            Commands::WatchEvents {
                from_block: Some(100),
                history_only: true,
                ..
            }
        ));
    }

    #[test]
    fn estimate_and_balance_token_flags() {
        assert!(matches!(
            parse(&["estimate", "0xabc", "5", "-t", "0xdef"]).command,
            Commands::Estimate { token: Some(_), .. }
        ));
        assert!(matches!(
            parse(&["balance", "0xabc", "-t", "0xdef", "--manual"]).command,
            Commands::Balance { manual: true, .. }
        ));
        assert!(Cli::try_parse_from(["ethclient", "balance", "0xabc", "--manual"]).is_err());
    }

    #[test]
    fn watch_events_chunk_size_defaults() {
        assert!(matches!(
            parse(&["watch-events"]).command,
            Commands::WatchEvents { chunk_size: DEFAULT_CHUNK_SIZE, .. }
        ));
        assert!(matches!(
            parse(&["watch-events", "--from-block", "1", "--chunk-size", "500"]).command,
            Commands::WatchEvents { chunk_size: 500, .. }
        ));
    }

    #[test]
    fn wallet_subcommands() {
        assert!(matches!(
            parse(&["wallet", "new"]).command,
            Commands::Wallet(WalletCommands::New { pem_out: None })
        ));
        assert!(matches!(
            parse(&["wallet", "address"]).command,
            Commands::Wallet(WalletCommands::Address)
        ));
        assert!(matches!(
            parse(&["wallet", "validate", "0x1234"]).command,
            Commands::Wallet(WalletCommands::Validate { .. })
        ));
    }
}
