// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Command handlers.
//!
//! Each handler prints its progress to stdout; diagnostics go through
//! `tracing`. The demo runs every feature in sequence and keeps going when
//! a step fails.

use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::blockchain::client::parse_tx_hash;
use crate::blockchain::deploy::deploy_token;
use crate::blockchain::erc20::parse_address;
use crate::blockchain::events::{print_log, EventWatcher};
use crate::blockchain::subscription::{connect_ws, print_block, BlockSubscriber};
use crate::blockchain::units::{format_amount, format_amount_fixed, format_gwei, ETH_DECIMALS};
use crate::blockchain::wallet::{create_wallet, is_valid_address, load_signer};
use crate::blockchain::{
    wait_for_transaction, BlockSummary, CallEncoding, EthClient, GasEstimate, ReceiptSummary,
    SendOptions, TokenBalance, TokenInfo, TxInfo, TxSender, WaitPolicy,
};
use crate::cli::{Commands, WalletCommands};
use crate::config::{
    Config, CONTRACT_ADDRESS_ENV, TEST_PRIVATE_KEY_ENV, TEST_RECIPIENT_ADDRESS_ENV,
    TEST_SEND_ADDRESS_ENV,
};
use crate::error::ClientError;

/// Total supply of a token, raw and scaled by its decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSupply {
    pub token: String,
    pub raw: String,
    pub formatted: String,
    pub decimals: u8,
}

impl TokenSupply {
    pub fn new(token: &str, supply: U256, decimals: u8) -> Self {
        Self {
            token: token.to_string(),
            raw: supply.to_string(),
            formatted: format_amount(supply, decimals),
            decimals,
        }
    }
}

/// Mainnet transaction used by the demo's query steps.
pub const DEMO_TX_HASH: &str =
    "0x34315509289fd16d4bb9e4d0c9b57441cf31a8c5552bb95a74d988c3f794cb67";

/// Print `value` as pretty JSON when `json` is set, otherwise through `text`.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<(), ClientError> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}

/// Run one command. `json` switches query output to JSON.
pub async fn execute(command: Commands, config: &Config, json: bool) -> Result<(), ClientError> {
    match command {
        Commands::Wallet(WalletCommands::New { pem_out }) => {
            let wallet = create_wallet()?;
            println!("Address: {}", wallet.address);
            println!("Private Key: {}", wallet.private_key_hex);
            if let Some(path) = pem_out {
                std::fs::write(&path, &wallet.private_key_pem)?;
                println!("PEM written to {}", path.display());
            }
            Ok(())
        }
        Commands::Wallet(WalletCommands::Address) => {
            println!("{}", signer(config)?.address());
            Ok(())
        }
        Commands::Wallet(WalletCommands::Validate { address }) => {
            if is_valid_address(&address) {
                println!("✅ {address} is a valid address");
                Ok(())
            } else {
                Err(ClientError::InvalidAddress(format!(
                    "{address} is not a 0x-prefixed 20-byte hex address"
                )))
            }
        }
        Commands::Block { number } => {
            let client = EthClient::new(&config.http_url())?;
            let block = match number {
                Some(n) => client.block_by_number(n).await?,
                None => client.latest_block().await?,
            };
            emit(json, &block, print_block_detail)
        }
        Commands::Tx { hash } => {
            let client = EthClient::new(&config.http_url())?;
            emit(json, &client.transaction(&hash).await?, print_tx)
        }
        Commands::Receipt { hash } => {
            let client = EthClient::new(&config.http_url())?;
            emit(json, &client.receipt(&hash).await?, print_receipt)
        }
        Commands::Balance {
            address,
            token,
            manual,
        } => {
            let client = EthClient::new(&config.http_url())?;
            let balance = match token {
                Some(token) => {
                    let encoding = CallEncoding::from_manual_flag(manual);
                    client.token_balance(&address, &token, encoding).await?
                }
                None => client.native_balance(&address).await?,
            };
            emit(json, &balance, |b| print_balance(&address, b))
        }
        Commands::TokenInfo { token } => {
            let token = or_config(token, &config.contract_address, CONTRACT_ADDRESS_ENV)?;
            let client = EthClient::new(&config.http_url())?;
            let info = client.token_info(&token).await?;
            emit(json, &info, print_token_info)
        }
        Commands::Supply { token } => {
            let token = or_config(token, &config.contract_address, CONTRACT_ADDRESS_ENV)?;
            let client = EthClient::new(&config.http_url())?;
            let (supply, decimals) = client.total_supply(&token).await?;
            emit(json, &TokenSupply::new(&token, supply, decimals), |s| {
                println!("Total supply: {} ({} base units)", s.formatted, s.raw);
            })
        }
        Commands::SendEth { to, amount, wait } => {
            let to = or_config(to, &config.test_recipient_address, TEST_RECIPIENT_ADDRESS_ENV)?;
            let sender = sender(config)?;
            let sent = sender.transfer_eth(&to, &amount).await?;
            if wait {
                sender.wait(sent.tx_hash, WaitPolicy::QUICK).await?;
            }
            Ok(())
        }
        Commands::SendToken {
            to,
            amount,
            token,
            manual,
            no_wait,
        } => {
            let to = or_config(to, &config.test_recipient_address, TEST_RECIPIENT_ADDRESS_ENV)?;
            let token = or_config(token, &config.contract_address, CONTRACT_ADDRESS_ENV)?;
            let encoding = CallEncoding::from_manual_flag(manual);

            let sender = sender(config)?;
            let (sent, units) = sender.transfer_token(&token, &to, &amount, encoding).await?;
            if !no_wait {
                sender.confirm_token_transfer(&token, &to, &sent, units).await?;
            }
            Ok(())
        }
        Commands::Estimate { to, amount, token } => {
            let sender = sender(config)?;
            let estimate = match token {
                Some(token) => sender.estimate_token_transfer(&token, &to, &amount).await?,
                None => sender.estimate_eth_transfer(&to, &amount).await?,
            };
            emit(json, &estimate, print_estimate)
        }
        Commands::Deploy {
            recipient,
            bytecode,
        } => {
            let recipient = or_config(recipient, &config.test_send_address, TEST_SEND_ADDRESS_ENV)?;
            let path = bytecode.unwrap_or_else(|| config.contract_bytecode_path.clone());
            let sender = sender(config)?;
            let deployment = deploy_token(&sender, &path, &recipient).await?;
            println!("📝 Set {CONTRACT_ADDRESS_ENV}={} in .env to reuse it", deployment.address);
            Ok(())
        }
        Commands::Wait {
            hash,
            confirmations,
            timeout,
        } => {
            let hash = parse_tx_hash(&hash)?;
            let client = EthClient::new(&config.http_url())?;
            let policy = WaitPolicy {
                confirmations,
                timeout: Duration::from_secs(timeout),
            };
            let status = wait_for_transaction(client.provider(), hash, policy).await?;
            println!(
                "✅ Confirmed: block #{}, {} confirmation(s), gas used {}",
                status.block_number, status.confirmations, status.gas_used
            );
            Ok(())
        }
        Commands::WatchBlocks { count } => {
            let subscriber = BlockSubscriber::connect(&config.ws_url()).await?;
            let seen = subscriber.watch(count, shutdown_on_ctrl_c(), print_block).await?;
            println!("Received {seen} block(s)");
            Ok(())
        }
        Commands::WatchEvents {
            contract,
            from_block,
            history_only,
            chunk_size,
        } => {
            let contract = or_config(contract, &config.contract_address, CONTRACT_ADDRESS_ENV)?;
            let contract = parse_address("contract", &contract)?;
            let history = from_block.map(|from| (from, chunk_size));
            watch_events(config, contract, history, history_only).await
        }
        Commands::NodeInfo => {
            let client = EthClient::new(&config.http_url())?;
            let info = client.node_info().await?;
            emit(json, &info, |info| {
                println!("Chain ID: {}", info.chain_id);
                if let Some(network) = &info.network {
                    println!("Network: {network}");
                }
                println!("Network ID: {}", info.network_id);
                println!("Latest block: #{}", info.latest_block.number);
                println!("Block time: {}", format_timestamp(info.latest_block.timestamp));
                println!("Gas limit: {}", info.latest_block.gas_limit);
                println!("Transactions: {}", info.latest_block.tx_count);
            })
        }
        Commands::Demo => {
            run_demo(config).await;
            Ok(())
        }
    }
}

fn signer(config: &Config) -> Result<PrivateKeySigner, ClientError> {
    if !config.has_private_key() {
        return Err(ClientError::Config(format!("{TEST_PRIVATE_KEY_ENV} is not set")));
    }
    load_signer(&config.test_private_key)
}

fn sender(config: &Config) -> Result<TxSender, ClientError> {
    let options = SendOptions {
        gas_price_multiplier: config.gas_price_multiplier,
        default_gas_limit: config.default_gas_limit,
    };
    TxSender::new(&config.http_url(), signer(config)?, options)
}

/// Use the argument, else the configured value, else fail naming the variable.
fn or_config(arg: Option<String>, configured: &str, env: &str) -> Result<String, ClientError> {
    match arg {
        Some(value) => Ok(value),
        None if !configured.is_empty() => Ok(configured.to_string()),
        None => Err(ClientError::Config(format!(
            "no value given and {env} is not set"
        ))),
    }
}

/// Token cancelled on Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, stopping");
            token.cancel();
        }
    });
    shutdown
}

/// Replay history from `(from_block, chunk_size)` if given, then follow
/// live events unless `history_only`.
async fn watch_events(
    config: &Config,
    contract: Address,
    history: Option<(u64, u64)>,
    history_only: bool,
) -> Result<(), ClientError> {
    if let Some((from, chunk_size)) = history {
        let client = EthClient::new(&config.http_url())?;
        let head = client.block_number().await?;
        println!("📜 Replaying events of {contract} from block #{from} to #{head}");

        let watcher =
            EventWatcher::new(client.provider().clone(), contract).with_chunk_size(chunk_size);
        let logs = watcher.fetch_history(from, head).await?;
        for log in &logs {
            print_log(log);
        }
        println!("Replayed {} event(s)", logs.len());
    }

    if history_only {
        return Ok(());
    }

    let provider = connect_ws(&config.ws_url()).await?;
    let watcher = EventWatcher::new(provider, contract);
    let seen = watcher.run(shutdown_on_ctrl_c(), print_log).await?;
    println!("Received {seen} event(s)");
    Ok(())
}

fn format_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

fn print_block_detail(block: &BlockSummary) {
    println!("Block #{}: {}", block.number, block.hash);
    println!("   Parent: {}", block.parent_hash);
    println!("   Time: {}", format_timestamp(block.timestamp));
    println!("   Transactions: {}", block.tx_count);
    println!("   Gas used: {} / {}", block.gas_used, block.gas_limit);
    if let Some(base_fee) = block.base_fee_per_gas {
        println!("   Base fee: {} Gwei", format_gwei(u128::from(base_fee)));
    }
    println!("   Miner: {}", block.miner);
}

fn print_tx(tx: &TxInfo) {
    let value = U256::from_str_radix(&tx.value_wei, 10).unwrap_or_default();
    println!("Tx {} => Value: {} ETH", tx.hash, format_amount_fixed(value, ETH_DECIMALS, 4));
    println!("   From: {}", tx.from);
    println!("   To: {}", tx.to.as_deref().unwrap_or("(contract creation)"));
    println!("   Nonce: {}", tx.nonce);
    println!("   Type: {}", tx.tx_type);
    println!("   Gas limit: {}", tx.gas_limit);
    if let Some(price) = tx.gas_price {
        println!("   Gas price: {} Gwei", format_gwei(price));
    }
    if let Some(tip) = tx.max_priority_fee_per_gas {
        println!("   Max fee: {} Gwei", format_gwei(tx.max_fee_per_gas));
        println!("   Tip: {} Gwei", format_gwei(tip));
    }
    if let Some(chain_id) = tx.chain_id {
        println!("   Chain ID: {chain_id}");
    }
    match tx.block_number {
        Some(n) => println!("   Block: #{n}"),
        None => println!("   Pending"),
    }
    if tx.input.len() > 2 {
        println!("   Input: {} bytes", (tx.input.len() - 2) / 2);
    }
}

fn print_receipt(receipt: &ReceiptSummary) {
    println!(
        "Receipt: Status={}, GasUsed={}",
        u8::from(receipt.success),
        receipt.gas_used
    );
    println!("   Block: #{}", receipt.block_number);
    println!("   Effective gas price: {} Gwei", format_gwei(receipt.effective_gas_price));
    println!("   Logs: {}", receipt.log_count);
    if let Some(address) = &receipt.contract_address {
        println!("   Contract created: {address}");
    }
}

fn print_token_info(info: &TokenInfo) {
    println!("Token: {}", info.address);
    println!("   Name: {}", info.name);
    println!("   Symbol: {}", info.symbol);
    println!("   Decimals: {}", info.decimals);
    if let Some(owner) = &info.owner {
        println!("   Owner: {owner}");
    }
    match info.paused {
        Some(true) => println!("   Paused: yes"),
        Some(false) => println!("   Paused: no"),
        None => {}
    }
}

fn print_estimate(estimate: &GasEstimate) {
    println!("Gas limit: {}", estimate.gas_limit);
    println!("Max fee: {} Gwei", format_gwei(estimate.max_fee_per_gas));
    println!("Tip: {} Gwei", format_gwei(estimate.max_priority_fee_per_gas));
    println!("Max cost: {} ETH", estimate.estimated_cost_eth);
}

fn print_balance(address: &str, balance: &TokenBalance) {
    println!("Address: {address}");
    if let Some(contract) = &balance.contract_address {
        println!("   Token: {} ({}) at {contract}", balance.name, balance.symbol);
    }
    println!("   Balance: {} {}", balance.balance_formatted, balance.symbol);
    println!("   Raw: {}", balance.balance_raw);
}

/// Log a failed demo step and carry on.
fn report_step<T>(step: &str, result: Result<T, ClientError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(step, error = %e, "Demo step failed");
            println!("⚠️ {step} failed: {e}");
            None
        }
    }
}

/// Guided walkthrough: wallet, queries, subscription, then deployment and
/// transfers when a signing key is configured.
pub async fn run_demo(config: &Config) {
    println!("Ethereum Client Tutorial");
    println!("========================");

    println!("\n1. Wallet creation:");
    if let Some(wallet) = report_step("Wallet creation", create_wallet()) {
        println!("Address: {}\nPrivate Key: {}", wallet.address, wallet.private_key_hex);
    }

    let configured = config.network();
    let network = match (&configured, config.ethereum_network.as_str()) {
        (Some(n), _) => n.name,
        (None, "") => "unknown",
        (None, name) => name,
    };
    println!("\n2. Connecting to Ethereum ({network})...");
    println!("   HTTP URL: {}", config.ethereum_http_url);
    println!("   WebSocket URL: {}", config.ethereum_ws_url);

    let Some(client) = report_step("Client setup", EthClient::new(&config.http_url())) else {
        return;
    };
    let Some(chain_id) = report_step("Connection", client.chain_id().await) else {
        println!("Network unavailable, only offline features were shown");
        return;
    };
    println!("✅ Connected, chain ID {chain_id}");
    if let Some(expected) = configured.filter(|n| n.chain_id != chain_id) {
        tracing::warn!(expected = expected.chain_id, actual = chain_id, "Chain ID differs from ETHEREUM_NETWORK");
        println!(
            "⚠️ {} expects chain ID {}, the node reports {chain_id}",
            expected.name, expected.chain_id
        );
    }

    println!("\n3. Queries:");
    if let Some(block) = report_step("Block query", client.latest_block().await) {
        println!("Block #{}: {}", block.number, block.hash);
    }
    if let Some(tx) = report_step("Transaction query", client.transaction(DEMO_TX_HASH).await) {
        print_tx(&tx);
    }
    if let Some(receipt) = report_step("Receipt query", client.receipt(DEMO_TX_HASH).await) {
        print_receipt(&receipt);
    }

    println!("\n4. Block subscription:");
    match BlockSubscriber::connect(&config.ws_url()).await {
        Ok(subscriber) => {
            if let Some(block) = report_step("Block subscription", subscriber.first_block().await) {
                print_block(&block);
                println!("✅ Received new block #{}", block.number);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket unavailable");
            println!("⚠️ Block subscription needs a WebSocket endpoint, skipping");
        }
    }

    if !config.has_private_key() {
        println!("\nSet {TEST_PRIVATE_KEY_ENV} in .env to try deployment and transfers");
        return;
    }
    let Some(sender) = report_step("Signer setup", sender(config)) else {
        return;
    };

    println!("\n5. Contract deployment:");
    println!("The deployer becomes the contract owner");
    let deployed = match config.test_send_address.as_str() {
        "" => {
            println!("⚠️ {TEST_SEND_ADDRESS_ENV} not set, skipping deployment");
            None
        }
        recipient => report_step(
            "Deployment",
            deploy_token(&sender, &config.contract_bytecode_path, recipient).await,
        ),
    };

    let recipient = config.test_recipient_address.as_str();
    if recipient.is_empty() {
        println!("⚠️ {TEST_RECIPIENT_ADDRESS_ENV} not set, skipping transfers");
        return;
    }

    println!("\n6. Transfers:");
    println!("Sending 0.001 ETH to {recipient}. Use a test network!");
    if let Some(sent) = report_step("ETH transfer", sender.transfer_eth(recipient, "0.001").await) {
        println!("✅ ETH transfer sent: {:#x}", sent.tx_hash);
    }

    let Some(deployment) = deployed else {
        println!("\n⚠️ Deployment did not succeed, skipping token features");
        return;
    };
    let token = deployment.address.to_string();

    println!("\n=== Method 1: hand-built ERC-20 transfer ===");
    if let Some((sent, _)) = report_step(
        "Manual token transfer",
        sender
            .transfer_token(&token, recipient, "10", CallEncoding::Manual)
            .await,
    ) {
        println!("✅ Manual transfer sent: {:#x}", sent.tx_hash);
    }

    println!("\n=== Method 2: ABI binding ERC-20 transfer (EIP-1559) ===");
    let abi_transfer = async {
        let (sent, units) = sender
            .transfer_token(&token, recipient, "15", CallEncoding::Abi)
            .await?;
        sender
            .confirm_token_transfer(&token, recipient, &sent, units)
            .await?;
        Ok::<_, ClientError>(sent)
    };
    if let Some(sent) = report_step("ABI token transfer", abi_transfer.await) {
        println!("✅ ABI transfer confirmed: {:#x}", sent.tx_hash);
    }

    println!("\n7. Recipient token balance:");
    if let Some(balance) = report_step(
        "Token balance",
        client
            .token_balance(recipient, &token, CallEncoding::Manual)
            .await,
    ) {
        print_balance(recipient, &balance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_config_prefers_argument() {
        assert_eq!(or_config(Some("a".into()), "b", "X").unwrap(), "a");
        assert_eq!(or_config(None, "b", "X").unwrap(), "b");

        let err = or_config(None, "", CONTRACT_ADDRESS_ENV).unwrap_err();
        assert!(err.to_string().contains(CONTRACT_ADDRESS_ENV));
    }

    #[test]
    fn signing_commands_need_a_key() {
        let config = Config::default();
        assert!(matches!(signer(&config), Err(ClientError::Config(_))));
        assert!(sender(&config).is_err());
    }

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(format_timestamp(u64::MAX), u64::MAX.to_string());
    }

    #[test]
    fn report_step_swallows_errors() {
        assert_eq!(report_step("ok", Ok::<_, ClientError>(3)), Some(3));
        assert_eq!(
            report_step::<u8>("bad", Err(ClientError::NotFound("x".into()))),
            None
        );
    }

    #[test]
    fn emit_renders_json() {
        let info = TokenInfo {
            address: "0x0000000000000000000000000000000000000001".into(),
            name: "MyERC20".into(),
            symbol: "MYE".into(),
            decimals: 18,
            owner: None,
            paused: Some(false),
        };
        let mut printed = false;
        emit(false, &info, |_| printed = true).unwrap();
        assert!(printed);
        emit(true, &info, |_| panic!("text output used in JSON mode")).unwrap();
    }

    #[test]
    fn supply_json_has_raw_and_formatted() {
        let supply = TokenSupply::new(
            "0x0000000000000000000000000000000000000001",
            U256::from(1_500_000_000_000_000_000u64),
            18,
        );
        let json = serde_json::to_value(&supply).unwrap();
        assert_eq!(json["raw"], "1500000000000000000");
        assert_eq!(json["formatted"], "1.5");
        assert_eq!(json["decimals"], 18);

        emit(true, &supply, |_| panic!("text output used in JSON mode")).unwrap();
    }

    #[tokio::test]
    async fn wallet_validate_checks_format() {
        let validate = |address: &str| {
            Commands::Wallet(WalletCommands::Validate {
                address: address.to_string(),
            })
        };
        execute(
            validate("0x5425890298aed601595a70AB815c96711a31Bc65"),
            &Config::default(),
            false,
        )
        .await
        .unwrap();

        let err = execute(validate("0x1234"), &Config::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn wallet_new_writes_pem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.pem");
        execute(
            Commands::Wallet(WalletCommands::New {
                pem_out: Some(path.clone()),
            }),
            &Config::default(),
            false,
        )
        .await
        .unwrap();

        let pem = std::fs::read_to_string(&path).unwrap();
        assert!(pem.contains("BEGIN PRIVATE KEY"));
    }

    #[tokio::test]
    async fn missing_contract_address_is_reported() {
        let err = execute(Commands::TokenInfo { token: None }, &Config::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
