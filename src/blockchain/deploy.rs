// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MYERC20 contract deployment.
//!
//! Creation bytecode is read from a hex file; the constructor arguments
//! `(recipient, initialOwner)` are ABI-encoded and appended to it.

use std::path::Path;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol_types::SolValue,
};

use super::erc20::{parse_address, Erc20Contract, MyErc20Constructor};
use super::transactions::{SendResult, TxSender};
use super::types::TxStatus;
use super::waiter::WaitPolicy;
use crate::error::ClientError;

/// Lower bound of the heuristic deployment gas limit.
pub const MIN_DEPLOY_GAS: u64 = 1_000_000;
/// Upper bound of the heuristic deployment gas limit.
pub const MAX_DEPLOY_GAS: u64 = 10_000_000;

/// Outcome of a confirmed deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Address the contract was created at
    pub address: Address,
    pub sent: SendResult,
    pub status: TxStatus,
}

/// Read hex creation bytecode from a file. A `0x` prefix and surrounding
/// whitespace are accepted.
pub fn load_bytecode(path: &Path) -> Result<Vec<u8>, ClientError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ClientError::Config(format!("Cannot read bytecode file {}: {e}", path.display()))
    })?;
    decode_bytecode(&raw)
}

/// Decode hex bytecode text.
pub fn decode_bytecode(raw: &str) -> Result<Vec<u8>, ClientError> {
    let trimmed = raw.trim();
    let hex: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .split_whitespace()
        .collect();

    if hex.is_empty() {
        return Err(ClientError::Config("Bytecode is empty".to_string()));
    }

    alloy::hex::decode(&hex).map_err(|e| ClientError::Config(format!("Invalid bytecode hex: {e}")))
}

/// Creation code followed by the encoded constructor arguments.
pub fn creation_code(bytecode: &[u8], recipient: Address, initial_owner: Address) -> Bytes {
    let args = MyErc20Constructor {
        recipient,
        initialOwner: initial_owner,
    }
    .abi_encode();

    let mut code = Vec::with_capacity(bytecode.len() + args.len());
    code.extend_from_slice(bytecode);
    code.extend_from_slice(&args);
    code.into()
}

/// Gas limit used when the node cannot estimate a deployment.
///
/// Intrinsic creation cost, 200 gas per stored code byte and an allowance
/// for constructor execution, plus 30 %, kept within
/// [`MIN_DEPLOY_GAS`, `MAX_DEPLOY_GAS`].
pub fn heuristic_deploy_gas(bytecode_len: usize) -> u64 {
    let len = u64::try_from(bytecode_len).unwrap_or(u64::MAX);
    let base = 32_000u64
        .saturating_add(len.saturating_mul(200))
        .saturating_add(220_000);
    let buffered = base.saturating_add(base.saturating_mul(30) / 100);
    buffered.clamp(MIN_DEPLOY_GAS, MAX_DEPLOY_GAS)
}

/// Deploy the token, wait with [`WaitPolicy::DEPLOY`] and print its metadata.
///
/// `recipient` receives the initial supply; the deployer becomes owner.
pub async fn deploy_token(
    sender: &TxSender,
    bytecode_path: &Path,
    recipient: &str,
) -> Result<Deployment, ClientError> {
    println!("\n=== Deploying MYERC20 (EIP-1559) ===");
    let recipient = parse_address("recipient", recipient)?;
    let bytecode = load_bytecode(bytecode_path)?;
    let deployer = sender.address();

    println!("✓ Deployer: {deployer}");
    println!("✓ Recipient: {recipient}");
    println!("✓ Bytecode length: {} bytes", bytecode.len());

    let nonce = sender.pending_nonce().await?;
    println!("✓ Nonce: {nonce}");

    let chain_id = sender.chain_id().await?;
    println!("✓ Chain ID: {chain_id}");

    let code = creation_code(&bytecode, recipient, deployer);
    let request = TransactionRequest::default()
        .from(deployer)
        .with_deploy_code(code);

    let gas_limit = match sender.provider().estimate_gas(request.clone()).await {
        Ok(gas) => gas,
        Err(e) => {
            let fallback = heuristic_deploy_gas(bytecode.len());
            tracing::warn!(error = %e, fallback, "Deployment gas estimation failed");
            println!("Warning: gas estimation failed, using heuristic: {fallback}");
            fallback
        }
    };
    println!("✓ Gas limit: {gas_limit}");

    let predicted = deployer.create(nonce);
    println!("✓ Sending deployment transaction...");
    let sent = sender
        .send_with_fallback(request.nonce(nonce).gas_limit(gas_limit), chain_id, 1.0)
        .await?;
    println!("Expected contract address: {predicted}");

    println!("\n--- Waiting for deployment confirmation ---");
    let status = sender.wait(sent.tx_hash, WaitPolicy::DEPLOY).await?;

    let address = match status.contract_address.as_deref() {
        Some(addr) => parse_address("contract", addr)?,
        None => {
            tracing::warn!("Receipt has no contract address, using predicted address");
            predicted
        }
    };

    println!("✅ Contract deployed!");
    println!("   Address: {address}");
    println!("   Block: #{}", status.block_number);
    println!("   Gas used: {}", status.gas_used);

    verify_token(sender, address, recipient).await;

    Ok(Deployment {
        address,
        sent,
        status,
    })
}

/// Read back metadata from a freshly deployed token.
async fn verify_token(sender: &TxSender, address: Address, recipient: Address) {
    println!("\n--- Verifying contract ---");
    let token = Erc20Contract::at(sender.provider(), address);

    match token.name().await {
        Ok(name) => println!("✓ Name: {name}"),
        Err(e) => tracing::warn!(error = %e, "Could not read name"),
    }
    match token.symbol().await {
        Ok(symbol) => println!("✓ Symbol: {symbol}"),
        Err(e) => tracing::warn!(error = %e, "Could not read symbol"),
    }
    match token.decimals().await {
        Ok(decimals) => println!("✓ Decimals: {decimals}"),
        Err(e) => tracing::warn!(error = %e, "Could not read decimals"),
    }
    match token.balance_of_raw(recipient).await {
        Ok(balance) => {
            println!("✓ Recipient initial balance: {balance}");
            if let Ok(supply) = token.total_supply().await {
                if supply_went_to_recipient(supply, balance) {
                    println!("✓ Entire supply minted to recipient");
                } else {
                    println!("⚠️ Total supply {supply} differs from recipient balance");
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "Could not read recipient balance"),
    }
}

/// Whether a deployed contract's initial supply matches the recipient balance.
pub fn supply_went_to_recipient(total_supply: U256, recipient_balance: U256) -> bool {
    !total_supply.is_zero() && total_supply == recipient_balance
}
