// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Contract Event Watcher
//!
//! Decodes the events emitted by the tutorial token.
//!
//! ## Sources
//!
//! 1. **Live**: `eth_subscribe("logs")` filtered by contract address. Needs a
//!    WebSocket provider.
//! 2. **History**: `eth_getLogs` over a block range, split into chunks so
//!    public endpoints do not reject the query.
//!
//! Events are matched on `topics[0]`; anything unrecognised is reported as
//! [`ContractEvent::Unknown`] with its raw topics and data.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    providers::Provider,
    rpc::types::{Filter, Log},
    sol_types::SolEvent,
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::erc20::IMyERC20;
use super::units::{format_amount, ETH_DECIMALS};
use crate::error::ClientError;

/// Default block chunk size per `eth_getLogs` query.
pub const DEFAULT_CHUNK_SIZE: u64 = 2000;

/// A decoded token event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEvent {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
    Paused {
        account: Address,
    },
    Unpaused {
        account: Address,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    Unknown {
        topics: Vec<B256>,
        data: Bytes,
    },
}

impl ContractEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::Approval { .. } => "Approval",
            Self::Paused { .. } => "Paused",
            Self::Unpaused { .. } => "Unpaused",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::Unknown { .. } => "Unknown",
        }
    }
}

fn decode_as<E: SolEvent>(log: &Log) -> Result<E, ClientError> {
    log.log_decode::<E>()
        .map(|decoded| decoded.inner.data)
        .map_err(|e| ClientError::ContractError(format!("Failed to decode {}: {e}", E::SIGNATURE)))
}

/// Decode a log by its event signature.
///
/// A log without topics is an error; an unrecognised signature is not.
pub fn decode_event(log: &Log) -> Result<ContractEvent, ClientError> {
    let Some(signature) = log.topics().first().copied() else {
        return Err(ClientError::ContractError("Log has no topics".to_string()));
    };

    let event = if signature == IMyERC20::Transfer::SIGNATURE_HASH {
        let e = decode_as::<IMyERC20::Transfer>(log)?;
        ContractEvent::Transfer {
            from: e.from,
            to: e.to,
            value: e.value,
        }
    } else if signature == IMyERC20::Approval::SIGNATURE_HASH {
        let e = decode_as::<IMyERC20::Approval>(log)?;
        ContractEvent::Approval {
            owner: e.owner,
            spender: e.spender,
            value: e.value,
        }
    } else if signature == IMyERC20::Paused::SIGNATURE_HASH {
        ContractEvent::Paused {
            account: decode_as::<IMyERC20::Paused>(log)?.account,
        }
    } else if signature == IMyERC20::Unpaused::SIGNATURE_HASH {
        ContractEvent::Unpaused {
            account: decode_as::<IMyERC20::Unpaused>(log)?.account,
        }
    } else if signature == IMyERC20::OwnershipTransferred::SIGNATURE_HASH {
        let e = decode_as::<IMyERC20::OwnershipTransferred>(log)?;
        ContractEvent::OwnershipTransferred {
            previous_owner: e.previousOwner,
            new_owner: e.newOwner,
        }
    } else {
        ContractEvent::Unknown {
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        }
    };

    Ok(event)
}

/// Split `[from, to]` into inclusive ranges of at most `chunk_size` blocks.
pub fn block_chunks(from: u64, to: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(chunk_size - 1).min(to);
        chunks.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    chunks
}

/// Print a log with its decoded event.
pub fn print_log(log: &Log) {
    println!("\n📧 New event:");
    println!("   Block: #{}", log.block_number.unwrap_or_default());
    println!(
        "   Tx hash: {}",
        log.transaction_hash
            .map(|h| format!("{h:#x}"))
            .unwrap_or_default()
    );
    println!("   Contract: {}", log.address());
    println!("   Log index: {}", log.log_index.unwrap_or_default());

    match decode_event(log) {
        Ok(event) => {
            if let Some(signature) = log.topics().first() {
                println!("   Signature: {signature:#x}");
            }
            print_event(&event);
        }
        Err(e) => println!("   ⚠️ {e}"),
    }
}

/// Print a decoded event.
pub fn print_event(event: &ContractEvent) {
    match event {
        ContractEvent::Transfer { from, to, value } => {
            println!("   📤 Transfer:");
            println!("      From: {from}");
            println!("      To: {to}");
            println!("      Value: {value}");
            println!("      Value (tokens): {}", format_amount(*value, ETH_DECIMALS));
        }
        ContractEvent::Approval {
            owner,
            spender,
            value,
        } => {
            println!("   ✅ Approval:");
            println!("      Owner: {owner}");
            println!("      Spender: {spender}");
            println!("      Value: {value}");
        }
        ContractEvent::Paused { account } => {
            println!("   ⏸️ Paused by {account}");
        }
        ContractEvent::Unpaused { account } => {
            println!("   ▶️ Unpaused by {account}");
        }
        ContractEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        } => {
            println!("   👑 OwnershipTransferred:");
            println!("      Previous owner: {previous_owner}");
            println!("      New owner: {new_owner}");
        }
        ContractEvent::Unknown { topics, data } => {
            println!("   ❓ Unknown event:");
            println!("      Topics: {}", topics.len());
            for (i, topic) in topics.iter().enumerate() {
                println!("      Topic[{i}]: {topic:#x}");
            }
            println!("      Data length: {} bytes", data.len());
            if !data.is_empty() {
                println!("      Data: {data}");
            }
        }
    }
}

/// Watches all events of one contract.
pub struct EventWatcher<P> {
    provider: P,
    contract: Address,
    chunk_size: u64,
}

impl<P: Provider> EventWatcher<P> {
    pub fn new(provider: P, contract: Address) -> Self {
        Self {
            provider,
            contract,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Fetch past logs of the contract for `[from_block, to_block]`.
    pub async fn fetch_history(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>, ClientError> {
        let mut logs = Vec::new();

        for (from, to) in block_chunks(from_block, to_block, self.chunk_size) {
            let filter = Filter::new()
                .address(self.contract)
                .from_block(from)
                .to_block(to);

            let chunk = self
                .provider
                .get_logs(&filter)
                .await
                .map_err(|e| ClientError::rpc("eth_getLogs failed", e))?;

            if !chunk.is_empty() {
                tracing::debug!(from_block = from, to_block = to, events = chunk.len(), "Fetched contract logs");
            }
            logs.extend(chunk);
        }

        Ok(logs)
    }

    /// Deliver live logs to `on_log` until `shutdown` fires. A closed
    /// subscription is an error. Returns the number of logs delivered.
    pub async fn run<F>(&self, shutdown: CancellationToken, mut on_log: F) -> Result<u64, ClientError>
    where
        F: FnMut(&Log),
    {
        println!("🔍 Watching contract events: {}", self.contract);

        let filter = Filter::new().address(self.contract);
        let subscription = self
            .provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| ClientError::Subscription(format!("Failed to subscribe to logs: {e}")))?;
        let mut stream = subscription.into_stream();

        println!("✅ Subscribed, listening...");
        tracing::info!(contract = %self.contract, "Event watcher started");

        let mut seen = 0u64;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    println!("🛑 Event watcher stopped");
                    tracing::info!(events = seen, "Event watcher shutting down");
                    return Ok(seen);
                }
                log = stream.next() => {
                    let Some(log) = log else {
                        tracing::warn!("Log subscription closed");
                        return Err(ClientError::Subscription("Log stream closed".to_string()));
                    };
                    on_log(&log);
                    seen += 1;
                }
            }
        }
    }
}
