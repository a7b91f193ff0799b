// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! New-block subscription over WebSocket.

use alloy::{
    eips::BlockNumberOrTag,
    providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::client::summarize_block;
use super::types::BlockSummary;
use crate::error::ClientError;

/// Connect to a WebSocket endpoint.
pub async fn connect_ws(ws_url: &str) -> Result<DynProvider, ClientError> {
    if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
        return Err(ClientError::InvalidRpcUrl(format!(
            "{ws_url}: expected a ws:// or wss:// URL"
        )));
    }

    let provider = ProviderBuilder::new()
        .connect_ws(WsConnect::new(ws_url))
        .await
        .map_err(|e| ClientError::rpc("WebSocket connection failed", e))?;

    Ok(provider.erased())
}

/// Print a block the way the subscriber reports it.
pub fn print_block(block: &BlockSummary) {
    println!("📦 New block: #{}, hash: {}", block.number, block.hash);
    println!("   Transactions: {}", block.tx_count);
    println!("   Timestamp: {}", block.timestamp);
}

/// Streams new block headers and resolves each to its full block.
pub struct BlockSubscriber {
    provider: DynProvider,
}

impl BlockSubscriber {
    pub async fn connect(ws_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            provider: connect_ws(ws_url).await?,
        })
    }

    /// Wait for the next block and return it.
    pub async fn first_block(&self) -> Result<BlockSummary, ClientError> {
        let mut first = None;
        self.watch(Some(1), CancellationToken::new(), |block| {
            first = Some(block.clone());
        })
        .await?;

        first.ok_or_else(|| ClientError::Subscription("No block received".to_string()))
    }

    /// Deliver new blocks to `on_block` until `limit` blocks were seen (or
    /// forever when `None`) or `shutdown` fires. Returns the number of
    /// blocks delivered.
    pub async fn watch<F>(
        &self,
        limit: Option<u64>,
        shutdown: CancellationToken,
        mut on_block: F,
    ) -> Result<u64, ClientError>
    where
        F: FnMut(&BlockSummary),
    {
        let subscription = self
            .provider
            .subscribe_blocks()
            .await
            .map_err(|e| ClientError::Subscription(format!("Failed to subscribe to new blocks: {e}")))?;
        let mut stream = subscription.into_stream();

        println!("🔔 Listening for new blocks...");
        tracing::info!(limit = ?limit, "Block subscription started");

        let mut seen = 0u64;
        loop {
            if limit.is_some_and(|n| seen >= n) {
                return Ok(seen);
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(blocks = seen, "Block subscription stopped");
                    return Ok(seen);
                }
                header = stream.next() => {
                    let Some(header) = header else {
                        return Err(ClientError::Subscription("Block stream closed".to_string()));
                    };

                    let block = self
                        .provider
                        .get_block_by_number(BlockNumberOrTag::Number(header.number))
                        .await
                        .map_err(|e| ClientError::rpc("Failed to retrieve block", e))?
                        .ok_or_else(|| ClientError::NotFound(format!("block {}", header.number)))?;

                    let summary = summarize_block(&block);
                    tracing::debug!(number = summary.number, hash = %summary.hash, "New block");
                    on_block(&summary);
                    seen += 1;
                }
            }
        }
    }
}
