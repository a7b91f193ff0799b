// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error type shared by every client operation.

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transaction hash: {0}")]
    InvalidHash(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Transaction {tx_hash} reverted in block {block_number}")]
    TransactionReverted { tx_hash: String, block_number: u64 },

    #[error("Timed out after {0:?} waiting for transaction")]
    Timeout(std::time::Duration),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Wrap any displayable SDK error as an RPC error.
    pub fn rpc(context: &str, err: impl std::fmt::Display) -> Self {
        Self::RpcError(format!("{context}: {err}"))
    }
}
