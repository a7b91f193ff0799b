// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use serde::{Deserialize, Serialize};

/// Ethereum network metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Block explorer URL (empty for local chains)
    pub explorer_url: &'static str,
}

pub const MAINNET: NetworkConfig = NetworkConfig {
    name: "Ethereum Mainnet",
    chain_id: 1,
    explorer_url: "https://etherscan.io",
};

pub const SEPOLIA: NetworkConfig = NetworkConfig {
    name: "Sepolia Testnet",
    chain_id: 11_155_111,
    explorer_url: "https://sepolia.etherscan.io",
};

pub const HOLESKY: NetworkConfig = NetworkConfig {
    name: "Holesky Testnet",
    chain_id: 17_000,
    explorer_url: "https://holesky.etherscan.io",
};

/// Local development chain (geth --dev, anvil with chain id 1337).
pub const LOCALHOST: NetworkConfig = NetworkConfig {
    name: "Local Development Chain",
    chain_id: 1337,
    explorer_url: "",
};

const KNOWN_NETWORKS: [NetworkConfig; 4] = [MAINNET, SEPOLIA, HOLESKY, LOCALHOST];

impl NetworkConfig {
    /// Look up a known network by chain id.
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        KNOWN_NETWORKS.into_iter().find(|n| n.chain_id == chain_id)
    }

    /// Explorer link for a transaction, if the network has an explorer.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        if self.explorer_url.is_empty() {
            None
        } else {
            Some(format!("{}/tx/{}", self.explorer_url, tx_hash))
        }
    }
}

/// Summary of a block header plus its transaction count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u64,
    pub tx_count: usize,
    pub gas_used: u64,
    pub gas_limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<u64>,
    pub miner: String,
}

/// Transaction details as returned by `eth_getTransactionByHash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    pub hash: String,
    pub from: String,
    /// None for contract creation
    pub to: Option<String>,
    /// Value in wei (decimal string)
    pub value_wei: String,
    pub gas_limit: u64,
    /// Legacy gas price, or effective price once mined
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: Option<u128>,
    pub nonce: u64,
    /// Calldata, 0x-prefixed hex
    pub input: String,
    pub chain_id: Option<u64>,
    /// EIP-2718 type byte (0 legacy, 2 EIP-1559, ...)
    pub tx_type: u8,
    pub block_number: Option<u64>,
    /// True while the transaction sits in the mempool
    pub pending: bool,
}

/// Receipt summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    pub log_count: usize,
}

/// Outcome of waiting for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub tx_hash: String,
    pub success: bool,
    pub block_number: u64,
    pub gas_used: u64,
    /// Confirmations observed when the wait returned
    pub confirmations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

/// ERC-20 token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// `owner()`, for Ownable tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// `paused()`, for Pausable tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
}

/// Token balance information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Token symbol (e.g., "ETH", "MYT")
    pub symbol: String,
    /// Token name
    pub name: String,
    /// Balance in smallest unit (wei for native, token decimals for ERC-20)
    pub balance_raw: String,
    /// Balance formatted with decimals
    pub balance_formatted: String,
    /// Number of decimals
    pub decimals: u8,
    /// Contract address (None for native token)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

/// Basic facts about the connected node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub chain_id: u64,
    /// Name of the network, when the chain id is a known one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    pub network_id: u64,
    pub latest_block: BlockSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_chain_id() {
        assert_eq!(NetworkConfig::from_chain_id(1), Some(MAINNET));
        assert_eq!(NetworkConfig::from_chain_id(11_155_111), Some(SEPOLIA));
        assert_eq!(NetworkConfig::from_chain_id(999), None);
    }

    #[test]
    fn tx_url_requires_explorer() {
        assert_eq!(
            SEPOLIA.tx_url("0xabc").as_deref(),
            Some("https://sepolia.etherscan.io/tx/0xabc")
        );
        assert_eq!(LOCALHOST.tx_url("0xabc"), None);
    }

    #[test]
    fn receipt_serialization_skips_missing_contract() {
        let receipt = ReceiptSummary {
            tx_hash: "0x01".to_string(),
            block_number: 7,
            gas_used: 21_000,
            effective_gas_price: 1,
            success: true,
            contract_address: None,
            log_count: 0,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert!(json.get("contract_address").is_none());
        assert_eq!(json["gas_used"], 21_000);
    }
}
