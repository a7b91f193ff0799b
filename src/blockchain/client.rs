// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only Ethereum client: blocks, transactions, receipts and balances.

use std::str::FromStr;

use alloy::{
    consensus::Transaction as ConsensusTx,
    eips::{eip2718::Typed2718 as _, BlockNumberOrTag},
    network::{Ethereum, TransactionResponse as _},
    primitives::{B256, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{Block, Transaction},
};

use super::erc20::{parse_address, CallEncoding, Erc20Contract};
use super::types::*;
use super::units::{format_amount, ETH_DECIMALS};
use super::waiter::ChainPoller;
use crate::error::ClientError;

/// HTTP provider type (with all fillers).
pub type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Parse an RPC endpoint URL.
pub fn parse_rpc_url(rpc_url: &str) -> Result<url::Url, ClientError> {
    rpc_url
        .parse()
        .map_err(|e: url::ParseError| ClientError::InvalidRpcUrl(format!("{rpc_url}: {e}")))
}

/// Parse a 32-byte transaction hash.
pub fn parse_tx_hash(raw: &str) -> Result<B256, ClientError> {
    B256::from_str(raw.trim()).map_err(|e| ClientError::InvalidHash(format!("{raw}: {e}")))
}

/// Ethereum JSON-RPC client over HTTP.
pub struct EthClient {
    provider: HttpProvider,
}

impl EthClient {
    /// Create a new client for the given HTTP endpoint.
    pub fn new(rpc_url: &str) -> Result<Self, ClientError> {
        let url = parse_rpc_url(rpc_url)?;
        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self { provider })
    }

    pub fn provider(&self) -> &HttpProvider {
        &self.provider
    }

    pub async fn chain_id(&self) -> Result<u64, ClientError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ClientError::rpc("Failed to get chain ID", e))
    }

    /// Get the current block number.
    pub async fn block_number(&self) -> Result<u64, ClientError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ClientError::rpc("Failed to get block number", e))
    }

    /// Latest block.
    pub async fn latest_block(&self) -> Result<BlockSummary, ClientError> {
        self.block(BlockNumberOrTag::Latest).await
    }

    /// Block by number.
    pub async fn block_by_number(&self, number: u64) -> Result<BlockSummary, ClientError> {
        self.block(BlockNumberOrTag::Number(number)).await
    }

    async fn block(&self, tag: BlockNumberOrTag) -> Result<BlockSummary, ClientError> {
        let block = self
            .provider
            .get_block_by_number(tag)
            .await
            .map_err(|e| ClientError::rpc("Failed to get block", e))?
            .ok_or_else(|| ClientError::NotFound(format!("block {tag}")))?;

        Ok(summarize_block(&block))
    }

    /// Transaction by hash. Pending transactions are returned with
    /// `pending = true` and no block number.
    pub async fn transaction(&self, tx_hash: &str) -> Result<TxInfo, ClientError> {
        let hash = parse_tx_hash(tx_hash)?;

        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .map_err(|e| ClientError::rpc("Failed to get transaction", e))?
            .ok_or_else(|| ClientError::NotFound(format!("transaction {tx_hash}")))?;

        let info = tx_info(&tx);
        if info.pending {
            tracing::info!(tx_hash = %info.hash, "Transaction is pending in mempool");
        }
        Ok(info)
    }

    /// Receipt by transaction hash.
    pub async fn receipt(&self, tx_hash: &str) -> Result<ReceiptSummary, ClientError> {
        let hash = parse_tx_hash(tx_hash)?;
        ChainPoller::receipt(&self.provider, hash)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("receipt for {tx_hash}")))
    }

    /// Get the native ETH balance for an address.
    pub async fn native_balance(&self, address: &str) -> Result<TokenBalance, ClientError> {
        let addr = parse_address("wallet", address)?;

        let balance = self
            .provider
            .get_balance(addr)
            .await
            .map_err(|e| ClientError::rpc("Failed to get balance", e))?;

        Ok(TokenBalance {
            symbol: "ETH".to_string(),
            name: "Ether".to_string(),
            balance_raw: balance.to_string(),
            balance_formatted: format_amount(balance, ETH_DECIMALS),
            decimals: ETH_DECIMALS,
            contract_address: None,
        })
    }

    /// Get the ERC-20 token balance for an address.
    pub async fn token_balance(
        &self,
        wallet_address: &str,
        token_address: &str,
        encoding: CallEncoding,
    ) -> Result<TokenBalance, ClientError> {
        let contract = Erc20Contract::new(&self.provider, token_address)?;
        contract.balance_of(wallet_address, encoding).await
    }

    /// Token name, symbol and decimals, plus owner and pause state.
    pub async fn token_info(&self, token_address: &str) -> Result<TokenInfo, ClientError> {
        let contract = Erc20Contract::new(&self.provider, token_address)?;
        Ok(contract.details().await)
    }

    /// Raw total supply and the token's decimals.
    pub async fn total_supply(&self, token_address: &str) -> Result<(U256, u8), ClientError> {
        let contract = Erc20Contract::new(&self.provider, token_address)?;
        let supply = contract.total_supply().await?;
        let decimals = contract.info().await.decimals;
        Ok((supply, decimals))
    }

    /// Chain id, network id and latest block.
    pub async fn node_info(&self) -> Result<NodeInfo, ClientError> {
        let chain_id = self.chain_id().await?;
        let network_id = self
            .provider
            .get_net_version()
            .await
            .map_err(|e| ClientError::rpc("Failed to get network ID", e))?;
        let latest_block = self.latest_block().await?;

        Ok(NodeInfo {
            chain_id,
            network: NetworkConfig::from_chain_id(chain_id).map(|n| n.name.to_string()),
            network_id,
            latest_block,
        })
    }
}

/// Extract the displayed fields from an RPC block.
pub fn summarize_block(block: &Block) -> BlockSummary {
    BlockSummary {
        number: block.header.number,
        hash: format!("{:#x}", block.header.hash),
        parent_hash: format!("{:#x}", block.header.parent_hash),
        timestamp: block.header.timestamp,
        tx_count: block.transactions.len(),
        gas_used: block.header.gas_used,
        gas_limit: block.header.gas_limit,
        base_fee_per_gas: block.header.base_fee_per_gas,
        miner: block.header.beneficiary.to_string(),
    }
}

/// Extract the displayed fields from an RPC transaction.
pub fn tx_info(tx: &Transaction) -> TxInfo {
    TxInfo {
        hash: format!("{:#x}", tx.tx_hash()),
        from: tx.from().to_string(),
        to: tx.to().map(|a| a.to_string()),
        value_wei: tx.value().to_string(),
        gas_limit: tx.gas_limit(),
        gas_price: ConsensusTx::gas_price(tx).or(tx.effective_gas_price),
        max_fee_per_gas: ConsensusTx::max_fee_per_gas(tx),
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas(),
        nonce: tx.nonce(),
        input: format!("0x{}", alloy::hex::encode(tx.input())),
        chain_id: tx.chain_id(),
        tx_type: tx.ty(),
        block_number: tx.block_number,
        pending: tx.block_number.is_none(),
    }
}
