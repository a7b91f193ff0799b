// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building and broadcasting.
//!
//! This module provides EIP-1559 transaction building with a legacy
//! fallback, gas estimation, and broadcasting for both native ETH and
//! ERC-20 transfers.

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, B256, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use serde::Serialize;

use super::client::parse_rpc_url;
use super::erc20::{encode_transfer_abi, parse_address, CallEncoding, Erc20Contract};
use super::fees::{current_fees, legacy_gas_price, FeeParams};
use super::types::{NetworkConfig, TxStatus};
use super::units::{format_amount, format_gwei, parse_amount, ETH_DECIMALS};
use super::waiter::{wait_for_transaction, WaitPolicy};
use super::wallet::ethereum_wallet;
use crate::error::ClientError;

/// Gas limit for a token transfer when estimation fails.
pub const DEFAULT_TOKEN_GAS_LIMIT: u64 = 60_000;

/// Safety margin added to estimated token transfer gas, in percent.
pub const TOKEN_GAS_BUFFER_PERCENT: u64 = 20;

/// Provider type with signing capabilities.
pub type SignerProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// Gas estimation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasEstimate {
    /// Estimated gas limit
    pub gas_limit: u64,
    /// Max fee per gas the send would use (legacy gas price when no base fee)
    pub max_fee_per_gas: u128,
    /// Max priority fee per gas (tip)
    pub max_priority_fee_per_gas: u128,
    /// Upper bound of the cost in wei (decimal string)
    pub estimated_cost_wei: String,
    /// Same bound in ether
    pub estimated_cost_eth: String,
}

impl GasEstimate {
    /// Price `gas_limit` at the given fees.
    pub fn new(gas_limit: u64, fees: FeeParams) -> Self {
        let cost = U256::from(gas_limit) * U256::from(fees.max_fee);
        Self {
            gas_limit,
            max_fee_per_gas: fees.max_fee,
            max_priority_fee_per_gas: fees.tip_cap,
            estimated_cost_wei: cost.to_string(),
            estimated_cost_eth: format_amount(cost, ETH_DECIMALS),
        }
    }
}

/// Which transaction envelope was broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Eip1559,
    Legacy,
}

impl TxKind {
    /// EIP-2718 type byte.
    pub fn type_byte(self) -> u8 {
        match self {
            Self::Eip1559 => 2,
            Self::Legacy => 0,
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eip1559 => write!(f, "{} (EIP-1559)", self.type_byte()),
            Self::Legacy => write!(f, "{} (Legacy)", self.type_byte()),
        }
    }
}

/// Transaction send result.
#[derive(Debug, Clone)]
pub struct SendResult {
    /// Transaction hash
    pub tx_hash: B256,
    pub kind: TxKind,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Explorer URL for the transaction, when the network has one
    pub explorer_url: Option<String>,
}

/// Knobs taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    /// Multiplier on the ETH transfer fee cap and legacy gas price
    pub gas_price_multiplier: f64,
    /// Gas limit for ETH transfers when estimation fails
    pub default_gas_limit: u64,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            gas_price_multiplier: crate::config::DEFAULT_GAS_PRICE_MULTIPLIER,
            default_gas_limit: crate::config::DEFAULT_GAS_LIMIT,
        }
    }
}

/// Add `percent` to a gas amount.
pub fn with_buffer(gas: u64, percent: u64) -> u64 {
    gas.saturating_add(gas.saturating_mul(percent) / 100)
}

/// Signs and broadcasts transactions from one account.
pub struct TxSender {
    provider: SignerProvider,
    from: Address,
    options: SendOptions,
}

impl TxSender {
    /// Create a new transaction sender with signing capabilities.
    pub fn new(
        rpc_url: &str,
        signer: PrivateKeySigner,
        options: SendOptions,
    ) -> Result<Self, ClientError> {
        let url = parse_rpc_url(rpc_url)?;
        let from = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(ethereum_wallet(signer))
            .connect_http(url);

        Ok(Self {
            provider,
            from,
            options,
        })
    }

    /// Address of the signing account.
    pub fn address(&self) -> Address {
        self.from
    }

    pub fn provider(&self) -> &SignerProvider {
        &self.provider
    }

    pub async fn chain_id(&self) -> Result<u64, ClientError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ClientError::rpc("Failed to get chain ID", e))
    }

    pub async fn pending_nonce(&self) -> Result<u64, ClientError> {
        self.provider
            .get_transaction_count(self.from)
            .pending()
            .await
            .map_err(|e| ClientError::rpc("Failed to get nonce", e))
    }

    /// `eth_estimateGas`, or `fallback` with a warning when the node refuses.
    pub async fn estimate_gas_or(&self, tx: &TransactionRequest, fallback: u64) -> u64 {
        match self.provider.estimate_gas(tx.clone()).await {
            Ok(gas) => gas,
            Err(e) => {
                tracing::warn!(error = %e, fallback, "Gas estimation failed, using default");
                println!("Warning: gas estimation failed, using default: {fallback}");
                fallback
            }
        }
    }

    /// Estimate gas and fees for a native ETH transfer, priced the way
    /// [`Self::transfer_eth`] sends it.
    pub async fn estimate_eth_transfer(
        &self,
        to: &str,
        amount: &str,
    ) -> Result<GasEstimate, ClientError> {
        let to_addr = parse_address("recipient", to)?;
        let value = parse_amount(amount, ETH_DECIMALS)?;

        let tx = TransactionRequest::default()
            .from(self.from)
            .to(to_addr)
            .value(value);

        let gas_limit = self
            .provider
            .estimate_gas(tx)
            .await
            .map_err(|e| ClientError::rpc("Gas estimation failed", e))?;
        self.price_gas(gas_limit, self.options.gas_price_multiplier)
            .await
    }

    /// Estimate gas and fees for an ERC-20 transfer of a decimal token
    /// amount, including the safety buffer [`Self::transfer_token`] adds.
    pub async fn estimate_token_transfer(
        &self,
        token_address: &str,
        to: &str,
        amount: &str,
    ) -> Result<GasEstimate, ClientError> {
        let to_addr = parse_address("recipient", to)?;
        let token = Erc20Contract::new(&self.provider, token_address)?;
        let decimals = token.info().await.decimals;
        let units = parse_amount(amount, decimals)?;

        let tx = TransactionRequest::default()
            .from(self.from)
            .to(token.address())
            .input(encode_transfer_abi(to_addr, units).into());

        let gas = self
            .provider
            .estimate_gas(tx)
            .await
            .map_err(|e| ClientError::rpc("Gas estimation failed", e))?;
        self.price_gas(with_buffer(gas, TOKEN_GAS_BUFFER_PERCENT), 1.0)
            .await
    }

    /// Price a gas limit at current fees scaled by `multiplier`, the same
    /// scaling [`Self::send_with_fallback`] applies.
    async fn price_gas(&self, gas_limit: u64, multiplier: f64) -> Result<GasEstimate, ClientError> {
        let fees = match current_fees(&self.provider).await? {
            Some(fees) => fees.with_multiplier(multiplier),
            None => {
                let gas_price = legacy_gas_price(&self.provider, multiplier).await?;
                FeeParams {
                    base_fee: gas_price,
                    tip_cap: 0,
                    max_fee: gas_price,
                }
            }
        };

        Ok(GasEstimate::new(gas_limit, fees))
    }

    /// Send ETH. `amount` is a decimal ether string such as `"0.001"`.
    ///
    /// Builds an EIP-1559 transaction; if the chain has no base fee or the
    /// dynamic-fee send fails, the same nonce and gas limit are retried as a
    /// legacy transaction.
    pub async fn transfer_eth(&self, to: &str, amount: &str) -> Result<SendResult, ClientError> {
        println!("\n=== ETH transfer ===");
        let to_addr = parse_address("recipient", to)?;
        let value = parse_amount(amount, ETH_DECIMALS)?;

        println!("✓ From: {}", self.from);
        println!("✓ To: {to_addr}");

        let chain_id = self.chain_id().await?;
        println!("✓ Chain ID: {chain_id}");

        let nonce = self.pending_nonce().await?;
        println!("✓ Nonce: {nonce}");
        println!("✓ Amount: {} ETH ({value} wei)", format_amount(value, ETH_DECIMALS));

        let request = TransactionRequest::default()
            .from(self.from)
            .to(to_addr)
            .value(value);
        let gas_limit = self
            .estimate_gas_or(&request, self.options.default_gas_limit)
            .await;
        println!("✓ Gas limit: {gas_limit}");

        let base = request.nonce(nonce).gas_limit(gas_limit);
        self.send_with_fallback(base, chain_id, self.options.gas_price_multiplier)
            .await
    }

    /// Send an ERC-20 transfer. `amount` is a decimal token amount, scaled by
    /// the token's `decimals()`.
    pub async fn transfer_token(
        &self,
        token_address: &str,
        to: &str,
        amount: &str,
        encoding: CallEncoding,
    ) -> Result<(SendResult, U256), ClientError> {
        println!("\n=== ERC-20 transfer ({encoding:?} encoding) ===");
        let to_addr = parse_address("recipient", to)?;
        let token = Erc20Contract::new(&self.provider, token_address)?;

        println!("✓ From: {}", self.from);
        println!("✓ To: {to_addr}");
        println!("✓ Token: {}", token.address());

        let info = token.info().await;
        let units = parse_amount(amount, info.decimals)?;
        println!("✓ Decimals: {}", info.decimals);
        println!("✓ Amount: {units} ({amount} {})", info.symbol);

        let data = encoding.encode_transfer(to_addr, units);
        println!("✓ Calldata: 0x{}", alloy::hex::encode(&data));

        let nonce = self.pending_nonce().await?;
        println!("✓ Nonce: {nonce}");

        let chain_id = self.chain_id().await?;
        println!("✓ Chain ID: {chain_id}");

        let request = TransactionRequest::default()
            .from(self.from)
            .to(token.address())
            .value(U256::ZERO)
            .input(data.into());

        let gas_limit = match self.provider.estimate_gas(request.clone()).await {
            Ok(gas) => with_buffer(gas, TOKEN_GAS_BUFFER_PERCENT),
            Err(e) => {
                tracing::warn!(error = %e, "Token transfer gas estimation failed");
                println!("Warning: gas estimation failed, using default: {DEFAULT_TOKEN_GAS_LIMIT}");
                DEFAULT_TOKEN_GAS_LIMIT
            }
        };
        println!("✓ Gas limit: {gas_limit}");

        let base = request.nonce(nonce).gas_limit(gas_limit);
        // Token transfers use the plain fee cap, without the configured multiplier.
        let sent = self.send_with_fallback(base, chain_id, 1.0).await?;
        Ok((sent, units))
    }

    /// Wait for a token transfer and explain a revert: insufficient balance
    /// or a paused contract. Prints both balances after success.
    pub async fn confirm_token_transfer(
        &self,
        token_address: &str,
        to: &str,
        sent: &SendResult,
        units: U256,
    ) -> Result<TxStatus, ClientError> {
        let to_addr = parse_address("recipient", to)?;
        let token = Erc20Contract::new(&self.provider, token_address)?;

        println!("\n--- Waiting for transfer confirmation ---");
        match wait_for_transaction(&self.provider, sent.tx_hash, WaitPolicy::QUICK).await {
            Ok(status) => {
                println!("✅ Transfer confirmed in block #{}", status.block_number);
                println!("\n--- Balances after transfer ---");
                if let Ok(balance) = token.balance_of_raw(self.from).await {
                    println!("✓ Sender balance: {balance}");
                }
                if let Ok(balance) = token.balance_of_raw(to_addr).await {
                    println!("✓ Recipient balance: {balance}");
                }
                Ok(status)
            }
            Err(err @ ClientError::TransactionReverted { .. }) => {
                println!("❌ Transfer reverted: {:#x}", sent.tx_hash);
                println!("\n--- Failure diagnostics ---");
                if let Ok(balance) = token.balance_of_raw(self.from).await {
                    println!("Sender token balance: {balance}");
                    if balance < units {
                        println!("❌ Insufficient balance: need {units}, have {balance}");
                    } else {
                        println!("✓ Balance sufficient: {balance} >= {units}");
                    }
                }
                match token.paused().await {
                    Ok(true) => println!("❌ Token contract is paused"),
                    Ok(false) => println!("✓ Token contract is not paused"),
                    Err(e) => tracing::debug!(error = %e, "paused() not available"),
                }
                Err(err)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait for any transaction sent by this account.
    pub async fn wait(&self, tx_hash: B256, policy: WaitPolicy) -> Result<TxStatus, ClientError> {
        wait_for_transaction(&self.provider, tx_hash, policy).await
    }

    /// Try EIP-1559, fall back to legacy on failure.
    pub(crate) async fn send_with_fallback(
        &self,
        mut base: TransactionRequest,
        chain_id: u64,
        multiplier: f64,
    ) -> Result<SendResult, ClientError> {
        // A preset chain id keeps the filler stack from querying it again.
        base.chain_id = Some(chain_id);

        match current_fees(&self.provider).await? {
            Some(fees) => {
                println!("\n=== EIP-1559 dynamic fee transaction ===");
                let fees = fees.with_multiplier(multiplier);
                fees.print();

                let tx = base
                    .clone()
                    .max_fee_per_gas(fees.max_fee)
                    .max_priority_fee_per_gas(fees.tip_cap);

                match self.send(tx, TxKind::Eip1559, chain_id).await {
                    Ok(sent) => return Ok(sent),
                    Err(e) => {
                        tracing::warn!(error = %e, "EIP-1559 send failed, retrying as legacy");
                        println!("EIP-1559 transaction failed: {e}");
                        println!("Retrying as a legacy transaction...");
                    }
                }
            }
            None => println!("Chain reports no base fee, using a legacy transaction"),
        }

        println!("\n=== Legacy transaction ===");
        let gas_price = legacy_gas_price(&self.provider, multiplier).await?;
        println!("✓ Gas price: {} Gwei", format_gwei(gas_price));

        let tx = base.gas_price(gas_price);
        self.send(tx, TxKind::Legacy, chain_id)
            .await
            .map_err(|e| ClientError::TransactionFailed(format!("Legacy send failed: {e}")))
    }

    /// Sign with the wallet filler and broadcast.
    async fn send(
        &self,
        tx: TransactionRequest,
        kind: TxKind,
        chain_id: u64,
    ) -> Result<SendResult, ClientError> {
        let nonce = tx.nonce.unwrap_or_default();
        let gas_limit = tx.gas.unwrap_or_default();

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ClientError::TransactionFailed(format!("Failed to send: {e}")))?;

        let tx_hash = *pending.tx_hash();
        let hash_str = format!("{tx_hash:#x}");
        let explorer_url = NetworkConfig::from_chain_id(chain_id).and_then(|n| n.tx_url(&hash_str));

        tracing::info!(tx_hash = %hash_str, kind = %kind, nonce, "Transaction broadcast");
        println!("✅ Transaction sent!");
        println!("   Type: {kind}");
        println!("   Hash: {hash_str}");
        if let Some(url) = &explorer_url {
            println!("   Explorer: {url}");
        }

        Ok(SendResult {
            tx_hash,
            kind,
            nonce,
            gas_limit,
            explorer_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::fees::tests::latest_block_json;
    use crate::blockchain::fees::DEFAULT_TIP_CAP;
    use crate::blockchain::units::GWEI;
    use crate::blockchain::wallet::signer_from_hex;
    use alloy::providers::mock::Asserter;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Sender whose RPC responses come from `asserter`, in order.
    fn mocked_sender(asserter: &Asserter) -> TxSender {
        let signer = signer_from_hex(DEV_KEY).unwrap();
        let from = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(ethereum_wallet(signer))
            .connect_mocked_client(asserter.clone());
        TxSender {
            provider,
            from,
            options: SendOptions::default(),
        }
    }

    fn transfer_request(sender: &TxSender) -> TransactionRequest {
        TransactionRequest::default()
            .from(sender.address())
            .to(Address::repeat_byte(0x22))
            .value(U256::from(1_000u64))
            .nonce(7)
            .gas_limit(21_000)
    }

    #[test]
    fn buffer_adds_percentage() {
        assert_eq!(with_buffer(50_000, 20), 60_000);
        assert_eq!(with_buffer(0, 20), 0);
        assert_eq!(with_buffer(u64::MAX, 20), u64::MAX);
    }

    #[test]
    fn tx_kind_display() {
        assert_eq!(TxKind::Eip1559.to_string(), "2 (EIP-1559)");
        assert_eq!(TxKind::Legacy.to_string(), "0 (Legacy)");
    }

    #[test]
    fn sender_exposes_signer_address() {
        let signer = signer_from_hex(DEV_KEY).unwrap();
        let expected = signer.address();
        let sender = TxSender::new("http://localhost:8545", signer, SendOptions::default()).unwrap();
        assert_eq!(sender.address(), expected);
        assert_eq!(sender.options.default_gas_limit, 21_000);
    }

    #[tokio::test]
    async fn invalid_inputs_fail_before_any_rpc() {
        let signer = signer_from_hex(DEV_KEY).unwrap();
        let sender = TxSender::new("http://localhost:1", signer, SendOptions::default()).unwrap();

        assert!(matches!(
            sender.transfer_eth("0x1234", "1").await,
            Err(ClientError::InvalidAddress(_))
        ));
        assert!(matches!(
            sender
                .transfer_eth("0x5425890298aed601595a70AB815c96711a31Bc65", "1.2.3")
                .await,
            Err(ClientError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn chain_without_base_fee_sends_legacy() {
        let asserter = Asserter::new();
        let sender = mocked_sender(&asserter);
        asserter.push_success(&latest_block_json(None));
        asserter.push_success(&format!("{GWEI:#x}"));
        asserter.push_success(&B256::repeat_byte(0xab));

        let sent = sender
            .send_with_fallback(transfer_request(&sender), 1337, 1.0)
            .await
            .unwrap();

        assert_eq!(sent.kind, TxKind::Legacy);
        assert_eq!(sent.nonce, 7);
        assert_eq!(sent.gas_limit, 21_000);
        assert_eq!(sent.tx_hash, B256::repeat_byte(0xab));
        assert!(sent.explorer_url.is_none());
        assert!(asserter.read_q().is_empty());
    }

    #[tokio::test]
    async fn rejected_dynamic_fee_send_is_retried_as_legacy() {
        let asserter = Asserter::new();
        let sender = mocked_sender(&asserter);
        asserter.push_success(&latest_block_json(Some(GWEI)));
        asserter.push_failure_msg("eth_maxPriorityFeePerGas not supported");
        asserter.push_failure_msg("transaction type not supported");
        asserter.push_success(&format!("{GWEI:#x}"));
        asserter.push_success(&B256::repeat_byte(0xcd));

        let sent = sender
            .send_with_fallback(transfer_request(&sender), 11_155_111, 1.1)
            .await
            .unwrap();

        assert_eq!(sent.kind, TxKind::Legacy);
        assert_eq!(sent.nonce, 7);
        assert_eq!(sent.gas_limit, 21_000);
        assert_eq!(sent.tx_hash, B256::repeat_byte(0xcd));
        assert!(sent
            .explorer_url
            .as_deref()
            .is_some_and(|url| url.starts_with("https://sepolia.etherscan.io/tx/0xcdcd")));
        assert!(asserter.read_q().is_empty());
    }

    #[tokio::test]
    async fn dynamic_fee_send_succeeds_with_default_tip() {
        let asserter = Asserter::new();
        let sender = mocked_sender(&asserter);
        asserter.push_success(&latest_block_json(Some(GWEI)));
        asserter.push_failure_msg("eth_maxPriorityFeePerGas not supported");
        asserter.push_success(&B256::repeat_byte(0xef));

        let sent = sender
            .send_with_fallback(transfer_request(&sender), 1, 1.0)
            .await
            .unwrap();

        assert_eq!(sent.kind, TxKind::Eip1559);
        assert_eq!(sent.nonce, 7);
        assert!(asserter.read_q().is_empty());
    }

    #[tokio::test]
    async fn failed_legacy_retry_is_reported() {
        let asserter = Asserter::new();
        let sender = mocked_sender(&asserter);
        asserter.push_success(&latest_block_json(None));
        asserter.push_success(&format!("{GWEI:#x}"));
        asserter.push_failure_msg("insufficient funds for gas * price + value");

        let err = sender
            .send_with_fallback(transfer_request(&sender), 1337, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TransactionFailed(ref m) if m.contains("Legacy")));
    }

    #[tokio::test]
    async fn eth_estimate_applies_fee_multiplier() {
        let asserter = Asserter::new();
        let sender = mocked_sender(&asserter);
        asserter.push_success(&"0x5208");
        asserter.push_success(&latest_block_json(Some(10 * GWEI)));
        asserter.push_failure_msg("eth_maxPriorityFeePerGas not supported");

        let estimate = sender
            .estimate_eth_transfer("0x5425890298aed601595a70AB815c96711a31Bc65", "0.001")
            .await
            .unwrap();

        // (2 * 10 + 2) Gwei scaled by the default 1.1 multiplier.
        let max_fee = 24_200_000_000u128;
        assert_eq!(estimate.gas_limit, 21_000);
        assert_eq!(estimate.max_priority_fee_per_gas, DEFAULT_TIP_CAP);
        assert_eq!(estimate.max_fee_per_gas, max_fee);
        assert_eq!(estimate.estimated_cost_wei, (21_000 * max_fee).to_string());
        assert_eq!(estimate.estimated_cost_eth, "0.0005082");
    }

    #[test]
    fn estimate_serializes_for_json_output() {
        let estimate = GasEstimate::new(21_000, FeeParams::new(GWEI, GWEI));
        let json = serde_json::to_value(&estimate).unwrap();
        assert_eq!(json["gas_limit"], 21_000);
        assert_eq!(json["estimated_cost_wei"], "63000000000000");
        assert_eq!(json["estimated_cost_eth"], "0.000063");
    }
}
