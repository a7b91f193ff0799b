// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transaction Confirmation Waiter
//!
//! Polls for a receipt on a fixed interval until the transaction is mined,
//! then keeps polling the chain head until the requested number of
//! confirmations is reached.
//!
//! ## Timeouts
//!
//! - No receipt before the deadline: [`ClientError::Timeout`].
//! - Receipt present but extra confirmations still missing at the deadline:
//!   the successful status is returned with a warning, because the
//!   transaction has already executed.

use std::future::Future;
use std::time::Duration;

use alloy::{primitives::B256, providers::Provider};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::types::{ReceiptSummary, TxStatus};
use crate::error::ClientError;

/// Interval between polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Cap for timeouts too large to add to the current instant.
const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// How many confirmations to wait for and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub confirmations: u64,
    pub timeout: Duration,
}

impl WaitPolicy {
    /// One confirmation, three minutes.
    pub const QUICK: Self = Self {
        confirmations: 1,
        timeout: Duration::from_secs(3 * 60),
    };

    /// Three confirmations, ten minutes.
    pub const SAFE: Self = Self {
        confirmations: 3,
        timeout: Duration::from_secs(10 * 60),
    };

    /// Two confirmations, eight minutes. Used for contract deployment.
    pub const DEPLOY: Self = Self {
        confirmations: 2,
        timeout: Duration::from_secs(8 * 60),
    };
}

/// Chain queries the waiter needs.
pub trait ChainPoller {
    fn receipt(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = Result<Option<ReceiptSummary>, ClientError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, ClientError>> + Send;
}

impl<P: Provider + Sync> ChainPoller for P {
    async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptSummary>, ClientError> {
        let receipt = self
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ClientError::rpc("Failed to get receipt", e))?;

        Ok(receipt.map(|r| ReceiptSummary {
            tx_hash: format!("{tx_hash:#x}"),
            block_number: r.block_number.unwrap_or(0),
            gas_used: r.gas_used as u64,
            effective_gas_price: r.effective_gas_price,
            success: r.status(),
            contract_address: r.contract_address.map(|a| a.to_string()),
            log_count: r.inner.logs().len(),
        }))
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        self.get_block_number()
            .await
            .map_err(|e| ClientError::rpc("Failed to get block number", e))
    }
}

/// Wait for `tx_hash` according to `policy`.
pub async fn wait_for_transaction<C: ChainPoller>(
    chain: &C,
    tx_hash: B256,
    policy: WaitPolicy,
) -> Result<TxStatus, ClientError> {
    wait_with_interval(chain, tx_hash, policy, POLL_INTERVAL).await
}

/// [`wait_for_transaction`] with an explicit poll interval.
pub async fn wait_with_interval<C: ChainPoller>(
    chain: &C,
    tx_hash: B256,
    policy: WaitPolicy,
    poll_interval: Duration,
) -> Result<TxStatus, ClientError> {
    let hash_str = format!("{tx_hash:#x}");
    println!("⏳ Waiting for transaction: {hash_str}");
    println!(
        "   Confirmations: {}, timeout: {:?}",
        policy.confirmations, policy.timeout
    );

    let deadline = Instant::now()
        .checked_add(policy.timeout)
        .unwrap_or_else(|| Instant::now() + MAX_TIMEOUT);
    let mut ticker = interval_at(Instant::now() + poll_interval, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Phase 1: wait for the receipt.
    let receipt = loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                return Err(ClientError::Timeout(policy.timeout));
            }
            _ = ticker.tick() => {
                match chain.receipt(tx_hash).await {
                    Ok(Some(receipt)) => break receipt,
                    Ok(None) => tracing::debug!(tx_hash = %hash_str, "Receipt not yet available"),
                    Err(e) => tracing::debug!(tx_hash = %hash_str, error = %e, "Receipt poll failed"),
                }
            }
        }
    };

    println!("✓ Included in block #{}", receipt.block_number);

    let mut status = TxStatus {
        tx_hash: hash_str.clone(),
        success: receipt.success,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        confirmations: 1,
        contract_address: receipt.contract_address,
    };

    if !status.success {
        tracing::warn!(tx_hash = %hash_str, block = status.block_number, "Transaction reverted");
        return Err(ClientError::TransactionReverted {
            tx_hash: hash_str,
            block_number: status.block_number,
        });
    }

    println!("✓ Execution succeeded, gas used: {}", status.gas_used);

    if policy.confirmations <= 1 {
        return Ok(status);
    }

    // Phase 2: wait for additional confirmations.
    println!(
        "⏳ Waiting for {} more confirmation(s)...",
        policy.confirmations - 1
    );
    let target_block = status.block_number.saturating_add(policy.confirmations - 1);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                tracing::warn!(
                    tx_hash = %hash_str,
                    confirmations = status.confirmations,
                    wanted = policy.confirmations,
                    "Timed out waiting for extra confirmations, transaction already succeeded"
                );
                println!("⚠️ Timed out waiting for extra confirmations, but the transaction succeeded");
                return Ok(status);
            }
            _ = ticker.tick() => {
                let current = match chain.block_number().await {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to get current block number");
                        continue;
                    }
                };

                status.confirmations = current.saturating_sub(status.block_number) + 1;

                if current >= target_block {
                    println!(
                        "✅ {} confirmations reached (current block: #{current})",
                        policy.confirmations
                    );
                    return Ok(status);
                }

                println!(
                    "   Progress: {}/{} (current block: #{current})",
                    status.confirmations, policy.confirmations
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// Scripted chain: the receipt appears after `receipt_after` polls and the
    /// head advances by one block per `block_number` call.
    struct FakeChain {
        receipt_after: Option<u64>,
        success: bool,
        mined_in: u64,
        receipt_polls: AtomicU64,
        head: AtomicU64,
        head_errors: Mutex<u32>,
    }

    impl FakeChain {
        fn new(receipt_after: Option<u64>, success: bool) -> Self {
            Self {
                receipt_after,
                success,
                mined_in: 100,
                receipt_polls: AtomicU64::new(0),
                head: AtomicU64::new(100),
                head_errors: Mutex::new(0),
            }
        }
    }

    impl ChainPoller for FakeChain {
        async fn receipt(&self, tx_hash: B256) -> Result<Option<ReceiptSummary>, ClientError> {
            let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.receipt_after {
                Some(after) if polls >= after => Ok(Some(ReceiptSummary {
                    tx_hash: format!("{tx_hash:#x}"),
                    block_number: self.mined_in,
                    gas_used: 21_000,
                    effective_gas_price: 1,
                    success: self.success,
                    contract_address: None,
                    log_count: 0,
                })),
                _ => Ok(None),
            }
        }

        async fn block_number(&self) -> Result<u64, ClientError> {
            {
                let mut errors = self.head_errors.lock().unwrap();
                if *errors > 0 {
                    *errors -= 1;
                    return Err(ClientError::RpcError("flaky".to_string()));
                }
            }
            Ok(self.head.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_after_receipt_with_one_confirmation() {
        let chain = FakeChain::new(Some(3), true);
        let status = wait_for_transaction(&chain, B256::ZERO, WaitPolicy::QUICK)
            .await
            .unwrap();

        assert!(status.success);
        assert_eq!(status.block_number, 100);
        assert_eq!(status.gas_used, 21_000);
        assert_eq!(status.confirmations, 1);
        assert_eq!(chain.receipt_polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_without_receipt() {
        let chain = FakeChain::new(None, true);
        let policy = WaitPolicy {
            confirmations: 1,
            timeout: Duration::from_secs(10),
        };
        let err = wait_for_transaction(&chain, B256::ZERO, policy)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout(d) if d == Duration::from_secs(10)));
        // Polls at 3s, 6s and 9s before the 10s deadline.
        assert_eq!(chain.receipt_polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_is_an_error() {
        let chain = FakeChain::new(Some(1), false);
        let err = wait_for_transaction(&chain, B256::ZERO, WaitPolicy::QUICK)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::TransactionReverted { block_number: 100, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_extra_confirmations() {
        let chain = FakeChain::new(Some(1), true);
        *chain.head_errors.lock().unwrap() = 1;

        let status = wait_for_transaction(&chain, B256::ZERO, WaitPolicy::SAFE)
            .await
            .unwrap();

        // Mined in 100, target head is 102.
        assert_eq!(status.confirmations, 3);
        assert!(chain.head.load(Ordering::SeqCst) >= 102);
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_timeout_still_returns_success() {
        let chain = FakeChain::new(Some(1), true);
        let policy = WaitPolicy {
            confirmations: 50,
            timeout: Duration::from_secs(20),
        };

        let status = wait_for_transaction(&chain, B256::ZERO, policy)
            .await
            .unwrap();

        assert!(status.success);
        assert!(status.confirmations < 50);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_confirmation_count_does_not_overflow() {
        let chain = FakeChain::new(Some(1), true);
        let policy = WaitPolicy {
            confirmations: u64::MAX,
            timeout: Duration::from_secs(30),
        };

        let status = wait_for_transaction(&chain, B256::ZERO, policy)
            .await
            .unwrap();

        assert!(status.success);
        assert_eq!(status.block_number, 100);
        assert!(status.confirmations < 20);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_timeout_does_not_overflow() {
        let chain = FakeChain::new(Some(2), true);
        let policy = WaitPolicy {
            confirmations: 1,
            timeout: Duration::MAX,
        };

        let status = wait_for_transaction(&chain, B256::ZERO, policy)
            .await
            .unwrap();
        assert_eq!(status.confirmations, 1);
    }

    #[test]
    fn presets_match_documented_values() {
        assert_eq!(WaitPolicy::QUICK.confirmations, 1);
        assert_eq!(WaitPolicy::QUICK.timeout, Duration::from_secs(180));
        assert_eq!(WaitPolicy::SAFE.confirmations, 3);
        assert_eq!(WaitPolicy::SAFE.timeout, Duration::from_secs(600));
        assert_eq!(WaitPolicy::DEPLOY.confirmations, 2);
        assert_eq!(WaitPolicy::DEPLOY.timeout, Duration::from_secs(480));
    }
}
