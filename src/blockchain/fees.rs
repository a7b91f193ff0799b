// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EIP-1559 fee calculation.
//!
//! The fee cap leaves room for the base fee to double before the
//! transaction stops being includable: `max_fee = 2 * base_fee + tip`.

use alloy::{eips::BlockNumberOrTag, providers::Provider};

use super::units::{format_gwei, GWEI};
use crate::error::ClientError;

/// Priority fee used when the node cannot suggest one.
pub const DEFAULT_TIP_CAP: u128 = 2 * GWEI;

/// Fee parameters for a dynamic-fee transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParams {
    pub base_fee: u128,
    pub tip_cap: u128,
    pub max_fee: u128,
}

impl FeeParams {
    /// Build from a base fee and tip, without any multiplier.
    pub fn new(base_fee: u128, tip_cap: u128) -> Self {
        Self {
            base_fee,
            tip_cap,
            max_fee: fee_cap(base_fee, tip_cap),
        }
    }

    /// Scale the fee cap by `multiplier`. The tip is left untouched.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.max_fee = apply_multiplier(self.max_fee, multiplier).max(self.tip_cap);
        self
    }

    /// Print the fee breakdown the way the tutorial shows it.
    pub fn print(&self) {
        println!("✓ Base fee: {} Gwei", format_gwei(self.base_fee));
        println!("✓ Tip cap: {} Gwei", format_gwei(self.tip_cap));
        println!("✓ Fee cap: {} Gwei", format_gwei(self.max_fee));
    }
}

/// `base_fee * 2 + tip`, saturating.
pub fn fee_cap(base_fee: u128, tip_cap: u128) -> u128 {
    base_fee.saturating_mul(2).saturating_add(tip_cap)
}

/// Multiply a wei amount by a float factor using per-mille integer math.
///
/// Non-positive or non-finite multipliers leave the value unchanged.
pub fn apply_multiplier(value: u128, multiplier: f64) -> u128 {
    if !multiplier.is_finite() || multiplier <= 0.0 {
        return value;
    }
    let per_mille = (multiplier * 1000.0).round() as u128;
    value.saturating_mul(per_mille) / 1000
}

/// Fetch the current base fee and suggested tip.
///
/// Returns `Ok(None)` when the latest block carries no base fee, meaning the
/// chain does not support EIP-1559 and a legacy transaction is needed.
pub async fn current_fees<P: Provider>(provider: &P) -> Result<Option<FeeParams>, ClientError> {
    let block = provider
        .get_block_by_number(BlockNumberOrTag::Latest)
        .await
        .map_err(|e| ClientError::rpc("Failed to get latest block", e))?
        .ok_or_else(|| ClientError::NotFound("latest block".to_string()))?;

    let Some(base_fee) = block.header.base_fee_per_gas else {
        tracing::warn!("Latest block has no base fee, EIP-1559 unavailable");
        return Ok(None);
    };

    let tip_cap = suggested_tip(provider).await;
    Ok(Some(FeeParams::new(base_fee as u128, tip_cap)))
}

/// `eth_maxPriorityFeePerGas`, falling back to [`DEFAULT_TIP_CAP`].
pub async fn suggested_tip<P: Provider>(provider: &P) -> u128 {
    match provider.get_max_priority_fee_per_gas().await {
        Ok(tip) => tip,
        Err(e) => {
            tracing::warn!(
                error = %e,
                default_gwei = %format_gwei(DEFAULT_TIP_CAP),
                "Could not get suggested tip, using default"
            );
            println!(
                "Warning: could not get suggested tip, using default: {} Gwei",
                format_gwei(DEFAULT_TIP_CAP)
            );
            DEFAULT_TIP_CAP
        }
    }
}

/// Legacy gas price: `eth_gasPrice` scaled by `multiplier`.
pub async fn legacy_gas_price<P: Provider>(
    provider: &P,
    multiplier: f64,
) -> Result<u128, ClientError> {
    let gas_price = provider
        .get_gas_price()
        .await
        .map_err(|e| ClientError::rpc("Failed to get gas price", e))?;
    Ok(apply_multiplier(gas_price, multiplier))
}
