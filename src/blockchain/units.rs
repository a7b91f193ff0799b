// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversions between human-readable amounts and base units.

use alloy::primitives::U256;

use crate::error::ClientError;

/// Decimals of ether.
pub const ETH_DECIMALS: u8 = 18;

/// 1 gwei in wei.
pub const GWEI: u128 = 1_000_000_000;

/// Parse a human-readable amount to wei (or token units).
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for ETH)
///
/// # Returns
/// * `Ok(U256)` - Amount in smallest unit
/// * `Err` - If parsing fails
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ClientError> {
    let amount = amount.trim();
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 || amount.is_empty() {
        return Err(ClientError::InvalidAmount(format!(
            "Invalid amount format: '{amount}'"
        )));
    }

    let whole_str = if parts[0].is_empty() { "0" } else { parts[0] };
    let whole = U256::from_str_radix(whole_str, 10)
        .map_err(|_| ClientError::InvalidAmount(format!("Invalid whole number: '{whole_str}'")))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.len() > decimals as usize {
            return Err(ClientError::InvalidAmount(format!(
                "Too many decimal places (max {decimals})"
            )));
        }
        if dec_str.is_empty() {
            U256::ZERO
        } else {
            // Pad with zeros to match decimals
            let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
            U256::from_str_radix(&padded, 10)
                .map_err(|_| ClientError::InvalidAmount(format!("Invalid decimal: '{dec_str}'")))?
        }
    } else {
        U256::ZERO
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| ClientError::InvalidAmount("Amount overflow".to_string()))
}

/// Format wei (or token units) to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Format with a fixed number of fractional digits (truncated, zero padded).
pub fn format_amount_fixed(amount: U256, decimals: u8, precision: usize) -> String {
    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    if precision == 0 {
        return whole.to_string();
    }
    let remainder = amount % divisor;
    let mut frac = format!("{:0>width$}", remainder.to_string(), width = decimals as usize);
    frac.truncate(precision);
    format!("{whole}.{frac:0<precision$}")
}

/// Render a wei amount in gwei for fee display.
pub fn format_gwei(wei: u128) -> String {
    format_amount(U256::from(wei), 9)
}
