// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum integration.
//!
//! This module provides functionality for:
//! - Querying blocks, transactions, receipts and balances
//! - Wallet generation and key loading
//! - EIP-1559 fee calculation with a legacy fallback
//! - ETH and ERC-20 transfers, contract deployment
//! - Confirmation polling, block and contract event subscriptions

pub mod client;
pub mod deploy;
pub mod erc20;
pub mod events;
pub mod fees;
pub mod subscription;
pub mod transactions;
pub mod types;
pub mod units;
pub mod waiter;
pub mod wallet;

pub use client::{EthClient, HttpProvider};
pub use erc20::CallEncoding;
pub use transactions::{GasEstimate, SendOptions, SendResult, TxSender};
pub use types::*;
pub use units::{format_amount, parse_amount};
pub use waiter::{wait_for_transaction, WaitPolicy};
