// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum client tutorial.
//!
//! Queries blocks, transactions and receipts; subscribes to new blocks and
//! contract events; creates wallets; deploys and transfers an ERC-20 token;
//! sends ETH with EIP-1559 fees.
//!
//! ## Modules
//!
//! - `blockchain` - JSON-RPC client, signing sender and watchers (alloy)
//! - `cli` - command line definitions (clap)
//! - `commands` - command handlers and the guided demo
//! - `config` - environment configuration (dotenv)
//! - `telemetry` - tracing subscriber setup

pub mod blockchain;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod telemetry;
