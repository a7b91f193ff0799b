// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Settings are read from the process environment after loading an optional
//! `.env` file from the working directory.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `ALCHEMY_API_KEY` | API key appended to the node base URLs | empty |
//! | `ETHEREUM_NETWORK` | `mainnet`, `sepolia`, `holesky` or `localhost` | empty |
//! | `ETHEREUM_HTTP_URL` | HTTP JSON-RPC base URL | `http://localhost:8545` |
//! | `ETHEREUM_WS_URL` | WebSocket JSON-RPC base URL | `ws://localhost:8546` |
//! | `TEST_PRIVATE_KEY` | Hex private key used for signing | empty |
//! | `TEST_SEND_ADDRESS` | Initial token recipient when deploying | empty |
//! | `TEST_RECIPIENT_ADDRESS` | Recipient for transfer demos | empty |
//! | `CONTRACT_ADDRESS` | Existing ERC-20 contract | empty |
//! | `CONTRACT_BYTECODE_PATH` | Hex creation bytecode of the tutorial token | `./contracts/MYERC20.bin` |
//! | `DEFAULT_GAS_LIMIT` | Gas limit used when estimation fails | `21000` |
//! | `GAS_PRICE_MULTIPLIER` | Multiplier applied to fee caps | `1.1` |
//! | `LOG_LEVEL` | Log level filter (overridden by `RUST_LOG`) | `info` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |

use std::path::PathBuf;

use crate::blockchain::types::{NetworkConfig, HOLESKY, LOCALHOST, MAINNET, SEPOLIA};

pub const ALCHEMY_API_KEY_ENV: &str = "ALCHEMY_API_KEY";
pub const ETHEREUM_NETWORK_ENV: &str = "ETHEREUM_NETWORK";
pub const ETHEREUM_HTTP_URL_ENV: &str = "ETHEREUM_HTTP_URL";
pub const ETHEREUM_WS_URL_ENV: &str = "ETHEREUM_WS_URL";
pub const TEST_PRIVATE_KEY_ENV: &str = "TEST_PRIVATE_KEY";
pub const TEST_SEND_ADDRESS_ENV: &str = "TEST_SEND_ADDRESS";
pub const TEST_RECIPIENT_ADDRESS_ENV: &str = "TEST_RECIPIENT_ADDRESS";
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";
pub const CONTRACT_BYTECODE_PATH_ENV: &str = "CONTRACT_BYTECODE_PATH";
pub const DEFAULT_GAS_LIMIT_ENV: &str = "DEFAULT_GAS_LIMIT";
pub const GAS_PRICE_MULTIPLIER_ENV: &str = "GAS_PRICE_MULTIPLIER";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HTTP_URL: &str = "http://localhost:8545";
const DEFAULT_WS_URL: &str = "ws://localhost:8546";
const DEFAULT_BYTECODE_PATH: &str = "./contracts/MYERC20.bin";

/// Standard gas for a plain value transfer.
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;
pub const DEFAULT_GAS_PRICE_MULTIPLIER: f64 = 1.1;

/// Client configuration assembled from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub alchemy_api_key: String,
    pub ethereum_network: String,
    pub ethereum_http_url: String,
    pub ethereum_ws_url: String,
    pub test_private_key: String,
    pub test_send_address: String,
    pub test_recipient_address: String,
    pub contract_address: String,
    pub contract_bytecode_path: PathBuf,
    pub default_gas_limit: u64,
    pub gas_price_multiplier: f64,
    pub log_level: String,
    pub log_format: String,
    /// Problems found while loading, reported by [`Config::validate`]
    load_warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alchemy_api_key: String::new(),
            ethereum_network: String::new(),
            ethereum_http_url: DEFAULT_HTTP_URL.to_string(),
            ethereum_ws_url: DEFAULT_WS_URL.to_string(),
            test_private_key: String::new(),
            test_send_address: String::new(),
            test_recipient_address: String::new(),
            contract_address: String::new(),
            contract_bytecode_path: PathBuf::from(DEFAULT_BYTECODE_PATH),
            default_gas_limit: DEFAULT_GAS_LIMIT,
            gas_price_multiplier: DEFAULT_GAS_PRICE_MULTIPLIER,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            load_warnings: Vec::new(),
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the configuration from the environment.
    pub fn load() -> Self {
        let dotenv_found = dotenv::dotenv().is_ok();
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        if !dotenv_found {
            config
                .load_warnings
                .insert(0, ".env file not found, using environment variables".to_string());
        }
        config
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();
        let mut load_warnings = Vec::new();

        let default_gas_limit = parse_or_default(
            DEFAULT_GAS_LIMIT_ENV,
            get(DEFAULT_GAS_LIMIT_ENV),
            defaults.default_gas_limit,
            &mut load_warnings,
        );
        let gas_price_multiplier = parse_or_default(
            GAS_PRICE_MULTIPLIER_ENV,
            get(GAS_PRICE_MULTIPLIER_ENV),
            defaults.gas_price_multiplier,
            &mut load_warnings,
        );

        Self {
            alchemy_api_key: get(ALCHEMY_API_KEY_ENV).unwrap_or_default(),
            ethereum_network: get(ETHEREUM_NETWORK_ENV).unwrap_or_default(),
            ethereum_http_url: get(ETHEREUM_HTTP_URL_ENV).unwrap_or(defaults.ethereum_http_url),
            ethereum_ws_url: get(ETHEREUM_WS_URL_ENV).unwrap_or(defaults.ethereum_ws_url),
            test_private_key: get(TEST_PRIVATE_KEY_ENV).unwrap_or_default(),
            test_send_address: get(TEST_SEND_ADDRESS_ENV).unwrap_or_default(),
            test_recipient_address: get(TEST_RECIPIENT_ADDRESS_ENV).unwrap_or_default(),
            contract_address: get(CONTRACT_ADDRESS_ENV).unwrap_or_default(),
            contract_bytecode_path: get(CONTRACT_BYTECODE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.contract_bytecode_path),
            default_gas_limit,
            gas_price_multiplier,
            log_level: get(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_format: get(LOG_FORMAT_ENV).unwrap_or(defaults.log_format),
            load_warnings,
        }
    }

    /// HTTP endpoint: base URL with the API key appended.
    pub fn http_url(&self) -> String {
        format!("{}{}", self.ethereum_http_url, self.alchemy_api_key)
    }

    /// WebSocket endpoint, used by subscriptions.
    pub fn ws_url(&self) -> String {
        format!("{}{}", self.ethereum_ws_url, self.alchemy_api_key)
    }

    /// Whether a signing key is configured.
    pub fn has_private_key(&self) -> bool {
        !self.test_private_key.is_empty()
    }

    /// Collect warnings about missing or invalid settings. Nothing here is
    /// fatal. Logging is not up while loading, so these are reported later.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.load_warnings.clone();
        if self.alchemy_api_key.is_empty() {
            warnings.push(format!(
                "{ALCHEMY_API_KEY_ENV} not set - using {} without an API key",
                self.ethereum_http_url
            ));
        }
        if self.test_private_key.is_empty() {
            warnings.push(format!(
                "{TEST_PRIVATE_KEY_ENV} not set - transfer functions will not work"
            ));
        }
        if self.gas_price_multiplier <= 0.0 {
            warnings.push(format!(
                "{GAS_PRICE_MULTIPLIER_ENV} must be positive, got {}",
                self.gas_price_multiplier
            ));
        }
        warnings
    }

    pub fn is_production_mode(&self) -> bool {
        self.ethereum_network.eq_ignore_ascii_case("mainnet")
    }

    pub fn is_test_mode(&self) -> bool {
        matches!(
            self.ethereum_network.to_ascii_lowercase().as_str(),
            "sepolia" | "goerli" | "holesky" | "localhost"
        )
    }

    /// Static network metadata for the configured network name, if known.
    pub fn network(&self) -> Option<NetworkConfig> {
        match self.ethereum_network.to_ascii_lowercase().as_str() {
            "mainnet" => Some(MAINNET),
            "sepolia" => Some(SEPOLIA),
            "holesky" => Some(HOLESKY),
            "localhost" => Some(LOCALHOST),
            _ => None,
        }
    }
}

fn parse_or_default<T>(key: &str, raw: Option<String>, default: T, warnings: &mut Vec<String>) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Invalid value '{value}' for {key}, using default {default}"));
            default
        }),
    }
}
