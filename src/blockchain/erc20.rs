// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 token contract interactions.
//!
//! The binding covers the tutorial token `MYERC20` (ERC-20 + Pausable +
//! Ownable + EIP-2612 permit). Only the functions and events this client
//! uses are declared.

use std::str::FromStr;

use alloy::{
    primitives::{keccak256, Address, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};

use super::types::{TokenBalance, TokenInfo};
use super::units::{format_amount, ETH_DECIMALS};
use crate::error::ClientError;

sol! {
    #[sol(rpc)]
    interface IMyERC20 {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
        event Paused(address account);
        event Unpaused(address account);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);

        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function paused() external view returns (bool);
        function owner() external view returns (address);
        function nonces(address owner) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function approve(address spender, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }
}

sol! {
    /// Constructor arguments of the tutorial token.
    struct MyErc20Constructor {
        address recipient;
        address initialOwner;
    }
}

/// Canonical signature of the ERC-20 `transfer` function.
pub const TRANSFER_SIGNATURE: &str = "transfer(address,uint256)";

/// Canonical signature of the ERC-20 `balanceOf` function.
pub const BALANCE_OF_SIGNATURE: &str = "balanceOf(address)";

/// How ERC-20 calldata is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallEncoding {
    /// Generated ABI binding
    #[default]
    Abi,
    /// Selector and padded arguments assembled by hand
    Manual,
}

impl CallEncoding {
    pub fn from_manual_flag(manual: bool) -> Self {
        if manual {
            Self::Manual
        } else {
            Self::Abi
        }
    }

    pub fn encode_transfer(self, to: Address, amount: U256) -> Vec<u8> {
        match self {
            Self::Abi => encode_transfer_abi(to, amount),
            Self::Manual => encode_transfer_manual(to, amount),
        }
    }

    pub fn encode_balance_of(self, account: Address) -> Vec<u8> {
        match self {
            Self::Abi => IMyERC20::balanceOfCall { account }.abi_encode(),
            Self::Manual => encode_balance_of_manual(account),
        }
    }
}

/// Parse an address, naming the role in the error.
pub fn parse_address(role: &str, raw: &str) -> Result<Address, ClientError> {
    Address::from_str(raw.trim())
        .map_err(|e| ClientError::InvalidAddress(format!("Invalid {role} address '{raw}': {e}")))
}

/// Encode `transfer(to, amount)` by hand: 4-byte selector followed by the
/// two arguments left-padded to 32 bytes each.
pub fn encode_transfer_manual(to: Address, amount: U256) -> Vec<u8> {
    let selector = &keccak256(TRANSFER_SIGNATURE.as_bytes())[..4];

    let mut data = Vec::with_capacity(4 + 32 + 32);
    data.extend_from_slice(selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(to.as_slice());
    data.extend_from_slice(&amount.to_be_bytes::<32>());
    data
}

/// Encode `transfer(to, amount)` through the generated ABI binding.
pub fn encode_transfer_abi(to: Address, amount: U256) -> Vec<u8> {
    IMyERC20::transferCall { to, value: amount }.abi_encode()
}

/// Encode `balanceOf(account)` by hand: selector plus the left-padded address.
pub fn encode_balance_of_manual(account: Address) -> Vec<u8> {
    let selector = &keccak256(BALANCE_OF_SIGNATURE.as_bytes())[..4];

    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(selector);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(account.as_slice());
    data
}

/// Decode a single `uint256` return word.
pub fn decode_uint_word(result: &[u8]) -> Result<U256, ClientError> {
    if result.len() != 32 {
        return Err(ClientError::ContractError(format!(
            "Unexpected result length: got {}, expected 32",
            result.len()
        )));
    }
    Ok(U256::from_be_slice(result))
}

/// ERC-20 contract wrapper.
pub struct Erc20Contract<P> {
    contract: IMyERC20::IMyERC20Instance<P>,
    address: Address,
}

impl<P: Provider + Clone> Erc20Contract<P> {
    /// Create a new ERC-20 contract instance.
    pub fn new(provider: &P, contract_address: &str) -> Result<Self, ClientError> {
        let address = parse_address("token", contract_address)?;
        Ok(Self::at(provider, address))
    }

    /// Bind to an already parsed address.
    pub fn at(provider: &P, address: Address) -> Self {
        let contract = IMyERC20::new(address, provider.clone());
        Self { contract, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the token name.
    pub async fn name(&self) -> Result<String, ClientError> {
        self.contract
            .name()
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("name(): {e}")))
    }

    /// Get the token symbol.
    pub async fn symbol(&self) -> Result<String, ClientError> {
        self.contract
            .symbol()
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("symbol(): {e}")))
    }

    /// Get the token decimals.
    pub async fn decimals(&self) -> Result<u8, ClientError> {
        self.contract
            .decimals()
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("decimals(): {e}")))
    }

    pub async fn total_supply(&self) -> Result<U256, ClientError> {
        self.contract
            .totalSupply()
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("totalSupply(): {e}")))
    }

    /// Raw balance in token base units.
    pub async fn balance_of_raw(&self, account: Address) -> Result<U256, ClientError> {
        self.contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("balanceOf(): {e}")))
    }

    /// Raw balance read with a plain `eth_call` on calldata built by `encoding`.
    pub async fn balance_of_encoded(
        &self,
        account: Address,
        encoding: CallEncoding,
    ) -> Result<U256, ClientError> {
        if encoding == CallEncoding::Abi {
            return self.balance_of_raw(account).await;
        }

        let call = TransactionRequest::default()
            .to(self.address)
            .input(encoding.encode_balance_of(account).into());
        let result = self
            .contract
            .provider()
            .call(call)
            .await
            .map_err(|e| ClientError::ContractError(format!("balanceOf() call failed: {e}")))?;
        decode_uint_word(&result)
    }

    pub async fn paused(&self) -> Result<bool, ClientError> {
        self.contract
            .paused()
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("paused(): {e}")))
    }

    pub async fn owner(&self) -> Result<Address, ClientError> {
        self.contract
            .owner()
            .call()
            .await
            .map_err(|e| ClientError::ContractError(format!("owner(): {e}")))
    }

    /// Token metadata. Missing optional fields fall back to placeholders
    /// and 18 decimals, since not every token implements them.
    pub async fn info(&self) -> TokenInfo {
        let name = self.name().await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Token has no name()");
            "Unknown".to_string()
        });
        let symbol = self.symbol().await.unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Token has no symbol()");
            "TOKEN".to_string()
        });
        let decimals = self.decimals().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Token has no decimals(), assuming 18");
            ETH_DECIMALS
        });

        TokenInfo {
            address: self.address.to_string(),
            name,
            symbol,
            decimals,
            owner: None,
            paused: None,
        }
    }

    /// [`Self::info`] plus `owner()` and `paused()`, when the token has them.
    pub async fn details(&self) -> TokenInfo {
        let mut info = self.info().await;
        info.owner = match self.owner().await {
            Ok(owner) => Some(owner.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "Token has no owner()");
                None
            }
        };
        info.paused = match self.paused().await {
            Ok(paused) => Some(paused),
            Err(e) => {
                tracing::debug!(error = %e, "Token has no paused()");
                None
            }
        };
        info
    }

    /// Get the balance of an address with metadata.
    pub async fn balance_of(
        &self,
        wallet_address: &str,
        encoding: CallEncoding,
    ) -> Result<TokenBalance, ClientError> {
        let addr = parse_address("wallet", wallet_address)?;
        let info = self.info().await;
        let balance = self.balance_of_encoded(addr, encoding).await?;

        Ok(TokenBalance {
            symbol: info.symbol,
            name: info.name,
            balance_raw: balance.to_string(),
            balance_formatted: format_amount(balance, info.decimals),
            decimals: info.decimals,
            contract_address: Some(self.address.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;
    use alloy::providers::{mock::Asserter, ProviderBuilder};
    use alloy::sol_types::{SolEvent, SolValue};

    #[test]
    fn transfer_selector_is_a9059cbb() {
        let data = encode_transfer_manual(Address::ZERO, U256::ZERO);
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(data.len(), 68);
    }

    #[test]
    fn manual_and_abi_encodings_agree() {
        let to = Address::from_str("0x5425890298aed601595a70AB815c96711a31Bc65").unwrap();
        let amount = U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(encode_transfer_manual(to, amount), encode_transfer_abi(to, amount));
    }

    #[test]
    fn balance_of_encodings_agree() {
        let account = Address::from_str("0x5425890298aed601595a70AB815c96711a31Bc65").unwrap();
        let manual = CallEncoding::Manual.encode_balance_of(account);
        assert_eq!(&manual[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(manual.len(), 36);
        assert_eq!(manual, CallEncoding::Abi.encode_balance_of(account));
    }

    #[test]
    fn uint_word_must_be_32_bytes() {
        let word = U256::from(1_500u64).to_be_bytes::<32>();
        assert_eq!(decode_uint_word(&word).unwrap(), U256::from(1_500u64));
        assert!(matches!(
            decode_uint_word(&word[..31]),
            Err(ClientError::ContractError(_))
        ));
        assert!(decode_uint_word(&[]).is_err());
    }

    #[test]
    fn encoding_follows_manual_flag() {
        assert_eq!(CallEncoding::from_manual_flag(true), CallEncoding::Manual);
        assert_eq!(CallEncoding::from_manual_flag(false), CallEncoding::Abi);
        assert_eq!(CallEncoding::default(), CallEncoding::Abi);
    }

    #[test]
    fn manual_encoding_pads_arguments() {
        let to = Address::repeat_byte(0x11);
        let data = encode_transfer_manual(to, U256::from(0x0102u64));
        assert!(data[4..16].iter().all(|b| *b == 0));
        assert_eq!(&data[16..36], to.as_slice());
        assert_eq!(&data[66..68], &[0x01, 0x02]);
    }

    #[test]
    fn event_signature_hashes() {
        assert_eq!(
            format!("{:#x}", IMyERC20::Transfer::SIGNATURE_HASH),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(
            format!("{:#x}", IMyERC20::Approval::SIGNATURE_HASH),
            "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925"
        );
        assert_eq!(
            format!("{:#x}", IMyERC20::OwnershipTransferred::SIGNATURE_HASH),
            "0x8be0079c531659141344cd1fd0a4f28419497f9722a3daafe3b4186f6b6457e0"
        );
    }

    #[test]
    fn constructor_args_are_two_words() {
        let args = MyErc20Constructor {
            recipient: Address::repeat_byte(0x01),
            initialOwner: Address::repeat_byte(0x02),
        };
        let encoded = args.abi_encode();
        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[12..32], Address::repeat_byte(0x01).as_slice());
        assert_eq!(&encoded[44..64], Address::repeat_byte(0x02).as_slice());
    }

    #[test]
    fn parse_address_names_role() {
        let err = parse_address("recipient", "0x1234").unwrap_err();
        assert!(err.to_string().contains("recipient"));
        assert!(parse_address("token", " 0x5425890298aed601595a70AB815c96711a31Bc65 ").is_ok());
    }

    #[tokio::test]
    async fn manual_balance_call_decodes_word() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let token = Erc20Contract::at(&provider, Address::repeat_byte(0x42));

        asserter.push_success(&Bytes::from(U256::from(1_500u64).to_be_bytes::<32>().to_vec()));
        let balance = token
            .balance_of_encoded(Address::repeat_byte(0x01), CallEncoding::Manual)
            .await
            .unwrap();
        assert_eq!(balance, U256::from(1_500u64));

        asserter.push_success(&Bytes::from(vec![0u8; 4]));
        assert!(matches!(
            token
                .balance_of_encoded(Address::repeat_byte(0x01), CallEncoding::Manual)
                .await,
            Err(ClientError::ContractError(_))
        ));
    }

    #[tokio::test]
    async fn details_include_owner_and_pause_state() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let token = Erc20Contract::at(&provider, Address::repeat_byte(0x42));

        asserter.push_success(&Bytes::from("MyERC20".to_string().abi_encode()));
        asserter.push_success(&Bytes::from("MYE".to_string().abi_encode()));
        asserter.push_success(&Bytes::from(U256::from(6u64).abi_encode()));
        asserter.push_success(&Bytes::from(Address::repeat_byte(0x07).abi_encode()));
        asserter.push_failure_msg("execution reverted");

        let info = token.details().await;
        assert_eq!(info.name, "MyERC20");
        assert_eq!(info.symbol, "MYE");
        assert_eq!(info.decimals, 6);
        assert_eq!(info.owner, Some(Address::repeat_byte(0x07).to_string()));
        assert_eq!(info.paused, None);
        assert!(asserter.read_q().is_empty());
    }

    #[tokio::test]
    async fn missing_metadata_falls_back() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let token = Erc20Contract::at(&provider, Address::repeat_byte(0x42));
        for _ in 0..3 {
            asserter.push_failure_msg("execution reverted");
        }

        let info = token.info().await;
        assert_eq!(info.name, "Unknown");
        assert_eq!(info.symbol, "TOKEN");
        assert_eq!(info.decimals, ETH_DECIMALS);
    }
}
