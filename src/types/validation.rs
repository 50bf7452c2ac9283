use std::str::FromStr;

use alloy::primitives::{Address, B256};
use thiserror::Error;

/// Bad user input. Reported immediately and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    #[error("Malformed transaction hash: {0}")]
    MalformedHash(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(String),

    #[error("Amount {amount} has more than {decimals} fractional digits")]
    TooManyDecimals { amount: String, decimals: u8 },

    #[error("No signer account is connected")]
    SignerNotConnected,
}

/// Parses a `0x`-prefixed 20-byte hex address. Checksum casing is not enforced.
pub fn parse_address(input: &str) -> Result<Address, ValidationError> {
    let trimmed = input.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(ValidationError::MalformedAddress(input.to_string()));
    }
    Address::from_str(trimmed).map_err(|_| ValidationError::MalformedAddress(input.to_string()))
}

/// Parses a `0x`-prefixed 32-byte hex transaction hash.
pub fn parse_tx_hash(input: &str) -> Result<B256, ValidationError> {
    let trimmed = input.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 66 {
        return Err(ValidationError::MalformedHash(input.to_string()));
    }
    B256::from_str(trimmed).map_err(|_| ValidationError::MalformedHash(input.to_string()))
}
