use alloy_primitives::Address;
use serde::Deserialize;

/// The token transfers are submitted for.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub address: Address,
    pub symbol: String,
    /// Pins the decimals instead of reading `decimals()` from the contract.
    pub decimals: Option<u8>,
}
