//! The canonical row shared by the chain-derived and indexer-derived views.

use std::fmt;

use alloy::primitives::{Address, B256, U256};
use serde::{Serialize, Serializer};

use crate::units::format_units;

/// Length of a `0x`-prefixed 32-byte hex hash.
pub const TX_HASH_HEX_LEN: usize = 66;

/// Kind of event a row represents.
///
/// `Other` carries the indexer entity name for kinds this crate does not know
/// about yet; such rows keep their raw payload and are otherwise treated like
/// any other row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RowKind {
    Approval,
    Burn,
    Transfer,
    Other(String),
}

impl RowKind {
    pub fn as_str(&self) -> &str {
        match self {
            RowKind::Approval => "Approval",
            RowKind::Burn => "Burn",
            RowKind::Transfer => "Transfer",
            RowKind::Other(name) => name,
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a row came from. Drives the dedup policy of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RowSource {
    /// Built from RPC data (transaction, receipt, logs).
    Chain,
    /// Built from an indexer/subgraph record.
    Indexer,
}

/// What unit an amount is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Denomination {
    /// Smallest units of an ERC-20 style token.
    Token,
    /// Wei of the chain's native currency.
    Native,
}

/// An amount kept as the undecoded smallest-unit integer.
///
/// Decimal formatting is deferred to [`RowAmount::display`]; when the
/// decimals are unknown the raw integer is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAmount {
    #[serde(serialize_with = "serialize_decimal")]
    pub raw: U256,
    pub decimals: Option<u8>,
    pub denomination: Denomination,
}

impl RowAmount {
    pub fn token(raw: U256, decimals: Option<u8>) -> Self {
        Self {
            raw,
            decimals,
            denomination: Denomination::Token,
        }
    }

    pub fn native(raw: U256) -> Self {
        Self {
            raw,
            decimals: Some(crate::units::NATIVE_DECIMALS),
            denomination: Denomination::Native,
        }
    }

    pub fn display(&self) -> String {
        match self.decimals {
            Some(decimals) => format_units(self.raw, decimals),
            None => self.raw.to_string(),
        }
    }
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// The unit of display and filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    /// Unique within one source, may collide across sources.
    pub id: String,
    pub tx_hash: String,
    pub kind: RowKind,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub amount: Option<RowAmount>,
    pub block_number: Option<u64>,
    pub source: RowSource,
    /// Original payload, kept for detail display only.
    pub raw: serde_json::Value,
}

/// Extracts the transaction hash from an indexer entity id.
///
/// Subgraph ids are usually the transaction hash followed by a log index
/// suffix; anything past `0x` + 64 hex characters is dropped. Shorter ids are
/// returned unchanged.
pub fn tx_from_entity_id(id: &str) -> String {
    id.get(..TX_HASH_HEX_LEN).unwrap_or(id).to_string()
}

/// Id of a chain-derived row: `txHash:logIndex`, or the bare hash when the row
/// does not come from a log.
pub fn chain_row_id(tx_hash: &B256, log_index: Option<u64>) -> String {
    match log_index {
        Some(index) => format!("{:#x}:{}", tx_hash, index),
        None => format!("{:#x}", tx_hash),
    }
}
