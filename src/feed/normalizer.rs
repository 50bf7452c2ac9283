use std::str::FromStr;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{tx_from_entity_id, CanonicalRow, RowAmount, RowKind, RowSource};

/// One entity as returned by the indexer, tagged with the collection it came
/// from (`approvals`, `burnByOwners`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerRecord {
    pub entity: String,
    pub payload: Value,
}

impl IndexerRecord {
    pub fn new(entity: impl Into<String>, payload: Value) -> Self {
        Self {
            entity: entity.into(),
            payload,
        }
    }
}

/// Maps indexer records onto [`CanonicalRow`]s. Never fails: missing or
/// malformed fields become `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventNormalizer {
    /// Decimals of the token the indexer tracks, when known.
    token_decimals: Option<u8>,
}

impl EventNormalizer {
    pub fn new(token_decimals: Option<u8>) -> Self {
        Self { token_decimals }
    }

    pub fn normalize_all(&self, records: &[IndexerRecord]) -> Vec<CanonicalRow> {
        records.iter().map(|record| self.normalize(record)).collect()
    }

    pub fn normalize(&self, record: &IndexerRecord) -> CanonicalRow {
        let payload = &record.payload;
        let kind = kind_for_entity(&record.entity);

        let id = string_field(payload, "id")
            .or_else(|| string_field(payload, "transactionHash"))
            .unwrap_or_else(|| {
                tracing::debug!("{} record without id or transactionHash", record.entity);
                String::new()
            });

        let (from, to, amount) = match &kind {
            RowKind::Approval => (
                address_field(payload, &["owner"]),
                address_field(payload, &["spender"]),
                amount_field(payload, &["value"]),
            ),
            RowKind::Burn => (
                address_field(payload, &["from"]),
                None,
                amount_field(payload, &["amount"]),
            ),
            RowKind::Transfer => (
                address_field(payload, &["from"]),
                address_field(payload, &["to"]),
                amount_field(payload, &["value", "amount"]),
            ),
            RowKind::Other(_) => (
                address_field(payload, &["from", "owner", "sender"]),
                address_field(payload, &["to", "spender", "recipient"]),
                amount_field(payload, &["value", "amount"]),
            ),
        };

        CanonicalRow {
            tx_hash: tx_from_entity_id(&id),
            id,
            kind,
            from,
            to,
            amount: amount.map(|raw| RowAmount::token(raw, self.token_decimals)),
            block_number: block_number_field(payload),
            source: RowSource::Indexer,
            raw: payload.clone(),
        }
    }
}

fn kind_for_entity(entity: &str) -> RowKind {
    match entity.to_ascii_lowercase().as_str() {
        "approval" | "approvals" => RowKind::Approval,
        "burn" | "burns" | "burnbyowner" | "burnbyowners" => RowKind::Burn,
        "transfer" | "transfers" => RowKind::Transfer,
        _ => RowKind::Other(entity.to_string()),
    }
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn address_field(payload: &Value, keys: &[&str]) -> Option<Address> {
    let (key, raw) = keys
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str).map(|v| (*key, v)))?;
    match Address::from_str(raw) {
        Ok(address) => Some(address),
        Err(e) => {
            tracing::debug!("Ignoring malformed address in '{}': {} ({})", key, raw, e);
            None
        }
    }
}

/// Indexer big integers arrive as decimal strings; small ones sometimes as numbers.
fn amount_field(payload: &Value, keys: &[&str]) -> Option<U256> {
    let (key, value) = keys
        .iter()
        .find_map(|key| payload.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))?;
    let parsed = match value {
        Value::String(s) => U256::from_str_radix(s.trim(), 10).ok(),
        Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    };
    if parsed.is_none() {
        tracing::debug!("Ignoring malformed amount in '{}': {}", key, value);
    }
    parsed
}

fn block_number_field(payload: &Value) -> Option<u64> {
    let value = payload.get("blockNumber").filter(|v| !v.is_null())?;
    let parsed = match value {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    if parsed.is_none() {
        tracing::debug!("Ignoring malformed blockNumber: {}", value);
    }
    parsed
}
