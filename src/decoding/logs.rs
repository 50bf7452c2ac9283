use std::sync::LazyLock;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, B256, I256, U256};
use thiserror::Error;

use super::event_parsing::ParsedEvent;
use crate::rpc::RawLog;

static ERC20_TRANSFER: LazyLock<ParsedEvent> = LazyLock::new(ParsedEvent::erc20_transfer);

/// Why a log could not be read as a given event. Callers treat every variant
/// as "not this event" and move on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("topic0 {found:?} does not match expected {expected}")]
    SignatureMismatch {
        expected: B256,
        found: Option<B256>,
    },

    #[error("expected {expected} topics, log has {found}")]
    TopicCount { expected: usize, found: usize },

    #[error("failed to decode log data: {0}")]
    Data(String),

    #[error("unsupported value type: {0}")]
    Unsupported(String),

    #[error("missing parameter '{0}'")]
    MissingParam(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    Bytes32(B256),
    Bytes(Vec<u8>),
    String(String),
    /// Tuples and arrays, in declaration order
    List(Vec<DecodedValue>),
}

impl DecodedValue {
    pub fn as_address(&self) -> Option<Address> {
        match self {
            DecodedValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_uint256(&self) -> Option<U256> {
        match self {
            DecodedValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.as_uint256().and_then(|v| v.try_into().ok())
    }
}

/// A log decoded against a schema. Params keep declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub address: Address,
    pub log_index: Option<u64>,
    pub params: Vec<(String, DecodedValue)>,
}

impl DecodedEvent {
    pub fn get(&self, name: &str) -> Option<&DecodedValue> {
        self.params
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value)
    }
}

/// A decoded ERC-20 `Transfer`. `value` is the raw smallest-unit amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    /// The token contract that emitted the log.
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub log_index: Option<u64>,
}

impl TransferEvent {
    pub fn from_decoded(event: &DecodedEvent) -> Result<Self, DecodeError> {
        let address = |name: &str| {
            event
                .get(name)
                .and_then(DecodedValue::as_address)
                .ok_or_else(|| DecodeError::MissingParam(name.to_string()))
        };
        let value = event
            .get("value")
            .and_then(DecodedValue::as_uint256)
            .ok_or_else(|| DecodeError::MissingParam("value".to_string()))?;

        Ok(Self {
            token: event.address,
            from: address("from")?,
            to: address("to")?,
            value,
            log_index: event.log_index,
        })
    }
}

/// Decode `log` against `schema`.
///
/// `topics[0]` must equal the schema's topic0 and the log must carry exactly
/// one topic per indexed parameter after it. Non-indexed parameters are
/// ABI-decoded from the data section as a parameter sequence.
pub fn decode_log(log: &RawLog, schema: &ParsedEvent) -> Result<DecodedEvent, DecodeError> {
    let found = log.topics.first().copied();
    if found != Some(schema.topic0) {
        return Err(DecodeError::SignatureMismatch {
            expected: schema.topic0,
            found,
        });
    }

    let indexed_params = schema.indexed_params();
    let data_params = schema.data_params();

    let expected_topics = indexed_params.len() + 1;
    if log.topics.len() != expected_topics {
        return Err(DecodeError::TopicCount {
            expected: expected_topics,
            found: log.topics.len(),
        });
    }

    let mut indexed_values = Vec::with_capacity(indexed_params.len());
    for (param, topic) in indexed_params.iter().zip(&log.topics[1..]) {
        indexed_values.push(decode_topic(topic, &param.param_type));
    }

    let mut data_values = Vec::with_capacity(data_params.len());
    if !data_params.is_empty() {
        let tuple_type =
            DynSolType::Tuple(data_params.iter().map(|p| p.param_type.clone()).collect());

        match tuple_type.abi_decode_sequence(&log.data) {
            Ok(DynSolValue::Tuple(values)) => {
                for value in &values {
                    data_values.push(convert_dyn_sol_value(value)?);
                }
            }
            Ok(other) => {
                return Err(DecodeError::Data(format!(
                    "expected a tuple, decoded {:?}",
                    other
                )))
            }
            Err(e) => return Err(DecodeError::Data(e.to_string())),
        }
    }

    // Re-interleave into declaration order
    let mut indexed_values = indexed_values.into_iter();
    let mut data_values = data_values.into_iter();
    let mut params = Vec::with_capacity(schema.params.len());
    for param in &schema.params {
        let value = if param.indexed {
            indexed_values.next()
        } else {
            data_values.next()
        };
        let value = value.ok_or_else(|| DecodeError::MissingParam(param.name.clone()))?;
        params.push((param.name.clone(), value));
    }

    Ok(DecodedEvent {
        name: schema.name.clone(),
        address: log.address,
        log_index: log.log_index,
        params,
    })
}

/// Decode `log` as an ERC-20 `Transfer`.
pub fn decode_transfer(log: &RawLog) -> Result<TransferEvent, DecodeError> {
    let decoded = decode_log(log, &ERC20_TRANSFER)?;
    TransferEvent::from_decoded(&decoded)
}

/// Indexed values occupy one full word. Dynamic types are stored as their hash.
fn decode_topic(topic: &B256, param_type: &DynSolType) -> DecodedValue {
    match param_type {
        DynSolType::Address => DecodedValue::Address(Address::from_word(*topic)),
        DynSolType::Uint(_) => DecodedValue::Uint(U256::from_be_bytes(topic.0)),
        DynSolType::Int(_) => DecodedValue::Int(I256::from_be_bytes(topic.0)),
        DynSolType::Bool => DecodedValue::Bool(topic[31] != 0),
        _ => DecodedValue::Bytes32(*topic),
    }
}

fn convert_dyn_sol_value(value: &DynSolValue) -> Result<DecodedValue, DecodeError> {
    match value {
        DynSolValue::Address(addr) => Ok(DecodedValue::Address(*addr)),
        DynSolValue::Uint(val, _) => Ok(DecodedValue::Uint(*val)),
        DynSolValue::Int(val, _) => Ok(DecodedValue::Int(*val)),
        DynSolValue::Bool(b) => Ok(DecodedValue::Bool(*b)),
        DynSolValue::FixedBytes(word, 32) => Ok(DecodedValue::Bytes32(*word)),
        DynSolValue::FixedBytes(word, size) => Ok(DecodedValue::Bytes(word[..*size].to_vec())),
        DynSolValue::Bytes(bytes) => Ok(DecodedValue::Bytes(bytes.clone())),
        DynSolValue::String(s) => Ok(DecodedValue::String(s.clone())),
        DynSolValue::Tuple(values)
        | DynSolValue::Array(values)
        | DynSolValue::FixedArray(values) => values
            .iter()
            .map(convert_dyn_sol_value)
            .collect::<Result<Vec<_>, _>>()
            .map(DecodedValue::List),
        _ => Err(DecodeError::Unsupported(format!("{:?}", value))),
    }
}
