use std::sync::Arc;

use alloy::primitives::{Address, B256};
use serde::Serialize;
use thiserror::Error;

use super::decimals::DecimalsCache;
use crate::decoding::decode_transfer;
use crate::rpc::{ChainProvider, ChainReceipt, ChainTransaction, RpcError};
use crate::types::{chain_row_id, CanonicalRow, RowAmount, RowKind, RowSource, ValidationError};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("transaction {0} not found")]
    NotFound(B256),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: RpcError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxStatus {
    /// No receipt yet.
    Pending,
    Success,
    Failed,
}

/// The amount shown for a looked-up transaction, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "amount")]
pub enum TransferValue {
    /// Decoded from the first receipt log as an ERC-20 `Transfer`.
    DecodedTransfer(RowAmount),
    /// The transaction's native value, used when no `Transfer` could be decoded.
    NativeValueFallback(RowAmount),
}

impl TransferValue {
    pub fn amount(&self) -> &RowAmount {
        match self {
            TransferValue::DecodedTransfer(amount) | TransferValue::NativeValueFallback(amount) => {
                amount
            }
        }
    }
}

/// Everything known about one transaction hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionLookup {
    pub hash: B256,
    pub status: TxStatus,
    pub from: Address,
    pub to: Option<Address>,
    pub value: TransferValue,
    pub block_number: Option<u64>,
    pub block_timestamp: Option<u64>,
    pub gas_used: Option<u64>,
    pub gas_price: Option<u128>,
    /// The transaction as a feed row.
    pub row: CanonicalRow,
}

/// Stateless transaction lookups. Clones share the provider and decimals cache.
#[derive(Clone)]
pub struct ChainQueryService {
    provider: Arc<dyn ChainProvider>,
    decimals: Arc<DecimalsCache>,
}

impl ChainQueryService {
    pub fn new(provider: Arc<dyn ChainProvider>, decimals: Arc<DecimalsCache>) -> Self {
        Self { provider, decimals }
    }

    pub fn decimals(&self) -> &Arc<DecimalsCache> {
        &self.decimals
    }

    /// Looks up a user-entered hash, validating its shape first.
    pub async fn lookup_str(&self, input: &str) -> Result<TransactionLookup, LookupError> {
        let hash = crate::types::validation::parse_tx_hash(input)?;
        self.lookup(hash).await
    }

    pub async fn lookup(&self, tx_hash: B256) -> Result<TransactionLookup, LookupError> {
        let tx = self
            .provider
            .get_transaction(tx_hash)
            .await
            .map_err(|source| LookupError::Provider {
                operation: "eth_getTransactionByHash",
                source,
            })?
            .ok_or(LookupError::NotFound(tx_hash))?;

        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|source| LookupError::Provider {
                operation: "eth_getTransactionReceipt",
                source,
            })?;

        let block_number = receipt
            .as_ref()
            .and_then(|r| r.block_number)
            .or(tx.block_number);

        let block_timestamp = match block_number {
            Some(number) => self
                .provider
                .get_block(number)
                .await
                .map_err(|source| LookupError::Provider {
                    operation: "eth_getBlockByNumber",
                    source,
                })?
                .map(|block| block.timestamp),
            None => None,
        };

        let status = match &receipt {
            None => TxStatus::Pending,
            Some(r) if r.success => TxStatus::Success,
            Some(_) => TxStatus::Failed,
        };

        let (value, row) = self
            .transfer_value(&tx, receipt.as_ref(), block_number)
            .await;

        tracing::debug!("Looked up {:#x}: {:?}", tx_hash, status);

        Ok(TransactionLookup {
            hash: tx_hash,
            status,
            from: tx.from,
            to: tx.to,
            value,
            block_number,
            block_timestamp,
            gas_used: receipt.as_ref().map(|r| r.gas_used),
            gas_price: receipt
                .as_ref()
                .map(|r| r.effective_gas_price)
                .or(tx.gas_price),
            row,
        })
    }

    /// Runs several lookups concurrently. Results keep the input order.
    pub async fn lookup_all(&self, hashes: &[B256]) -> Vec<Result<TransactionLookup, LookupError>> {
        futures::future::join_all(hashes.iter().map(|hash| self.lookup(*hash))).await
    }

    /// Reads the first receipt log as a `Transfer`, falling back to the
    /// native value when that log is missing or is not one.
    async fn transfer_value(
        &self,
        tx: &ChainTransaction,
        receipt: Option<&ChainReceipt>,
        block_number: Option<u64>,
    ) -> (TransferValue, CanonicalRow) {
        let first_log = receipt.and_then(|r| r.logs.first());
        let decoded = match first_log.map(decode_transfer) {
            Some(Ok(transfer)) => Some(transfer),
            Some(Err(e)) => {
                tracing::debug!("First log of {:#x} is not a Transfer: {}", tx.hash, e);
                None
            }
            None => None,
        };

        match decoded {
            Some(transfer) => {
                let decimals = match self.decimals.decimals(transfer.token).await {
                    Ok(decimals) => Some(decimals),
                    Err(e) => {
                        tracing::warn!("Showing raw amount for {:#x}: {}", tx.hash, e);
                        None
                    }
                };
                let amount = RowAmount::token(transfer.value, decimals);
                let row = CanonicalRow {
                    id: chain_row_id(&tx.hash, transfer.log_index),
                    tx_hash: format!("{:#x}", tx.hash),
                    kind: RowKind::Transfer,
                    from: Some(transfer.from),
                    to: Some(transfer.to),
                    amount: Some(amount.clone()),
                    block_number,
                    source: RowSource::Chain,
                    raw: serde_json::json!({
                        "token": transfer.token,
                        "logIndex": transfer.log_index,
                    }),
                };
                (TransferValue::DecodedTransfer(amount), row)
            }
            None => {
                let amount = RowAmount::native(tx.value);
                let row = CanonicalRow {
                    id: chain_row_id(&tx.hash, None),
                    tx_hash: format!("{:#x}", tx.hash),
                    kind: RowKind::Transfer,
                    from: Some(tx.from),
                    to: tx.to,
                    amount: Some(amount.clone()),
                    block_number,
                    source: RowSource::Chain,
                    raw: serde_json::json!({ "value": tx.value.to_string() }),
                };
                (TransferValue::NativeValueFallback(amount), row)
            }
        }
    }
}

impl std::fmt::Debug for ChainQueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainQueryService")
            .field("decimals", &self.decimals)
            .finish()
    }
}
