//! The query contract the core needs from an RPC node.
//!
//! Results are plain structs so the tracker and the query service can be
//! exercised against in-memory providers.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use super::rpc::RpcError;

/// A raw log as emitted by a contract: ordered topics plus opaque data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    /// Position within the block, when the node reports it.
    pub log_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract creations.
    pub to: Option<Address>,
    /// Native value in wei.
    pub value: U256,
    pub gas_price: Option<u128>,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<RawLog>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub number: u64,
    pub timestamp: u64,
}

/// Read access to a node. Every method either returns data or a typed
/// [`RpcError`]; "not found" is `Ok(None)`.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn get_transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, RpcError>;

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, RpcError>;

    async fn get_block(&self, number: u64) -> Result<Option<ChainBlock>, RpcError>;

    /// Resolves once a receipt exists, or fails with [`RpcError::Timeout`].
    async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> Result<ChainReceipt, RpcError>;

    /// `eth_call` against the latest block.
    async fn call(&self, contract: Address, data: Bytes) -> Result<Bytes, RpcError>;
}
