//! In-memory [`ChainProvider`] for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use super::provider::{ChainBlock, ChainProvider, ChainReceipt, ChainTransaction};
use super::rpc::RpcError;

#[derive(Default)]
pub(crate) struct MockProvider {
    transactions: Mutex<HashMap<B256, ChainTransaction>>,
    receipts: Mutex<HashMap<B256, ChainReceipt>>,
    blocks: Mutex<HashMap<u64, ChainBlock>>,
    call_results: Mutex<HashMap<Address, Bytes>>,
    /// Message returned by `wait_for_receipt` instead of a timeout.
    wait_error: Mutex<Option<String>>,
    call_delay: Option<Duration>,
    wait_delay: Option<Duration>,
    pub call_count: AtomicUsize,
    pub wait_count: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(self, tx: ChainTransaction) -> Self {
        self.transactions.lock().unwrap().insert(tx.hash, tx);
        self
    }

    pub fn with_receipt(self, receipt: ChainReceipt) -> Self {
        self.set_receipt(receipt);
        self
    }

    pub fn with_block(self, number: u64, timestamp: u64) -> Self {
        self.blocks
            .lock()
            .unwrap()
            .insert(number, ChainBlock { number, timestamp });
        self
    }

    pub fn with_decimals(self, token: Address, decimals: u8) -> Self {
        self.set_decimals(token, decimals);
        self
    }

    pub fn with_call_result(self, contract: Address, data: Bytes) -> Self {
        self.call_results.lock().unwrap().insert(contract, data);
        self
    }

    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Delays every `wait_for_receipt` before it looks at the receipts.
    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = Some(delay);
        self
    }

    pub fn with_wait_error(self, message: &str) -> Self {
        *self.wait_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn set_decimals(&self, token: Address, decimals: u8) {
        let word = U256::from(decimals).to_be_bytes::<32>().to_vec();
        self.call_results.lock().unwrap().insert(token, word.into());
    }

    pub fn set_receipt(&self, receipt: ChainReceipt) {
        self.receipts
            .lock()
            .unwrap()
            .insert(receipt.transaction_hash, receipt);
    }
}

#[async_trait]
impl ChainProvider for MockProvider {
    async fn get_transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, RpcError> {
        Ok(self.transactions.lock().unwrap().get(&hash).cloned())
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, RpcError> {
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }

    async fn get_block(&self, number: u64) -> Result<Option<ChainBlock>, RpcError> {
        Ok(self.blocks.lock().unwrap().get(&number).cloned())
    }

    async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> Result<ChainReceipt, RpcError> {
        self.wait_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.wait_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(receipt) = self.receipts.lock().unwrap().get(&hash).cloned() {
            return Ok(receipt);
        }
        if let Some(message) = self.wait_error.lock().unwrap().clone() {
            return Err(RpcError::ProviderError(message));
        }
        Err(RpcError::Timeout {
            operation: format!("receipt of {:?}", hash),
            after: timeout,
        })
    }

    async fn call(&self, contract: Address, _data: Bytes) -> Result<Bytes, RpcError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.call_results.lock().unwrap().get(&contract).cloned();
        result.ok_or_else(|| RpcError::ProviderError("execution reverted".to_string()))
    }
}
