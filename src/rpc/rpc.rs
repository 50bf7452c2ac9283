use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::{Ethereum, TransactionResponse};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{
    BlockId, Log, Transaction, TransactionInput, TransactionReceipt, TransactionRequest,
};
use alloy::transports::{TransportError, TransportErrorKind};
use async_trait::async_trait;
use governor::clock::{QuantaClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Jitter, Quota, RateLimiter};
use thiserror::Error;
use url::Url;

use super::provider::{ChainBlock, ChainProvider, ChainReceipt, ChainTransaction, RawLog};
use crate::types::config::RpcSettings;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Timed out after {after:?} waiting for {operation}")]
    Timeout { operation: String, after: Duration },
}

impl RpcError {
    /// Check if this error is likely transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(_) => true,
            RpcError::RateLimitExceeded => true,
            RpcError::InvalidUrl(_) => false,
            RpcError::ProviderError(msg) => Self::is_retryable_message(msg),
            // The caller chose the deadline
            RpcError::Timeout { .. } => false,
        }
    }

    /// JSON-RPC error responses some nodes use for transient overload.
    fn is_retryable_message(msg: &str) -> bool {
        let msg_lower = msg.to_lowercase();
        msg_lower.contains("rate limit")
            || msg_lower.contains("too many requests")
            || msg_lower.contains("try again")
    }
}

impl From<TransportError> for RpcError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Transport(TransportErrorKind::HttpError(ref http))
                if http.status == 429 =>
            {
                RpcError::RateLimitExceeded
            }
            TransportError::Transport(kind) => RpcError::Transport(kind.to_string()),
            other => RpcError::ProviderError(other.to_string()),
        }
    }
}

/// Configuration for retry behavior.
///
/// The default performs no retries; failures surface to the caller, who
/// decides whether to ask again.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry)
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let delay = Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Execute an async operation with retry logic. Every retry is logged.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, RpcError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RpcError>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt);
            tracing::warn!(
                "RPC retry {}/{} for '{}' in {:?}",
                attempt,
                config.max_retries,
                operation_name,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        "RPC '{}' succeeded after {} retries",
                        operation_name,
                        attempt
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if e.is_retryable() && attempt < config.max_retries {
                    tracing::warn!(
                        "RPC '{}' failed (attempt {}/{}): {}",
                        operation_name,
                        attempt + 1,
                        config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                } else {
                    if attempt > 0 {
                        tracing::error!(
                            "RPC '{}' failed after {} attempts: {}",
                            operation_name,
                            attempt + 1,
                            e
                        );
                    }
                    return Err(e);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| RpcError::ProviderError("Unknown error".to_string())))
}

pub type StandardRateLimiter =
    RateLimiter<NotKeyed, InMemoryState, QuantaClock, NoOpMiddleware<QuantaInstant>>;

#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub url: Url,
    pub rate_limit: Option<RateLimitConfig>,
    pub retry: RetryConfig,
    /// How often `wait_for_receipt` polls `eth_getTransactionReceipt`.
    pub receipt_poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: NonZeroU32,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl RateLimitConfig {
    pub fn per_second(requests_per_second: NonZeroU32) -> Self {
        Self {
            requests_per_second,
            jitter_min_ms: 5,
            jitter_max_ms: 50,
        }
    }
}

impl RpcClientConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            rate_limit: None,
            retry: RetryConfig::default(),
            receipt_poll_interval: Duration::from_secs(2),
        }
    }

    /// Applies the `network.rpc` section of the app config.
    pub fn with_settings(mut self, settings: &RpcSettings) -> Self {
        self.rate_limit = settings
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(RateLimitConfig::per_second);
        self.retry = RetryConfig::new(settings.max_retries);
        self.receipt_poll_interval = settings.receipt_poll_interval();
        self
    }
}

/// Alloy-backed HTTP client implementing [`ChainProvider`].
pub struct RpcClient {
    provider: RootProvider<Ethereum>,
    config: RpcClientConfig,
    rate_limiter: Option<Arc<StandardRateLimiter>>,
    jitter: Option<Jitter>,
}

impl RpcClient {
    pub fn new(config: RpcClientConfig) -> Result<Self, RpcError> {
        let provider = RootProvider::<Ethereum>::new_http(config.url.clone());

        let (rate_limiter, jitter) = if let Some(ref rate_config) = config.rate_limit {
            let quota = Quota::per_second(rate_config.requests_per_second);
            let limiter = RateLimiter::direct(quota);
            let jitter = Jitter::new(
                Duration::from_millis(rate_config.jitter_min_ms),
                Duration::from_millis(rate_config.jitter_max_ms),
            );
            (Some(Arc::new(limiter)), Some(jitter))
        } else {
            (None, None)
        };

        Ok(Self {
            provider,
            config,
            rate_limiter,
            jitter,
        })
    }

    pub fn from_url(url: &str) -> Result<Self, RpcError> {
        let url = Url::parse(url).map_err(|e| RpcError::InvalidUrl(e.to_string()))?;
        Self::new(RpcClientConfig::new(url))
    }

    pub fn from_settings(url: &str, settings: &RpcSettings) -> Result<Self, RpcError> {
        let url = Url::parse(url).map_err(|e| RpcError::InvalidUrl(e.to_string()))?;
        Self::new(RpcClientConfig::new(url).with_settings(settings))
    }

    pub fn config(&self) -> &RpcClientConfig {
        &self.config
    }

    async fn wait_for_rate_limit(&self) {
        if let (Some(limiter), Some(jitter)) = (&self.rate_limiter, &self.jitter) {
            limiter.until_ready_with_jitter(*jitter).await;
        }
    }

    async fn fetch_transaction(&self, hash: B256) -> Result<Option<Transaction>, RpcError> {
        let op_name = format!("eth_getTransactionByHash({:?})", hash);
        with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_transaction_by_hash(hash)
                .await
                .map_err(RpcError::from)
        })
        .await
    }

    async fn fetch_receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, RpcError> {
        let op_name = format!("eth_getTransactionReceipt({:?})", hash);
        with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_transaction_receipt(hash)
                .await
                .map_err(RpcError::from)
        })
        .await
    }

    async fn poll_receipt(&self, hash: B256) -> Result<ChainReceipt, RpcError> {
        loop {
            if let Some(receipt) = self.fetch_receipt(hash).await? {
                return Ok(convert_receipt(&receipt));
            }
            tracing::debug!(
                "No receipt yet for {:?}, polling again in {:?}",
                hash,
                self.config.receipt_poll_interval
            );
            tokio::time::sleep(self.config.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainProvider for RpcClient {
    async fn get_transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, RpcError> {
        Ok(self.fetch_transaction(hash).await?.map(|tx| convert_transaction(&tx)))
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, RpcError> {
        Ok(self.fetch_receipt(hash).await?.map(|r| convert_receipt(&r)))
    }

    async fn get_block(&self, number: u64) -> Result<Option<ChainBlock>, RpcError> {
        let op_name = format!("eth_getBlockByNumber({})", number);
        let block = with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .get_block(BlockId::number(number))
                .await
                .map_err(RpcError::from)
        })
        .await?;

        Ok(block.map(|b| ChainBlock {
            number: b.header.number,
            timestamp: b.header.timestamp,
        }))
    }

    async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> Result<ChainReceipt, RpcError> {
        tokio::time::timeout(timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| RpcError::Timeout {
                operation: format!("receipt of {:?}", hash),
                after: timeout,
            })?
    }

    async fn call(&self, contract: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let tx = TransactionRequest::default()
            .to(contract)
            .input(TransactionInput::new(data));
        let op_name = format!("eth_call(to={:?})", contract);
        with_retry(&self.config.retry, &op_name, || async {
            self.wait_for_rate_limit().await;
            self.provider
                .call(tx.clone())
                .block(BlockId::latest())
                .await
                .map_err(RpcError::from)
        })
        .await
    }
}

fn convert_transaction(tx: &Transaction) -> ChainTransaction {
    ChainTransaction {
        hash: TransactionResponse::tx_hash(tx),
        from: TransactionResponse::from(tx),
        to: alloy::consensus::Transaction::to(tx),
        value: alloy::consensus::Transaction::value(tx),
        gas_price: alloy::consensus::Transaction::gas_price(tx),
        block_number: TransactionResponse::block_number(tx),
    }
}

fn convert_receipt(receipt: &TransactionReceipt) -> ChainReceipt {
    let inner = &receipt.inner;
    ChainReceipt {
        transaction_hash: receipt.transaction_hash,
        success: inner.status(),
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        logs: inner.logs().iter().map(convert_log).collect(),
    }
}

fn convert_log(log: &Log) -> RawLog {
    RawLog {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        log_index: log.log_index,
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}
