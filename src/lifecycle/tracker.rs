//! Drives one local transfer from submission to a terminal state.
//!
//! The tracker owns at most one in-flight [`TransferAttempt`]. Methods take
//! `&mut self`, so a second submission cannot race the first; state checks
//! reject it while an attempt is still open.
//!
//! Dropping the future returned by [`TransferLifecycleTracker::await_confirmation`]
//! stops waiting without touching state: the attempt stays
//! `AwaitingConfirmation` and can be awaited again. The network transaction
//! itself is never revoked.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use serde::Serialize;
use tokio::sync::watch;

use super::error::TransferError;
use super::signer::TransferSigner;
use crate::query::DecimalsCache;
use crate::rpc::ChainProvider;
use crate::types::config::AppConfig;
use crate::types::validation::parse_address;
use crate::types::{TransferAttempt, ValidationError};
use crate::units::parse_units;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackerState {
    Idle,
    /// Handed to the signer; no hash yet.
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl TrackerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackerState::Confirmed | TrackerState::Failed)
    }
}

pub struct TransferLifecycleTracker {
    signer: Arc<dyn TransferSigner>,
    provider: Arc<dyn ChainProvider>,
    decimals: Arc<DecimalsCache>,
    token: Address,
    receipt_timeout: Duration,
    accounts: watch::Receiver<Option<Address>>,
    state: TrackerState,
    attempt: Option<TransferAttempt>,
    history: Vec<TransferAttempt>,
}

impl TransferLifecycleTracker {
    pub fn new(
        signer: Arc<dyn TransferSigner>,
        provider: Arc<dyn ChainProvider>,
        decimals: Arc<DecimalsCache>,
        token: Address,
        receipt_timeout: Duration,
    ) -> Self {
        let accounts = signer.accounts();
        Self {
            signer,
            provider,
            decimals,
            token,
            receipt_timeout,
            accounts,
            state: TrackerState::Idle,
            attempt: None,
            history: Vec::new(),
        }
    }

    /// Tracks transfers of the configured token, waiting at most
    /// `network.rpc.receipt_timeout_secs` for each receipt.
    pub fn from_config(
        signer: Arc<dyn TransferSigner>,
        provider: Arc<dyn ChainProvider>,
        decimals: Arc<DecimalsCache>,
        config: &AppConfig,
    ) -> Self {
        Self::new(
            signer,
            provider,
            decimals,
            config.token.address,
            config.network.rpc.receipt_timeout(),
        )
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// The open attempt, if any.
    pub fn attempt(&self) -> Option<&TransferAttempt> {
        self.attempt.as_ref()
    }

    /// Acknowledged attempts, oldest first.
    pub fn history(&self) -> &[TransferAttempt] {
        &self.history
    }

    pub fn current_account(&self) -> Option<Address> {
        *self.accounts.borrow()
    }

    /// Waits for the signer to switch accounts. Returns `None` once the
    /// signer is gone.
    pub async fn account_changed(&mut self) -> Option<Option<Address>> {
        self.accounts.changed().await.ok()?;
        let account = *self.accounts.borrow_and_update();
        tracing::info!("Signer account changed to {:?}", account);
        Some(account)
    }

    /// Validates and submits a transfer of `amount` (a human decimal string)
    /// to `recipient`.
    ///
    /// Validation failures leave the tracker `Idle`. A signer rejection
    /// records the attempt as `Failed` and returns the signer's error.
    pub async fn submit(
        &mut self,
        recipient: &str,
        amount: &str,
    ) -> Result<&TransferAttempt, TransferError> {
        if self.state != TrackerState::Idle {
            return Err(TransferError::Busy(self.state));
        }

        let from = self
            .current_account()
            .ok_or(ValidationError::SignerNotConnected)?;
        let to = parse_address(recipient)?;
        let decimals = self.decimals.decimals(self.token).await?;
        let requested = parse_units(amount, decimals)?;
        if requested.is_zero() {
            return Err(ValidationError::NonPositiveAmount(amount.trim().to_string()).into());
        }

        tracing::info!(
            "Submitting transfer of {} ({} units) from {} to {}",
            amount.trim(),
            requested,
            from,
            to
        );
        self.state = TrackerState::Submitting;
        let attempt = self
            .attempt
            .insert(TransferAttempt::submitted(from, to, requested, amount.trim()));

        match self.signer.send_transfer(self.token, to, requested).await {
            Ok(hash) => {
                attempt.mark_pending(hash);
                self.state = TrackerState::AwaitingConfirmation;
                tracing::info!("Transfer submitted as {:#x}", hash);
                Ok(&*attempt)
            }
            Err(e) => {
                attempt.mark_failed(e.to_string());
                self.state = TrackerState::Failed;
                tracing::warn!("Transfer rejected by signer: {}", e);
                Err(e.into())
            }
        }
    }

    /// Waits for the receipt of the submitted transfer.
    ///
    /// A receipt moves the attempt to `Confirmed` or, if it reverted, to
    /// `Failed`. A provider error or timeout also ends in `Failed`, with the
    /// cause kept on the attempt and returned to the caller.
    pub async fn await_confirmation(&mut self) -> Result<&TransferAttempt, TransferError> {
        if self.state != TrackerState::AwaitingConfirmation {
            return Err(TransferError::NotAwaiting(self.state));
        }
        let Some(attempt) = self.attempt.as_mut() else {
            return Err(TransferError::NotAwaiting(self.state));
        };
        let Some(hash) = attempt.hash() else {
            return Err(TransferError::NotAwaiting(self.state));
        };

        match self.provider.wait_for_receipt(hash, self.receipt_timeout).await {
            Ok(receipt) if receipt.success => {
                attempt.mark_confirmed(
                    receipt.block_number,
                    receipt.gas_used,
                    receipt.effective_gas_price,
                );
                self.state = TrackerState::Confirmed;
                tracing::info!(
                    "Transfer {:#x} confirmed in block {:?}",
                    hash,
                    receipt.block_number
                );
                Ok(&*attempt)
            }
            Ok(receipt) => {
                attempt.mark_reverted(
                    receipt.block_number,
                    receipt.gas_used,
                    receipt.effective_gas_price,
                );
                self.state = TrackerState::Failed;
                tracing::warn!("Transfer {:#x} reverted", hash);
                Ok(&*attempt)
            }
            Err(source) => {
                attempt.mark_failed(source.to_string());
                self.state = TrackerState::Failed;
                tracing::warn!("Lost track of transfer {:#x}: {}", hash, source);
                Err(TransferError::Provider {
                    operation: "wait_for_receipt",
                    source,
                })
            }
        }
    }

    /// Archives a finished attempt and returns the tracker to `Idle`.
    pub fn acknowledge(&mut self) -> Result<Option<&TransferAttempt>, TransferError> {
        match self.state {
            TrackerState::Idle => Ok(None),
            state if state.is_terminal() => {
                self.state = TrackerState::Idle;
                match self.attempt.take() {
                    Some(attempt) => {
                        self.history.push(attempt);
                        Ok(self.history.last())
                    }
                    None => Ok(None),
                }
            }
            state => Err(TransferError::Busy(state)),
        }
    }
}

impl std::fmt::Debug for TransferLifecycleTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferLifecycleTracker")
            .field("token", &self.token)
            .field("state", &self.state)
            .field("attempt", &self.attempt)
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use alloy::primitives::{address, B256, U256};
    use async_trait::async_trait;

    use super::*;
    use crate::lifecycle::SignerError;
    use crate::rpc::mock::MockProvider;
    use crate::rpc::{ChainReceipt, RpcError};
    use crate::types::TransferStatus;

    const TOKEN: Address = address!("1c7D4B196Cb0C7B01d743Fbc6116a902379C7238");
    const ACCOUNT: Address = address!("00000000000000000000000000000000000a11ce");
    const RECIPIENT: &str = "0x0000000000000000000000000000000000000b0b";

    struct MockSigner {
        accounts: watch::Sender<Option<Address>>,
        reply: Mutex<Result<B256, SignerError>>,
        sends: AtomicUsize,
    }

    impl MockSigner {
        fn connected() -> Self {
            Self {
                accounts: watch::Sender::new(Some(ACCOUNT)),
                reply: Mutex::new(Ok(B256::repeat_byte(0xab))),
                sends: AtomicUsize::new(0),
            }
        }

        fn rejecting(reason: &str) -> Self {
            let signer = Self::connected();
            *signer.reply.lock().unwrap() = Err(SignerError::Rejected(reason.to_string()));
            signer
        }
    }

    #[async_trait]
    impl TransferSigner for MockSigner {
        fn accounts(&self) -> watch::Receiver<Option<Address>> {
            self.accounts.subscribe()
        }

        async fn send_transfer(
            &self,
            token: Address,
            _to: Address,
            _amount: U256,
        ) -> Result<B256, SignerError> {
            assert_eq!(token, TOKEN);
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.reply.lock().unwrap().clone()
        }
    }

    fn receipt(success: bool) -> ChainReceipt {
        ChainReceipt {
            transaction_hash: B256::repeat_byte(0xab),
            success,
            block_number: Some(100),
            gas_used: 45_000,
            effective_gas_price: 3_000_000_000,
            logs: vec![],
        }
    }

    fn tracker(signer: Arc<MockSigner>, provider: Arc<MockProvider>) -> TransferLifecycleTracker {
        let decimals = Arc::new(DecimalsCache::new(provider.clone()));
        TransferLifecycleTracker::new(signer, provider, decimals, TOKEN, Duration::from_secs(5))
    }

    fn usdc_provider() -> Arc<MockProvider> {
        Arc::new(MockProvider::new().with_decimals(TOKEN, 6))
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected_and_stays_idle() {
        let signer = Arc::new(MockSigner::connected());
        let mut tracker = tracker(signer.clone(), usdc_provider());

        let err = tracker.submit(RECIPIENT, "0").await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::Validation(ValidationError::NonPositiveAmount(_))
        ));
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.attempt().is_none());
        assert_eq!(signer.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let mut tracker = tracker(Arc::new(MockSigner::connected()), usdc_provider());

        assert!(matches!(
            tracker.submit("0x1234", "1").await,
            Err(TransferError::Validation(ValidationError::MalformedAddress(_)))
        ));
        assert!(matches!(
            tracker.submit(RECIPIENT, "-1").await,
            Err(TransferError::Validation(ValidationError::NonPositiveAmount(_)))
        ));
        assert!(matches!(
            tracker.submit(RECIPIENT, "1.0000001").await,
            Err(TransferError::Validation(ValidationError::TooManyDecimals { decimals: 6, .. }))
        ));
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[tokio::test]
    async fn test_requires_connected_account() {
        let signer = Arc::new(MockSigner::connected());
        let mut tracker = tracker(signer.clone(), usdc_provider());

        signer.accounts.send_replace(None);

        assert!(matches!(
            tracker.submit(RECIPIENT, "1").await,
            Err(TransferError::Validation(ValidationError::SignerNotConnected))
        ));
    }

    #[tokio::test]
    async fn test_confirmed_transfer() {
        let provider = usdc_provider();
        let mut tracker = tracker(Arc::new(MockSigner::connected()), provider.clone());

        let attempt = tracker.submit(RECIPIENT, "1.5").await.unwrap();
        assert_eq!(attempt.status(), TransferStatus::Pending);
        assert_eq!(attempt.hash(), Some(B256::repeat_byte(0xab)));
        assert_eq!(attempt.requested_amount(), U256::from(1_500_000u64));
        assert_eq!(attempt.entered_amount(), "1.5");
        assert_eq!(attempt.from(), ACCOUNT);
        assert_eq!(tracker.state(), TrackerState::AwaitingConfirmation);

        provider.set_receipt(receipt(true));
        let attempt = tracker.await_confirmation().await.unwrap();

        assert_eq!(attempt.status(), TransferStatus::Confirmed);
        assert_eq!(attempt.block_number(), Some(100));
        assert_eq!(attempt.gas_used(), Some(45_000));
        assert_eq!(attempt.gas_price(), Some(3_000_000_000));
        assert_eq!(tracker.state(), TrackerState::Confirmed);
    }

    #[tokio::test]
    async fn test_reverted_transfer_fails() {
        let provider = usdc_provider();
        let mut tracker = tracker(Arc::new(MockSigner::connected()), provider.clone());

        tracker.submit(RECIPIENT, "2").await.unwrap();
        provider.set_receipt(receipt(false));
        let attempt = tracker.await_confirmation().await.unwrap();

        assert_eq!(attempt.status(), TransferStatus::Failed);
        assert_eq!(attempt.failure(), Some("transaction reverted"));
        assert_eq!(attempt.block_number(), Some(100));
        assert_eq!(tracker.state(), TrackerState::Failed);
    }

    #[tokio::test]
    async fn test_timeout_fails_with_cause() {
        let mut tracker = tracker(Arc::new(MockSigner::connected()), usdc_provider());

        tracker.submit(RECIPIENT, "2").await.unwrap();
        let err = tracker.await_confirmation().await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::Provider {
                source: RpcError::Timeout { .. },
                ..
            }
        ));
        assert_eq!(tracker.state(), TrackerState::Failed);
        let attempt = tracker.attempt().unwrap();
        assert_eq!(attempt.status(), TransferStatus::Failed);
        assert!(attempt.failure().unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_provider_error_fails_with_cause() {
        let provider = Arc::new(
            MockProvider::new()
                .with_decimals(TOKEN, 6)
                .with_wait_error("connection refused"),
        );
        let mut tracker = tracker(Arc::new(MockSigner::connected()), provider);

        tracker.submit(RECIPIENT, "2").await.unwrap();
        assert!(tracker.await_confirmation().await.is_err());

        let attempt = tracker.attempt().unwrap();
        assert!(attempt.failure().unwrap().contains("connection refused"));
        // The hash survives so the caller can look the transaction up later
        assert_eq!(attempt.hash(), Some(B256::repeat_byte(0xab)));
    }

    #[tokio::test]
    async fn test_second_submit_is_busy() {
        let signer = Arc::new(MockSigner::connected());
        let mut tracker = tracker(signer.clone(), usdc_provider());

        tracker.submit(RECIPIENT, "1").await.unwrap();
        let err = tracker.submit(RECIPIENT, "1").await.unwrap_err();

        assert!(matches!(
            err,
            TransferError::Busy(TrackerState::AwaitingConfirmation)
        ));
        assert_eq!(signer.sends.load(Ordering::SeqCst), 1);
        assert!(matches!(tracker.acknowledge(), Err(TransferError::Busy(_))));
    }

    #[tokio::test]
    async fn test_signer_rejection_fails_attempt() {
        let mut tracker = tracker(
            Arc::new(MockSigner::rejecting("user denied")),
            usdc_provider(),
        );

        let err = tracker.submit(RECIPIENT, "1").await.unwrap_err();

        assert!(matches!(err, TransferError::Signer(SignerError::Rejected(_))));
        assert_eq!(tracker.state(), TrackerState::Failed);
        let attempt = tracker.attempt().unwrap();
        assert_eq!(attempt.hash(), None);
        assert!(attempt.failure().unwrap().contains("user denied"));
    }

    #[tokio::test]
    async fn test_acknowledge_archives_and_resets() {
        let provider = usdc_provider();
        let mut tracker = tracker(Arc::new(MockSigner::connected()), provider.clone());

        assert!(tracker.acknowledge().unwrap().is_none());

        tracker.submit(RECIPIENT, "1").await.unwrap();
        provider.set_receipt(receipt(true));
        tracker.await_confirmation().await.unwrap();

        let archived = tracker.acknowledge().unwrap().unwrap();
        assert_eq!(archived.status(), TransferStatus::Confirmed);
        assert_eq!(tracker.state(), TrackerState::Idle);
        assert!(tracker.attempt().is_none());
        assert_eq!(tracker.history().len(), 1);

        tracker.submit(RECIPIENT, "3").await.unwrap();
        assert_eq!(tracker.state(), TrackerState::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn test_dropped_wait_can_be_resumed() {
        let provider = Arc::new(
            MockProvider::new()
                .with_decimals(TOKEN, 6)
                .with_wait_delay(Duration::from_millis(100)),
        );
        let mut tracker = tracker(Arc::new(MockSigner::connected()), provider.clone());
        tracker.submit(RECIPIENT, "1").await.unwrap();

        let waited =
            tokio::time::timeout(Duration::from_millis(5), tracker.await_confirmation()).await;
        assert!(waited.is_err());
        assert_eq!(tracker.state(), TrackerState::AwaitingConfirmation);
        assert_eq!(
            tracker.attempt().unwrap().status(),
            TransferStatus::Pending
        );

        provider.set_receipt(receipt(true));
        let attempt = tracker.await_confirmation().await.unwrap();

        assert_eq!(attempt.status(), TransferStatus::Confirmed);
        assert_eq!(tracker.state(), TrackerState::Confirmed);
        assert_eq!(provider.wait_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_from_config_uses_configured_token() {
        let config = AppConfig::from_json(
            r#"{
                "network": {
                    "name": "sepolia",
                    "chain_id": 11155111,
                    "rpc_url_env_var": "SEPOLIA_RPC_URL",
                    "explorer_tx_base": "https://sepolia.etherscan.io/tx/",
                    "rpc": { "receipt_timeout_secs": 1 }
                },
                "token": {
                    "address": "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
                    "symbol": "USDC"
                },
                "subgraph": { "endpoint": "https://example.com/subgraphs/token" }
            }"#,
        )
        .unwrap();
        let provider = usdc_provider();
        let decimals = Arc::new(DecimalsCache::new(provider.clone()));
        let mut tracker = TransferLifecycleTracker::from_config(
            Arc::new(MockSigner::connected()),
            provider,
            decimals,
            &config,
        );

        let attempt = tracker.submit(RECIPIENT, "0.5").await.unwrap();
        assert_eq!(attempt.requested_amount(), U256::from(500_000u64));

        match tracker.await_confirmation().await {
            Err(TransferError::Provider {
                source: RpcError::Timeout { after, .. },
                ..
            }) => assert_eq!(after, Duration::from_secs(1)),
            other => panic!("expected receipt timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_await_without_submission() {
        let mut tracker = tracker(Arc::new(MockSigner::connected()), usdc_provider());

        assert!(matches!(
            tracker.await_confirmation().await,
            Err(TransferError::NotAwaiting(TrackerState::Idle))
        ));
    }

    #[tokio::test]
    async fn test_follows_account_changes() {
        let other = address!("00000000000000000000000000000000000c0ffe");
        let signer = Arc::new(MockSigner::connected());
        let mut tracker = tracker(signer.clone(), usdc_provider());
        assert_eq!(tracker.current_account(), Some(ACCOUNT));

        signer.accounts.send_replace(Some(other));

        assert_eq!(tracker.account_changed().await, Some(Some(other)));
        assert_eq!(tracker.current_account(), Some(other));

        tracker.submit(RECIPIENT, "1").await.unwrap();
        assert_eq!(tracker.attempt().unwrap().from(), other);
    }

    #[tokio::test]
    async fn test_decimals_are_cached_across_submissions() {
        let provider = usdc_provider();
        let mut tracker = tracker(Arc::new(MockSigner::connected()), provider.clone());

        tracker.submit(RECIPIENT, "1").await.unwrap();
        provider.set_receipt(receipt(true));
        tracker.await_confirmation().await.unwrap();
        tracker.acknowledge().unwrap();
        tracker.submit(RECIPIENT, "2").await.unwrap();

        assert_eq!(provider.call_count.load(Ordering::SeqCst), 1);
    }
}
