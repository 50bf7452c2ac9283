//! The wallet seam. Keys and signing live behind this trait.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("Signer rejected the transfer: {0}")]
    Rejected(String),

    #[error("Signer failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait TransferSigner: Send + Sync {
    /// The connected account, `None` while disconnected. Every account switch
    /// is published on this channel.
    fn accounts(&self) -> watch::Receiver<Option<Address>>;

    /// Sends `amount` smallest units of `token` to `to` and returns the
    /// transaction hash as soon as the network accepts it.
    async fn send_transfer(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<B256, SignerError>;
}
