use thiserror::Error;

use super::signer::SignerError;
use super::tracker::TrackerState;
use crate::query::DecimalsError;
use crate::rpc::RpcError;
use crate::types::ValidationError;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A transfer is already in flight ({0:?})")]
    Busy(TrackerState),

    #[error("No transfer is awaiting confirmation ({0:?})")]
    NotAwaiting(TrackerState),

    #[error("Could not resolve token decimals: {0}")]
    Decimals(#[from] DecimalsError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error("{operation} failed: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: RpcError,
    },
}
