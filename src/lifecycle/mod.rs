mod error;
mod signer;
mod tracker;

pub use error::TransferError;
pub use signer::{SignerError, TransferSigner};
pub use tracker::{TrackerState, TransferLifecycleTracker};
