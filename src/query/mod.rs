mod calls;
mod decimals;
mod service;

pub use calls::{CallError, FunctionCall};
pub use decimals::{DecimalsCache, DecimalsError};
pub use service::{ChainQueryService, LookupError, TransactionLookup, TransferValue, TxStatus};
