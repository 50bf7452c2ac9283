#[cfg(test)]
pub(crate) mod mock;
mod provider;
mod rpc;

pub use provider::{ChainBlock, ChainProvider, ChainReceipt, ChainTransaction, RawLog};
pub use rpc::{with_retry, RetryConfig, RpcClient, RpcClientConfig, RpcError};
