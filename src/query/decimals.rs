use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::calls::FunctionCall;
use crate::rpc::{ChainProvider, RpcError};

static DECIMALS_CALL: LazyLock<Result<FunctionCall, super::calls::CallError>> =
    LazyLock::new(|| FunctionCall::parse("decimals()(uint8)"));

#[derive(Debug, Error)]
pub enum DecimalsError {
    #[error("decimals() call to {token} failed: {source}")]
    Rpc {
        token: Address,
        #[source]
        source: RpcError,
    },

    #[error("decimals() on {token} returned unusable data: {reason}")]
    InvalidResponse { token: Address, reason: String },
}

/// Per-token `decimals()` cache shared by every lookup and the tracker.
///
/// Each token gets one [`OnceCell`]; concurrent misses for the same token wait
/// on the first caller's fetch instead of issuing their own. A failed fetch
/// leaves the cell empty so the next caller tries again.
pub struct DecimalsCache {
    provider: Arc<dyn ChainProvider>,
    slots: Mutex<HashMap<Address, Arc<OnceCell<u8>>>>,
}

impl DecimalsCache {
    pub fn new(provider: Arc<dyn ChainProvider>) -> Self {
        Self {
            provider,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds a token's decimals from configuration. Later lookups never hit
    /// the chain for it.
    pub fn pin(&self, token: Address, decimals: u8) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(token, Arc::new(OnceCell::new_with(Some(decimals))));
    }

    /// Returns the cached value without touching the network.
    pub fn cached(&self, token: Address) -> Option<u8> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(&token).and_then(|cell| cell.get().copied())
    }

    pub async fn decimals(&self, token: Address) -> Result<u8, DecimalsError> {
        let cell = self.slot(token);
        let decimals = cell
            .get_or_try_init(|| self.fetch(token))
            .await?;
        Ok(*decimals)
    }

    fn slot(&self, token: Address) -> Arc<OnceCell<u8>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(token).or_default().clone()
    }

    async fn fetch(&self, token: Address) -> Result<u8, DecimalsError> {
        let call = DECIMALS_CALL
            .as_ref()
            .map_err(|e| DecimalsError::InvalidResponse {
                token,
                reason: e.to_string(),
            })?;

        let output = self
            .provider
            .call(token, call.calldata(&[]))
            .await
            .map_err(|source| DecimalsError::Rpc { token, source })?;

        let values = call
            .decode_output(&output)
            .map_err(|e| DecimalsError::InvalidResponse {
                token,
                reason: e.to_string(),
            })?;

        let decimals = match values.first() {
            Some(DynSolValue::Uint(value, _)) => u8::try_from(*value).ok(),
            _ => None,
        }
        .ok_or_else(|| DecimalsError::InvalidResponse {
            token,
            reason: format!("{:?}", values),
        })?;

        tracing::debug!("Fetched decimals for token {}: {}", token, decimals);
        Ok(decimals)
    }
}

impl std::fmt::Debug for DecimalsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("DecimalsCache")
            .field("tokens", &slots.len())
            .finish()
    }
}
