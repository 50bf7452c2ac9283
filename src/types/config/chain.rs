use std::time::Duration;

use serde::Deserialize;

/// The network the RPC provider and block explorer point at.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    /// Name of the env var holding the RPC URL. The URL itself is a secret.
    pub rpc_url_env_var: String,
    /// Prefix for transaction links, e.g. `https://sepolia.etherscan.io/tx/`.
    pub explorer_tx_base: String,
    #[serde(default)]
    pub rpc: RpcSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    /// Requests per second; `None` disables client-side rate limiting.
    pub requests_per_second: Option<u32>,
    /// Retries per RPC call. Zero means failures surface immediately.
    pub max_retries: u32,
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            requests_per_second: Some(10),
            max_retries: 0,
            receipt_poll_interval_ms: 2_000,
            receipt_timeout_secs: 300,
        }
    }
}

impl RpcSettings {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}
