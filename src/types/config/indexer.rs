use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::types::config::chain::NetworkConfig;
use crate::types::config::subgraph::SubgraphConfig;
use crate::types::config::tokens::TokenConfig;

/// Top-level configuration, read from `config/config.json`.
///
/// Endpoints and explorer prefixes are data here so one binary can serve
/// several networks; secrets stay in env vars named by the config.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub token: TokenConfig,
    pub subgraph: SubgraphConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_json::from_str(content)?;
        anyhow::ensure!(
            !config.network.explorer_tx_base.is_empty(),
            "network.explorer_tx_base must not be empty"
        );
        Ok(config)
    }

    /// Env vars that must be present before any RPC or indexer call.
    pub fn required_env_vars(&self) -> Vec<&str> {
        vec![self.network.rpc_url_env_var.as_str()]
    }
}
