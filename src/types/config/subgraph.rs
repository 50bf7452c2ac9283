use serde::Deserialize;

fn default_approvals_page_size() -> u32 {
    5
}

fn default_burns_page_size() -> u32 {
    10
}

/// Indexer (subgraph) endpoint and query shape.
#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphConfig {
    pub endpoint: String,
    /// Env var holding an optional bearer key for the hosted endpoint.
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_approvals_page_size")]
    pub approvals_page_size: u32,
    #[serde(default = "default_burns_page_size")]
    pub burns_page_size: u32,
}
