pub mod chain;
pub mod indexer;
pub mod subgraph;
pub mod tokens;

pub use chain::{NetworkConfig, RpcSettings};
pub use indexer::AppConfig;
pub use subgraph::SubgraphConfig;
pub use tokens::TokenConfig;
