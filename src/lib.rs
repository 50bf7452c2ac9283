//! Reconciles one token's activity across an RPC node and a subgraph indexer.
//!
//! * [`query`] looks up single transactions and decodes their `Transfer` log.
//! * [`lifecycle`] tracks a locally submitted transfer until it confirms or fails.
//! * [`feed`] normalizes indexer entities and merges them with chain-derived
//!   rows into one filterable feed.

pub mod decoding;
pub mod feed;
pub mod lifecycle;
pub mod query;
pub mod rpc;
pub mod types;
pub mod units;
