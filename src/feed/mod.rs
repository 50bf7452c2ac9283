mod normalizer;
mod reconciler;
mod subgraph;

pub use normalizer::{EventNormalizer, IndexerRecord};
pub use reconciler::FeedReconciler;
pub use subgraph::{IndexerError, IndexerProvider, SubgraphClient};

use crate::types::CanonicalRow;

/// Fetches the indexer's latest records and merges them with `chain_rows`
/// into `feed`'s snapshot.
pub async fn refresh_feed(
    feed: &mut FeedReconciler,
    indexer: &dyn IndexerProvider,
    normalizer: &EventNormalizer,
    chain_rows: Vec<CanonicalRow>,
) -> Result<(), IndexerError> {
    let records = indexer.fetch_latest().await?;
    let indexer_rows = normalizer.normalize_all(&records);
    feed.refresh(vec![indexer_rows, chain_rows]);
    Ok(())
}
