use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tx_reconciler::feed::{refresh_feed, EventNormalizer, FeedReconciler, SubgraphClient};
use tx_reconciler::query::{ChainQueryService, DecimalsCache};
use tx_reconciler::rpc::{ChainProvider, RpcClient};
use tx_reconciler::types::config::AppConfig;
use tx_reconciler::types::validation::parse_tx_hash;
use tx_reconciler::types::CanonicalRow;

const USAGE: &str = "usage: tx-reconciler lookup <tx-hash> | feed [query] [--tx <tx-hash>]...";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let config = AppConfig::load(Path::new("config/config.json"))?;
    load_required_env_vars(&config)?;

    tracing::info!(
        "Loaded config for {} (chain {}), token {}",
        config.network.name,
        config.network.chain_id,
        config.token.symbol
    );

    let rpc_url = env::var(&config.network.rpc_url_env_var)
        .with_context(|| format!("{} is not set", config.network.rpc_url_env_var))?;
    let provider: Arc<dyn ChainProvider> = Arc::new(
        RpcClient::from_settings(&rpc_url, &config.network.rpc)
            .context("Failed to build RPC client")?,
    );
    let decimals = Arc::new(DecimalsCache::new(provider.clone()));
    if let Some(pinned) = config.token.decimals {
        decimals.pin(config.token.address, pinned);
    }
    let queries = ChainQueryService::new(provider, decimals);

    match args.first().map(String::as_str) {
        Some("lookup") => {
            let hash = args.get(1).context(USAGE)?;
            run_lookup(&queries, hash).await
        }
        Some("feed") => run_feed(&config, &queries, &args[1..]).await,
        _ => anyhow::bail!(USAGE),
    }
}

async fn run_lookup(queries: &ChainQueryService, hash: &str) -> anyhow::Result<()> {
    let lookup = queries
        .lookup_str(hash)
        .await
        .with_context(|| format!("Lookup of {} failed", hash))?;
    println!("{}", serde_json::to_string_pretty(&lookup)?);
    Ok(())
}

async fn run_feed(
    config: &AppConfig,
    queries: &ChainQueryService,
    args: &[String],
) -> anyhow::Result<()> {
    let mut filter = String::new();
    let mut tx_hashes = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--tx" {
            let hash = iter.next().context(USAGE)?;
            tx_hashes.push(parse_tx_hash(hash)?);
        } else {
            filter = arg.clone();
        }
    }

    let token_decimals = match queries.decimals().decimals(config.token.address).await {
        Ok(decimals) => Some(decimals),
        Err(e) => {
            tracing::warn!("Showing raw {} amounts: {}", config.token.symbol, e);
            None
        }
    };

    let mut chain_rows = Vec::new();
    for (hash, result) in tx_hashes.iter().zip(queries.lookup_all(&tx_hashes).await) {
        match result {
            Ok(lookup) => chain_rows.push(lookup.row),
            Err(e) => tracing::warn!("Skipping {:#x}: {}", hash, e),
        }
    }

    let api_key = config
        .subgraph
        .api_key_env_var
        .as_deref()
        .and_then(|var| env::var(var).ok());
    let indexer = SubgraphClient::new(&config.subgraph, api_key)
        .context("Failed to build subgraph client")?;

    let mut feed = FeedReconciler::new(config.network.explorer_tx_base.clone());
    refresh_feed(
        &mut feed,
        &indexer,
        &EventNormalizer::new(token_decimals),
        chain_rows,
    )
    .await
    .with_context(|| format!("Failed to fetch feed from {}", config.subgraph.endpoint))?;

    let rows = feed.query(&filter);
    for row in &rows {
        print_row(&feed, row);
    }
    tracing::info!("{} of {} rows match {:?}", rows.len(), feed.rows().len(), filter);
    Ok(())
}

fn print_row(feed: &FeedReconciler, row: &CanonicalRow) {
    let address = |a: Option<alloy::primitives::Address>| {
        a.map(|a| format!("{:#x}", a)).unwrap_or_else(|| "-".to_string())
    };
    println!(
        "{:>10}  {:<10} {:>24}  {} -> {}  {}",
        row.block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string()),
        row.kind.as_str(),
        row.amount
            .as_ref()
            .map(|a| a.display())
            .unwrap_or_else(|| "-".to_string()),
        address(row.from),
        address(row.to),
        feed.explorer_url(&row.tx_hash),
    );
}

/// Loads `.env` when the RPC URL (or the optional subgraph key) is not in the
/// environment, then insists on the required vars.
fn load_required_env_vars(config: &AppConfig) -> anyhow::Result<()> {
    let required = config.required_env_vars();
    let optional = config.subgraph.api_key_env_var.as_deref();
    let is_unset = |var: &&str| env::var(var).is_err();

    let missing_required: Vec<&str> = required.iter().copied().filter(is_unset).collect();
    let missing_optional = optional.filter(is_unset);
    if missing_required.is_empty() && missing_optional.is_none() {
        return Ok(());
    }

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded env from {}", path.display()),
        Err(e) if missing_required.is_empty() => {
            tracing::debug!("No .env loaded ({}); subgraph requests go unauthenticated", e);
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Missing env vars {:?} and failed to load .env file", missing_required)
            })
        }
    }

    let still_missing: Vec<&str> = required.iter().copied().filter(is_unset).collect();
    anyhow::ensure!(
        still_missing.is_empty(),
        "Missing required env vars after loading .env: {:?}",
        still_missing
    );
    Ok(())
}
