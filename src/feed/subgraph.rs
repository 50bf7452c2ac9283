//! GraphQL client for the token's subgraph.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use super::normalizer::IndexerRecord;
use crate::types::config::SubgraphConfig;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Indexer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Indexer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Indexer query failed: {0}")]
    Query(String),

    #[error("Unexpected indexer response: {0}")]
    Decode(String),
}

/// Read access to an indexer that already aggregates the token's events.
#[async_trait]
pub trait IndexerProvider: Send + Sync {
    /// Latest approvals and burns, one record per entity.
    async fn fetch_latest(&self) -> Result<Vec<IndexerRecord>, IndexerError>;
}

pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    approvals_page_size: u32,
    burns_page_size: u32,
}

impl SubgraphClient {
    pub fn new(config: &SubgraphConfig, api_key: Option<String>) -> Result<Self, IndexerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: api_key.filter(|key| !key.is_empty()),
            approvals_page_size: config.approvals_page_size,
            burns_page_size: config.burns_page_size,
        })
    }

    pub fn query(&self) -> String {
        format!(
            "{{ approvals(first: {}) {{ id owner spender value }} burnByOwners(first: {}) {{ id from amount blockNumber }} }}",
            self.approvals_page_size, self.burns_page_size
        )
    }
}

#[async_trait]
impl IndexerProvider for SubgraphClient {
    async fn fetch_latest(&self) -> Result<Vec<IndexerRecord>, IndexerError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": self.query() }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let records = records_from_response(body)?;
        tracing::debug!("Fetched {} records from {}", records.len(), self.endpoint);
        Ok(records)
    }
}

impl std::fmt::Debug for SubgraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubgraphClient")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

/// Flattens a GraphQL response `{ data: { <entity>: [..] } }` into records.
/// A non-empty `errors` array fails the whole fetch.
fn records_from_response(body: Value) -> Result<Vec<IndexerRecord>, IndexerError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(IndexerError::Query(messages.join("; ")));
        }
    }

    let data = body
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| IndexerError::Decode("missing 'data' object".to_string()))?;

    let mut records = Vec::new();
    for (entity, items) in data {
        let Some(items) = items.as_array() else {
            tracing::debug!("Skipping non-list field '{}' in indexer response", entity);
            continue;
        };
        records.extend(
            items
                .iter()
                .map(|item| IndexerRecord::new(entity.clone(), item.clone())),
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SubgraphConfig {
        SubgraphConfig {
            endpoint: "https://example.com/subgraphs/token".to_string(),
            api_key_env_var: None,
            approvals_page_size: 5,
            burns_page_size: 10,
        }
    }

    #[test]
    fn test_query_uses_page_sizes() {
        let client = SubgraphClient::new(&config(), Some(String::new())).unwrap();
        let query = client.query();

        assert!(query.contains("approvals(first: 5) { id owner spender value }"));
        assert!(query.contains("burnByOwners(first: 10) { id from amount blockNumber }"));
        assert!(client.api_key.is_none());
    }

    #[test]
    fn test_records_from_response() {
        let body = json!({
            "data": {
                "approvals": [
                    { "id": "0x01", "owner": "0xaa", "spender": "0xbb", "value": "1" },
                    { "id": "0x02", "owner": "0xaa", "spender": "0xbb", "value": "2" }
                ],
                "burnByOwners": [
                    { "id": "0x03", "from": "0xaa", "amount": "3", "blockNumber": "10" }
                ]
            }
        });

        let records = records_from_response(body).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records.iter().filter(|r| r.entity == "approvals").count(),
            2
        );
        assert!(records
            .iter()
            .any(|r| r.entity == "burnByOwners" && r.payload["amount"] == "3"));
    }

    #[test]
    fn test_graphql_errors_surface() {
        let body = json!({
            "data": null,
            "errors": [{ "message": "Type `Query` has no field `burnByOwners`" }]
        });

        match records_from_response(body) {
            Err(IndexerError::Query(msg)) => assert!(msg.contains("burnByOwners")),
            other => panic!("expected query error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_is_decode_error() {
        assert!(matches!(
            records_from_response(json!({ "unexpected": true })),
            Err(IndexerError::Decode(_))
        ));
    }
}
