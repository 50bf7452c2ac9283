use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{CanonicalRow, RowSource};

/// Holds the current feed snapshot and answers filtered queries over it.
#[derive(Debug, Clone)]
pub struct FeedReconciler {
    explorer_tx_base: String,
    rows: Vec<CanonicalRow>,
}

impl FeedReconciler {
    pub fn new(explorer_tx_base: impl Into<String>) -> Self {
        Self {
            explorer_tx_base: explorer_tx_base.into(),
            rows: Vec::new(),
        }
    }

    /// Replaces the snapshot with the merge of `row_sets`.
    pub fn refresh(&mut self, row_sets: Vec<Vec<CanonicalRow>>) {
        self.rows = Self::merge(row_sets);
        tracing::info!("Feed refreshed with {} rows", self.rows.len());
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn query(&self, q: &str) -> Vec<CanonicalRow> {
        Self::filter(&self.rows, q)
    }

    pub fn explorer_url(&self, tx_hash: &str) -> String {
        if self.explorer_tx_base.ends_with('/') {
            format!("{}{}", self.explorer_tx_base, tx_hash)
        } else {
            format!("{}/{}", self.explorer_tx_base, tx_hash)
        }
    }

    /// Concatenates `row_sets`, drops duplicate ids and sorts newest first.
    ///
    /// On an id collision an indexer row replaces a chain-derived one;
    /// otherwise the first occurrence wins. The survivor keeps the position
    /// of the first occurrence. Rows with an empty id carry no identity and
    /// are never deduplicated. Rows without a block number sort last, and
    /// the sort is stable.
    pub fn merge(row_sets: Vec<Vec<CanonicalRow>>) -> Vec<CanonicalRow> {
        let mut merged: Vec<CanonicalRow> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in row_sets.into_iter().flatten() {
            if row.id.is_empty() {
                merged.push(row);
                continue;
            }
            match positions.get(&row.id) {
                Some(&index) => {
                    let existing = &mut merged[index];
                    if existing.source == RowSource::Chain && row.source == RowSource::Indexer {
                        *existing = row;
                    } else {
                        tracing::debug!("Dropping duplicate row {}", row.id);
                    }
                }
                None => {
                    positions.insert(row.id.clone(), merged.len());
                    merged.push(row);
                }
            }
        }

        merged.sort_by(|a, b| match (a.block_number, b.block_number) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        merged
    }

    /// Case-insensitive substring filter over the row's visible fields.
    /// A blank query returns every row unchanged.
    pub fn filter(rows: &[CanonicalRow], q: &str) -> Vec<CanonicalRow> {
        let needle = q.trim().to_lowercase();
        if needle.is_empty() {
            return rows.to_vec();
        }
        rows.iter()
            .filter(|row| row_matches(row, &needle))
            .cloned()
            .collect()
    }
}

fn row_matches(row: &CanonicalRow, needle: &str) -> bool {
    let mut haystacks = vec![
        row.tx_hash.to_lowercase(),
        row.id.to_lowercase(),
        row.kind.as_str().to_lowercase(),
    ];
    haystacks.extend(row.from.map(|a| format!("{:#x}", a)));
    haystacks.extend(row.to.map(|a| format!("{:#x}", a)));
    haystacks.extend(row.block_number.map(|b| b.to_string()));
    if let Some(amount) = &row.amount {
        haystacks.push(amount.raw.to_string());
        haystacks.push(amount.display());
    }
    haystacks.iter().any(|h| h.contains(needle))
}
