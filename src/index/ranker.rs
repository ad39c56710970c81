// src/index/ranker.rs — Threshold-filtered cosine ranking over the vector index

use std::sync::Arc;

use serde::Serialize;

use super::similarity::{cosine_with_norms, l2_norm};
use super::store::{IndexedMessage, VectorIndex};
use crate::infra::errors::DejaQError;
use crate::provider::Embedder;

/// Reference policy: matches must be strictly more similar than this.
pub const DEFAULT_THRESHOLD: f32 = 0.8;

/// An indexed message with its similarity to the query. Transient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub message: IndexedMessage,
    pub similarity: f32,
}

impl MatchResult {
    /// Similarity as a percentage, e.g. `92.3` for 0.923.
    pub fn percentage(&self) -> f32 {
        self.similarity * 100.0
    }
}

/// Embeds query text and ranks index entries against it.
pub struct SimilarityRanker {
    embedder: Arc<dyn Embedder>,
}

impl SimilarityRanker {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embed `text` and return matches scoring above `threshold`, best first.
    pub async fn query(
        &self,
        index: &VectorIndex,
        text: &str,
        threshold: f32,
    ) -> Result<Vec<MatchResult>, DejaQError> {
        // Fail before paying for an embedding call
        if !index.is_ready() {
            return Err(DejaQError::IndexNotReady);
        }
        let query = self.embedder.embed(text).await?;
        rank(index, &query, threshold)
    }
}

/// Score every entry against `query`, keep those strictly above `threshold`,
/// and sort by descending similarity. The sort is stable, so equal scores
/// keep insertion order.
pub fn rank(
    index: &VectorIndex,
    query: &[f32],
    threshold: f32,
) -> Result<Vec<MatchResult>, DejaQError> {
    let dimension = index.dimension().ok_or(DejaQError::IndexNotReady)?;
    if query.len() != dimension {
        return Err(DejaQError::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }

    let query_norm = l2_norm(query);
    let mut matches: Vec<MatchResult> = index
        .entries()
        .filter_map(|entry| {
            let similarity = cosine_with_norms(query, query_norm, entry.vector(), entry.norm());
            (similarity > threshold).then(|| MatchResult {
                message: entry.message().clone(),
                similarity,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    Ok(matches)
}
