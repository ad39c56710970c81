// src/index/store.rs — Append-only in-memory vector index
//
// Entries are kept in arrival order. The ranker's tie-break depends on it,
// so eviction (when a cap is configured) only ever removes the oldest entry.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::similarity::l2_norm;
use crate::infra::errors::DejaQError;

/// A channel message admitted into the index. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedMessage {
    pub text: String,
    /// Slack `ts`: identity and ordering key within the channel.
    pub timestamp: String,
    /// Empty when the permalink could not be resolved.
    pub permalink: String,
    pub author: Option<String>,
}

impl IndexedMessage {
    pub fn new(
        text: impl Into<String>,
        timestamp: impl Into<String>,
        permalink: impl Into<String>,
        author: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            timestamp: timestamp.into(),
            permalink: permalink.into(),
            author,
        }
    }
}

/// One message with its embedding and the embedding's cached L2 norm.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    message: IndexedMessage,
    vector: Vec<f32>,
    norm: f32,
}

impl IndexEntry {
    pub fn message(&self) -> &IndexedMessage {
        &self.message
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn norm(&self) -> f32 {
        self.norm
    }
}

/// In-memory collection of (message, embedding) pairs for a single channel.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: VecDeque<IndexEntry>,
    dimension: Option<usize>,
    max_entries: Option<usize>,
}

impl VectorIndex {
    /// An unbounded index whose dimension is fixed by the first insertion.
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that evicts its oldest entry once `max_entries` is exceeded.
    pub fn with_max_entries(max_entries: Option<usize>) -> Self {
        Self {
            max_entries,
            ..Self::default()
        }
    }

    /// Embedding dimension D, once established.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Whether queries may run (D is known), even if the index is empty.
    pub fn is_ready(&self) -> bool {
        self.dimension.is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fix D without inserting anything. Used by bulk initialization when the
    /// channel has no history yet.
    pub fn establish_dimension(&mut self, dimension: usize) -> Result<(), DejaQError> {
        match self.dimension {
            Some(expected) if expected != dimension => Err(DejaQError::DimensionMismatch {
                expected,
                actual: dimension,
            }),
            _ if dimension == 0 => Err(DejaQError::DimensionMismatch {
                expected: self.dimension.unwrap_or(0),
                actual: 0,
            }),
            _ => {
                self.dimension = Some(dimension);
                Ok(())
            }
        }
    }

    /// Append one message. Existing entries are never touched, except for
    /// oldest-first eviction when a cap is configured.
    pub fn insert(&mut self, message: IndexedMessage, vector: Vec<f32>) -> Result<(), DejaQError> {
        self.establish_dimension(vector.len())?;
        self.push(message, vector);
        Ok(())
    }

    /// Load a batch atomically: either every vector matches D and all are
    /// appended, or nothing changes.
    pub fn bulk_load(
        &mut self,
        batch: Vec<(IndexedMessage, Vec<f32>)>,
    ) -> Result<usize, DejaQError> {
        let Some((_, first)) = batch.first() else {
            return Ok(0);
        };
        let expected = self.dimension.unwrap_or(first.len());
        if let Some((_, bad)) = batch.iter().find(|(_, v)| v.len() != expected) {
            return Err(DejaQError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        self.establish_dimension(expected)?;

        let count = batch.len();
        for (message, vector) in batch {
            self.push(message, vector);
        }
        Ok(count)
    }

    /// All (message, vector) pairs in insertion order. Lazy; call again to restart.
    pub fn all(&self) -> impl Iterator<Item = (&IndexedMessage, &[f32])> + '_ {
        self.entries.iter().map(|e| (&e.message, e.vector.as_slice()))
    }

    /// Entries with cached norms, in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.entries.iter()
    }

    fn push(&mut self, message: IndexedMessage, vector: Vec<f32>) {
        let norm = l2_norm(&vector);
        self.entries.push_back(IndexEntry {
            message,
            vector,
            norm,
        });
        if let Some(max) = self.max_entries {
            while self.entries.len() > max {
                if let Some(evicted) = self.entries.pop_front() {
                    tracing::debug!(ts = %evicted.message.timestamp, "Evicted oldest index entry");
                }
            }
        }
    }
}
