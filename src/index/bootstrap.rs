// src/index/bootstrap.rs — Bulk initialization from channel history

use futures::stream::{self, StreamExt};

use super::store::{IndexedMessage, VectorIndex};
use crate::infra::errors::DejaQError;
use crate::integrations::types::{ChannelHistory, RawMessage};
use crate::provider::Embedder;

/// Concurrent permalink lookups during bootstrap.
const PERMALINK_CONCURRENCY: usize = 8;

/// Embedded once when the channel is empty, only to learn D.
const DIMENSION_PROBE: &str = "dimension probe";

/// Fetch the channel's history, embed it, and bulk-load the index.
///
/// Bot/app-authored and empty messages are skipped. On an empty channel a
/// single probe embedding fixes the dimension so the index is queryable.
/// Returns the number of messages loaded.
pub async fn initialize(
    history: &dyn ChannelHistory,
    embedder: &dyn Embedder,
    channel_id: &str,
    index: &mut VectorIndex,
) -> Result<usize, DejaQError> {
    tracing::info!("Initializing vector index for channel {channel_id}");

    let messages: Vec<RawMessage> = history
        .list_messages(channel_id)
        .await?
        .into_iter()
        .filter(|m| !m.is_automated() && !m.text.trim().is_empty())
        .collect();
    tracing::info!("Fetched {} messages", messages.len());

    if messages.is_empty() {
        tracing::warn!("No messages to create embeddings for");
        let probe = embedder.embed(DIMENSION_PROBE).await?;
        index.establish_dimension(probe.len())?;
        return Ok(0);
    }

    let permalinks: Vec<String> = stream::iter(messages.iter())
        .map(|m| history.resolve_permalink(channel_id, &m.ts))
        .buffered(PERMALINK_CONCURRENCY)
        .collect()
        .await;

    let texts: Vec<&str> = messages.iter().map(|m| m.text.as_str()).collect();
    let vectors = embedder.embed_batch(&texts).await?;
    if vectors.len() != messages.len() {
        return Err(DejaQError::unavailable(
            embedder.id(),
            format!(
                "embedded {} of {} messages",
                vectors.len(),
                messages.len()
            ),
            false,
        ));
    }

    let batch: Vec<(IndexedMessage, Vec<f32>)> = messages
        .into_iter()
        .zip(permalinks)
        .zip(vectors)
        .map(|((m, permalink), vector)| {
            (IndexedMessage::new(m.text, m.ts, permalink, m.user), vector)
        })
        .collect();

    let loaded = index.bulk_load(batch)?;
    tracing::info!(
        dimension = index.dimension().unwrap_or_default(),
        "Created embeddings for {loaded} messages"
    );
    Ok(loaded)
}
