// src/provider/mod.rs — Model provider layer (embeddings + text generation)

pub mod ollama;
pub mod retry;

use async_trait::async_trait;

use crate::infra::errors::DejaQError;

/// Maps text to a fixed-dimension vector. Must be deterministic for identical
/// input and return the same dimension for every call.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError>;

    /// Embed several texts. Same dimension as single-text calls.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, DejaQError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Opaque text-generation service used for thread summaries.
#[async_trait]
pub trait Generator: Send + Sync {
    fn id(&self) -> &str;

    /// Generate a completion for `prompt`, steered by an optional system `guidance`.
    async fn generate(&self, prompt: &str, guidance: Option<&str>) -> Result<String, DejaQError>;
}
