// src/provider/retry.rs — Retry with exponential backoff for model providers
//
// Wraps an Embedder or Generator and retries collaborator failures marked
// retriable (timeouts, connection errors, 5xx). Everything else is returned
// on the first attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Embedder, Generator};
use crate::infra::errors::DejaQError;

const MAX_RETRIES: u32 = 3;
const INITIAL_DELAY_MS: u64 = 500;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 8_000;
const JITTER_FRACTION: f64 = 0.2;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

/// Provider wrapper adding retry with exponential backoff. Implements
/// whichever of `Embedder` / `Generator` the inner provider implements.
pub struct Retrying<P: ?Sized> {
    inner: Arc<P>,
    config: RetryConfig,
}

impl<P: ?Sized> Retrying<P> {
    pub fn new(inner: Arc<P>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<P>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Delay before retry number `attempt` (0-indexed).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(1.0);

        Duration::from_millis(final_ms as u64)
    }

    async fn run<T, F, Fut>(&self, provider: &str, op: &str, mut call: F) -> Result<T, DejaQError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DejaQError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retriable() || attempt >= self.config.max_retries => {
                    return Err(e)
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(attempt);
                    tracing::warn!(
                        provider,
                        op,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {e}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Deterministic jitter for a given attempt to keep retries reproducible in tests.
/// Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl<P: Embedder + ?Sized> Embedder for Retrying<P> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError> {
        self.run(self.inner.id(), "embed", || self.inner.embed(text))
            .await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, DejaQError> {
        self.run(self.inner.id(), "embed_batch", || self.inner.embed_batch(texts))
            .await
    }
}

#[async_trait]
impl<P: Generator + ?Sized> Generator for Retrying<P> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn generate(&self, prompt: &str, guidance: Option<&str>) -> Result<String, DejaQError> {
        self.run(self.inner.id(), "generate", || {
            self.inner.generate(prompt, guidance)
        })
        .await
    }
}
