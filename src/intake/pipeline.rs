// src/intake/pipeline.rs — Message intake: dedup → filter → rank → reply → index

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::dedup::EventDeduplicator;
use super::event::{AdmittedMessage, FilterReason, MessageEvent};
use super::reply::{match_reply, APOLOGY_REPLY, NO_MATCH_REPLY};
use crate::index::ranker::rank;
use crate::index::{IndexedMessage, MatchResult, SimilarityRanker, VectorIndex, DEFAULT_THRESHOLD};
use crate::infra::errors::DejaQError;
use crate::integrations::types::{ChannelHistory, ReplySink};
use crate::summarizer::ThreadSummarizer;
use crate::util::preview;

/// Per-channel pipeline policy.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Resolved id of the one channel this pipeline serves.
    pub channel_id: String,
    pub threshold: f32,
    /// Upper bound on each external call made while handling a message.
    pub handler_timeout: Duration,
}

impl PipelineSettings {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            threshold: DEFAULT_THRESHOLD,
            handler_timeout: Duration::from_secs(60),
        }
    }
}

/// How match handling ended for an admitted message.
#[derive(Debug)]
pub enum MatchOutcome {
    /// A prior question scored above the threshold. `summarized` is false
    /// when its thread had no replies.
    Matched { best: MatchResult, summarized: bool },
    NoMatch,
    /// A collaborator failed; the asker got the apology reply.
    Failed(DejaQError),
}

/// Terminal state of one `handle_event` call.
#[derive(Debug)]
pub enum EventOutcome {
    /// The event id was already processed.
    Duplicate,
    FilteredOut(FilterReason),
    Handled { outcome: MatchOutcome, indexed: bool },
}

impl EventOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, EventOutcome::Handled { .. })
    }
}

/// Owns the channel's index and processed-event set. Events must be fed in
/// arrival order by a single caller; `&mut self` enforces one at a time.
pub struct IntakePipeline {
    settings: PipelineSettings,
    index: VectorIndex,
    dedup: EventDeduplicator,
    ranker: SimilarityRanker,
    summarizer: ThreadSummarizer,
    history: Arc<dyn ChannelHistory>,
    replies: Arc<dyn ReplySink>,
}

impl IntakePipeline {
    pub fn new(
        settings: PipelineSettings,
        index: VectorIndex,
        dedup: EventDeduplicator,
        ranker: SimilarityRanker,
        summarizer: ThreadSummarizer,
        history: Arc<dyn ChannelHistory>,
        replies: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            settings,
            index,
            dedup,
            ranker,
            summarizer,
            history,
            replies,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn dedup(&self) -> &EventDeduplicator {
        &self.dedup
    }

    /// Process one inbound event to completion.
    ///
    /// Collaborator failures are answered with an apology and folded into
    /// the returned outcome. Index errors (`IndexNotReady`,
    /// `DimensionMismatch`) are answered with the same apology and then
    /// returned as `Err`.
    pub async fn handle_event(
        &mut self,
        raw: &serde_json::Value,
    ) -> Result<EventOutcome, DejaQError> {
        let event = match MessageEvent::from_value(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Dropping event: {e}");
                return Ok(EventOutcome::FilteredOut(FilterReason::Malformed(
                    e.to_string(),
                )));
            }
        };

        if let Some(event_id) = event.event_id() {
            if !self.dedup.admit(event_id) {
                tracing::debug!(event_id, "Skipping duplicate event");
                return Ok(EventOutcome::Duplicate);
            }
        }

        let message = match event.admit(&self.settings.channel_id) {
            Ok(message) => message,
            Err(reason) => {
                tracing::debug!(?reason, "Event filtered out");
                return Ok(EventOutcome::FilteredOut(reason));
            }
        };

        let result = self.process(message.clone()).await;
        if result.is_err() {
            self.reply(&message, APOLOGY_REPLY).await;
        }
        result
    }

    /// Embed, respond and index an admitted message. Errors returned from
    /// here have not been answered yet.
    async fn process(&mut self, message: AdmittedMessage) -> Result<EventOutcome, DejaQError> {
        if !self.index.is_ready() {
            return Err(DejaQError::IndexNotReady);
        }

        // One embedding serves both ranking and insertion
        let vector = match self.embed(&message.text).await {
            Ok(vector) => vector,
            Err(e) if e.is_recoverable() => {
                tracing::error!("Error processing message: {e}");
                self.reply(&message, APOLOGY_REPLY).await;
                let indexed = self.index_after_failure(message).await;
                return Ok(EventOutcome::Handled {
                    outcome: MatchOutcome::Failed(e),
                    indexed,
                });
            }
            Err(e) => return Err(e),
        };

        let outcome = self.respond(&message, &vector).await?;
        self.index_message(message, vector).await?;

        Ok(EventOutcome::Handled {
            outcome,
            indexed: true,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError> {
        let embedder = self.ranker.embedder().clone();
        bounded(self.settings.handler_timeout, "embedder", embedder.embed(text)).await
    }

    /// One more embedding attempt after the asker got the apology, so a
    /// passing embedder outage does not keep the question out of the index.
    /// The asker was already answered, so failures here are only logged.
    async fn index_after_failure(&mut self, message: AdmittedMessage) -> bool {
        let result = match self.embed(&message.text).await {
            Ok(vector) => self.index_message(message, vector).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Message not indexed: {e}");
                false
            }
        }
    }

    /// Rank, compose and post the reply for an admitted message.
    async fn respond(
        &self,
        message: &AdmittedMessage,
        vector: &[f32],
    ) -> Result<MatchOutcome, DejaQError> {
        let mut matches = rank(&self.index, vector, self.settings.threshold)?;
        matches.retain(|m| m.message.timestamp != message.ts);

        let Some(best) = matches.into_iter().next() else {
            self.reply(message, NO_MATCH_REPLY).await;
            return Ok(MatchOutcome::NoMatch);
        };

        tracing::info!(
            matched_ts = %best.message.timestamp,
            similarity = best.similarity,
            "Found similar question"
        );

        match self.summarize_match(&best).await {
            Ok(summary) => {
                let summarized = summary.is_some();
                self.reply(message, &match_reply(&best, summary.as_deref()))
                    .await;
                Ok(MatchOutcome::Matched { best, summarized })
            }
            Err(e) => {
                tracing::error!("Error processing message: {e}");
                self.reply(message, APOLOGY_REPLY).await;
                Ok(MatchOutcome::Failed(e))
            }
        }
    }

    /// Fetch the matched thread and summarize its replies, if it has any.
    async fn summarize_match(&self, best: &MatchResult) -> Result<Option<String>, DejaQError> {
        let timeout = self.settings.handler_timeout;
        let thread = bounded(
            timeout,
            "channel history",
            self.history
                .get_thread(&self.settings.channel_id, &best.message.timestamp),
        )
        .await?;

        if thread.len() < 2 {
            return Ok(None);
        }

        let summary = bounded(
            timeout,
            "summarizer",
            self.summarizer
                .summarize_thread(&thread, Some(&best.message.timestamp)),
        )
        .await?;
        Ok(Some(summary))
    }

    /// Threaded reply under the asker's message. Failures are logged only.
    async fn reply(&self, message: &AdmittedMessage, text: &str) {
        if let Err(e) = self
            .replies
            .post(&message.channel, Some(&message.ts), text)
            .await
        {
            tracing::error!("Error posting reply: {e}");
        }
    }

    async fn index_message(
        &mut self,
        message: AdmittedMessage,
        vector: Vec<f32>,
    ) -> Result<(), DejaQError> {
        let permalink = tokio::time::timeout(
            self.settings.handler_timeout,
            self.history.resolve_permalink(&message.channel, &message.ts),
        )
        .await
        .unwrap_or_default();

        let text_preview = preview(&message.text, 50);
        self.index.insert(
            IndexedMessage::new(message.text, message.ts, permalink, Some(message.user)),
            vector,
        )?;
        tracing::info!(
            total = self.index.len(),
            "Added new message to vector store: {text_preview}..."
        );
        Ok(())
    }
}

/// Run a collaborator call under `timeout`. Elapsing counts as a retriable
/// failure of that collaborator.
async fn bounded<T, F>(timeout: Duration, collaborator: &str, call: F) -> Result<T, DejaQError>
where
    F: Future<Output = Result<T, DejaQError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DejaQError::unavailable(
            collaborator,
            format!("timed out after {}s", timeout.as_secs()),
            true,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::types::RawMessage;
    use crate::provider::{Embedder, Generator};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// "aws" and "bitcoin" map to orthogonal axes.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn id(&self) -> &str {
            "axis"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError> {
            let t = text.to_lowercase();
            if t.contains("fail") {
                return Err(DejaQError::unavailable("axis", "boom", false));
            }
            Ok(vec![
                if t.contains("aws") { 1.0 } else { 0.0 },
                if t.contains("bitcoin") { 1.0 } else { 0.0 },
                0.1,
            ])
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn id(&self) -> &str {
            "echo"
        }

        async fn generate(&self, _prompt: &str, _guidance: Option<&str>) -> Result<String, DejaQError> {
            Ok("Run aws configure".into())
        }
    }

    #[derive(Default)]
    struct Channel {
        threads: Vec<String>,
        posted: Mutex<Vec<(String, Option<String>, String)>>,
    }

    #[async_trait]
    impl ChannelHistory for Channel {
        async fn find_channel(&self, _name: &str) -> Result<String, DejaQError> {
            Ok("C1".into())
        }

        async fn list_messages(&self, _channel: &str) -> Result<Vec<RawMessage>, DejaQError> {
            Ok(Vec::new())
        }

        async fn get_thread(&self, _channel: &str, _ts: &str) -> Result<Vec<String>, DejaQError> {
            Ok(self.threads.clone())
        }

        async fn resolve_permalink(&self, _channel: &str, ts: &str) -> String {
            format!("https://slack/{ts}")
        }
    }

    #[async_trait]
    impl ReplySink for Channel {
        async fn post(
            &self,
            channel: &str,
            thread_ts: Option<&str>,
            text: &str,
        ) -> Result<String, DejaQError> {
            self.posted.lock().unwrap().push((
                channel.to_string(),
                thread_ts.map(String::from),
                text.to_string(),
            ));
            Ok("1.0".into())
        }
    }

    fn pipeline(channel: Arc<Channel>) -> IntakePipeline {
        let mut index = VectorIndex::new();
        index
            .insert(
                IndexedMessage::new("How do I configure my AWS credentials?", "100.0", "https://slack/100.0", None),
                vec![1.0, 0.0, 0.1],
            )
            .unwrap();
        IntakePipeline::new(
            PipelineSettings::new("C1"),
            index,
            EventDeduplicator::default(),
            SimilarityRanker::new(Arc::new(AxisEmbedder)),
            ThreadSummarizer::new(Arc::new(EchoGenerator)),
            channel.clone(),
            channel,
        )
    }

    fn event(text: &str, ts: &str) -> serde_json::Value {
        json!({"event": {"type": "message", "channel": "C1", "user": "U2", "text": text, "ts": ts}})
    }

    #[tokio::test]
    async fn test_match_replies_in_thread_and_indexes() {
        let channel = Arc::new(Channel {
            threads: vec!["q".into(), "a".into()],
            ..Default::default()
        });
        let mut pipeline = pipeline(channel.clone());

        let outcome = pipeline
            .handle_event(&event("aws setup?", "200.0"))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            EventOutcome::Handled {
                outcome: MatchOutcome::Matched { summarized: true, .. },
                indexed: true
            }
        ));
        let posted = channel.posted.lock().unwrap();
        assert_eq!(posted[0].1.as_deref(), Some("200.0"));
        assert!(posted[0].2.contains("Run aws configure"));
        assert_eq!(pipeline.index().len(), 2);
    }

    #[tokio::test]
    async fn test_embed_failure_apologizes_without_indexing() {
        let channel = Arc::new(Channel::default());
        let mut pipeline = pipeline(channel.clone());

        let outcome = pipeline
            .handle_event(&event("this will fail", "300.0"))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            EventOutcome::Handled {
                outcome: MatchOutcome::Failed(_),
                indexed: false
            }
        ));
        assert_eq!(channel.posted.lock().unwrap()[0].2, APOLOGY_REPLY);
        assert_eq!(pipeline.index().len(), 1);
    }

    #[tokio::test]
    async fn test_unready_index_propagates() {
        let channel = Arc::new(Channel::default());
        let mut pipeline = IntakePipeline::new(
            PipelineSettings::new("C1"),
            VectorIndex::new(),
            EventDeduplicator::default(),
            SimilarityRanker::new(Arc::new(AxisEmbedder)),
            ThreadSummarizer::new(Arc::new(EchoGenerator)),
            channel.clone(),
            channel.clone(),
        );
        let err = pipeline
            .handle_event(&event("aws?", "1.0"))
            .await
            .unwrap_err();
        assert!(matches!(err, DejaQError::IndexNotReady));
        let posted = channel.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].1.as_deref(), Some("1.0"));
        assert_eq!(posted[0].2, APOLOGY_REPLY);
    }

    /// Returns vectors of a different width than the bootstrapped index.
    struct NarrowEmbedder;

    #[async_trait]
    impl Embedder for NarrowEmbedder {
        fn id(&self) -> &str {
            "narrow"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, DejaQError> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Fails the first call, then behaves like `AxisEmbedder`.
    #[derive(Default)]
    struct FlakyEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        fn id(&self) -> &str {
            "flaky"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DejaQError::unavailable("flaky", "connection refused", true));
            }
            AxisEmbedder.embed(text).await
        }
    }

    fn pipeline_with(channel: Arc<Channel>, embedder: Arc<dyn Embedder>) -> IntakePipeline {
        let mut pipeline = pipeline(channel);
        pipeline.ranker = SimilarityRanker::new(embedder);
        pipeline
    }

    #[tokio::test]
    async fn test_dimension_mismatch_apologizes_and_propagates() {
        let channel = Arc::new(Channel::default());
        let mut pipeline = pipeline_with(channel.clone(), Arc::new(NarrowEmbedder));
        let raw = event("aws?", "400.0");

        let err = pipeline.handle_event(&raw).await.unwrap_err();
        assert!(matches!(
            err,
            DejaQError::DimensionMismatch { expected: 3, actual: 2 }
        ));
        assert_eq!(channel.posted.lock().unwrap()[0].2, APOLOGY_REPLY);
        assert_eq!(pipeline.index().len(), 1);

        // Slack's redelivery is absorbed without a second reply
        let replay = pipeline.handle_event(&raw).await.unwrap();
        assert!(matches!(replay, EventOutcome::Duplicate));
        assert_eq!(channel.posted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embed_outage_still_indexes_on_second_attempt() {
        let channel = Arc::new(Channel::default());
        let mut pipeline = pipeline_with(channel.clone(), Arc::new(FlakyEmbedder::default()));

        let outcome = pipeline
            .handle_event(&event("aws keys?", "500.0"))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            EventOutcome::Handled {
                outcome: MatchOutcome::Failed(_),
                indexed: true
            }
        ));
        let posted = channel.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].2, APOLOGY_REPLY);
        assert_eq!(pipeline.index().len(), 2);
        assert!(pipeline.index().all().any(|(m, _)| m.timestamp == "500.0"));
    }

    #[tokio::test]
    async fn test_malformed_payload_filtered() {
        let mut pipeline = pipeline(Arc::new(Channel::default()));
        let outcome = pipeline.handle_event(&json!("garbage")).await.unwrap();
        assert!(matches!(
            outcome,
            EventOutcome::FilteredOut(FilterReason::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<(), DejaQError> = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.is_retriable());
        assert!(err.to_string().contains("slow"));
    }
}
