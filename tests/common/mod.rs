// tests/common/mod.rs — Mock collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use dejaq::index::{IndexedMessage, SimilarityRanker, VectorIndex};
use dejaq::infra::errors::DejaQError;
use dejaq::intake::{EventDeduplicator, IntakePipeline, PipelineSettings};
use dejaq::integrations::types::{ChannelHistory, RawMessage, ReplySink};
use dejaq::provider::{Embedder, Generator};
use dejaq::summarizer::ThreadSummarizer;

pub const CHANNEL_ID: &str = "C0PROTO";
pub const CHANNEL_NAME: &str = "prototype";

/// Each concept is one axis; a text's vector marks the concepts it mentions.
/// Paraphrases that share concepts land on the same direction.
const CONCEPTS: &[&[&str]] = &[
    &["aws", "amazon"],
    &["credential", "access key"],
    &["configure", "set up", "setup", "config"],
    &["bitcoin", "btc"],
    &["price", "cost", "worth"],
    &["python"],
    &["install"],
    &["postgres"],
];

/// Constant component so no text embeds to the zero vector.
const BIAS: f32 = 0.05;

#[derive(Default)]
pub struct ConceptEmbedder {
    pub calls: AtomicUsize,
}

impl ConceptEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut v: Vec<f32> = CONCEPTS
            .iter()
            .map(|words| {
                if words.iter().any(|w| text.contains(w)) {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();
        v.push(BIAS);
        v
    }
}

#[async_trait]
impl Embedder for ConceptEmbedder {
    fn id(&self) -> &str {
        "concept"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, DejaQError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }
}

/// Generator with a fixed answer, a failure mode, or a delay.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub prompts: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedGenerator {
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, guidance: Option<&str>) -> Result<String, DejaQError> {
        self.prompts
            .lock()
            .unwrap()
            .push((prompt.to_string(), guidance.map(String::from)));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(DejaQError::unavailable("scripted", "connection refused", true));
        }
        Ok("Run `aws configure` and paste your access key.".into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub channel: String,
    pub thread_ts: Option<String>,
    pub text: String,
}

/// In-memory Slack channel: history, threads, and a reply log.
#[derive(Default)]
pub struct ScriptedChannel {
    pub history: Vec<RawMessage>,
    pub threads: HashMap<String, Vec<String>>,
    pub fail_threads: bool,
    pub posted: Mutex<Vec<Posted>>,
}

impl ScriptedChannel {
    pub fn with_history(texts: &[(&str, &str)]) -> Self {
        Self {
            history: texts
                .iter()
                .map(|(ts, text)| human(ts, text))
                .collect(),
            ..Default::default()
        }
    }

    pub fn thread(mut self, ts: &str, messages: &[&str]) -> Self {
        self.threads
            .insert(ts.to_string(), messages.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn posted(&self) -> Vec<Posted> {
        self.posted.lock().unwrap().clone()
    }
}

pub fn human(ts: &str, text: &str) -> RawMessage {
    RawMessage {
        ts: ts.into(),
        text: text.into(),
        user: Some("U1".into()),
        ..Default::default()
    }
}

pub fn permalink(ts: &str) -> String {
    format!("https://example.slack.com/archives/{CHANNEL_ID}/p{}", ts.replace('.', ""))
}

#[async_trait]
impl ChannelHistory for ScriptedChannel {
    async fn find_channel(&self, name: &str) -> Result<String, DejaQError> {
        if name == CHANNEL_NAME {
            Ok(CHANNEL_ID.into())
        } else {
            Err(DejaQError::Config(format!("Channel {name} not found")))
        }
    }

    async fn list_messages(&self, _channel: &str) -> Result<Vec<RawMessage>, DejaQError> {
        Ok(self.history.clone())
    }

    async fn get_thread(&self, _channel: &str, thread_ts: &str) -> Result<Vec<String>, DejaQError> {
        if self.fail_threads {
            return Err(DejaQError::unavailable("slack", "ratelimited", true));
        }
        // An unanswered message is a thread of one
        Ok(self.threads.get(thread_ts).cloned().unwrap_or_else(|| {
            self.history
                .iter()
                .filter(|m| m.ts == thread_ts)
                .map(|m| m.text.clone())
                .collect()
        }))
    }

    async fn resolve_permalink(&self, _channel: &str, ts: &str) -> String {
        permalink(ts)
    }
}

#[async_trait]
impl ReplySink for ScriptedChannel {
    async fn post(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<String, DejaQError> {
        let mut posted = self.posted.lock().unwrap();
        posted.push(Posted {
            channel: channel.into(),
            thread_ts: thread_ts.map(String::from),
            text: text.into(),
        });
        Ok(format!("9{:09}.000000", posted.len()))
    }
}

/// Pipeline over `channel`, with its history already indexed.
pub fn pipeline(
    channel: Arc<ScriptedChannel>,
    generator: Arc<ScriptedGenerator>,
    settings: PipelineSettings,
) -> IntakePipeline {
    let mut index = VectorIndex::new();
    for m in &channel.history {
        index
            .insert(
                IndexedMessage::new(m.text.clone(), m.ts.clone(), permalink(&m.ts), m.user.clone()),
                ConceptEmbedder::vector(&m.text),
            )
            .unwrap();
    }
    if channel.history.is_empty() {
        index
            .establish_dimension(ConceptEmbedder::vector("").len())
            .unwrap();
    }

    IntakePipeline::new(
        settings,
        index,
        EventDeduplicator::default(),
        SimilarityRanker::new(Arc::new(ConceptEmbedder::default())),
        ThreadSummarizer::new(generator),
        channel.clone(),
        channel,
    )
}

/// An `event_callback` envelope for a plain user message.
pub fn message_event(text: &str, ts: &str, client_msg_id: &str) -> serde_json::Value {
    json!({
        "token": "verification-token",
        "team_id": "T1",
        "type": "event_callback",
        "event_id": format!("Ev{client_msg_id}"),
        "event": {
            "type": "message",
            "channel": CHANNEL_ID,
            "user": "U2",
            "text": text,
            "ts": ts,
            "client_msg_id": client_msg_id,
        }
    })
}
