// src/infra/config.rs — Configuration loading (TOML + environment overrides)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub slack: SlackConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Channel name (without '#') whose questions are deduplicated.
    pub channel: String,
    /// Bot token (xoxb-...). Usually supplied via SLACK_BOT_TOKEN.
    pub bot_token: Option<String>,
    /// Signing secret for Events API requests. Verification is off when unset.
    pub signing_secret: Option<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            channel: "prototype".into(),
            bot_token: None,
            signing_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    /// Generation model used for thread summaries.
    pub model: String,
    /// Embedding model used for the vector index.
    pub embedding_model: String,
    pub request_timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "mistral".into(),
            embedding_model: "all-minilm".into(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Matches must score strictly above this cosine similarity.
    pub similarity_threshold: f32,
    /// Capacity of the processed-event set (FIFO eviction beyond it).
    pub max_processed_events: usize,
    /// Optional cap on indexed messages; oldest entries are evicted first.
    pub max_index_entries: Option<usize>,
    /// Upper bound on collaborator calls made while handling one event.
    pub handler_timeout_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            max_processed_events: 1000,
            max_index_entries: None,
            handler_timeout_secs: 60,
        }
    }
}

impl DedupConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Events buffered between the HTTP receiver and the pipeline worker.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            queue_capacity: 256,
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults,
    /// then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the environment. `lookup` is injected so tests
    /// do not have to mutate process state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token);
        }
        if let Some(secret) = non_empty("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(secret);
        }
        if let Some(channel) = non_empty("DEJAQ_CHANNEL") {
            self.slack.channel = channel.trim_start_matches('#').to_string();
        }
        if let Some(url) = non_empty("OLLAMA_BASE_URL") {
            self.ollama.base_url = url;
        }
        if let Some(model) = non_empty("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(model) = non_empty("OLLAMA_EMBED_MODEL") {
            self.ollama.embedding_model = model;
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let t = self.dedup.similarity_threshold;
        if !(-1.0..=1.0).contains(&t) {
            anyhow::bail!("dedup.similarity_threshold must be within [-1, 1], got {t}");
        }
        if self.dedup.max_processed_events == 0 {
            anyhow::bail!("dedup.max_processed_events must be at least 1");
        }
        if self.dedup.max_index_entries == Some(0) {
            anyhow::bail!("dedup.max_index_entries must be at least 1 when set");
        }
        if self.server.queue_capacity == 0 {
            anyhow::bail!("server.queue_capacity must be at least 1");
        }
        Ok(())
    }

    /// The bot token, or a configuration error naming the env var to set.
    pub fn require_bot_token(&self) -> anyhow::Result<&str> {
        self.slack
            .bot_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No Slack bot token configured. Set SLACK_BOT_TOKEN."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.slack.channel, "prototype");
        assert!(c.slack.bot_token.is_none());
        assert!((c.dedup.similarity_threshold - 0.8).abs() < 0.001);
        assert_eq!(c.dedup.max_processed_events, 1000);
        assert!(c.dedup.max_index_entries.is_none());
        assert_eq!(c.ollama.model, "mistral");
        assert_eq!(c.ollama.base_url, "http://localhost:11434");
        assert_eq!(c.server.port, 3000);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.dedup.max_processed_events, 1000);
        assert_eq!(config.slack.channel, "prototype");
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[slack]
channel = "help-desk"
signing_secret = "shh"

[ollama]
base_url = "http://gpu-box:11434"
model = "llama3.2"
embedding_model = "nomic-embed-text"
request_timeout_secs = 30

[dedup]
similarity_threshold = 0.75
max_processed_events = 50
max_index_entries = 10000
handler_timeout_secs = 15

[server]
host = "0.0.0.0"
port = 8080
queue_capacity = 16
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.slack.channel, "help-desk");
        assert_eq!(config.slack.signing_secret.as_deref(), Some("shh"));
        assert_eq!(config.ollama.model, "llama3.2");
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert!((config.dedup.similarity_threshold - 0.75).abs() < 0.001);
        assert_eq!(config.dedup.max_processed_events, 50);
        assert_eq!(config.dedup.max_index_entries, Some(10000));
        assert_eq!(config.dedup.handler_timeout(), Duration::from_secs(15));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SLACK_BOT_TOKEN", "xoxb-test"),
            ("DEJAQ_CHANNEL", "#general"),
            ("OLLAMA_MODEL", "llama3.2"),
            ("OLLAMA_BASE_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.slack.bot_token.as_deref(), Some("xoxb-test"));
        assert_eq!(config.slack.channel, "general");
        assert_eq!(config.ollama.model, "llama3.2");
        // Blank values do not clobber defaults
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_require_bot_token() {
        let mut config = Config::default();
        assert!(config.require_bot_token().is_err());
        config.slack.bot_token = Some("xoxb-1".into());
        assert_eq!(config.require_bot_token().unwrap(), "xoxb-1");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[slack]\nchannel = \"questions\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.slack.channel, "questions");
    }

    #[test]
    fn test_load_rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dedup]\nsimilarity_threshold = 1.5\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.slack.channel, config.slack.channel);
        assert_eq!(
            deserialized.dedup.max_processed_events,
            config.dedup.max_processed_events
        );
    }
}
