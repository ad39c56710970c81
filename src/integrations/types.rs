// src/integrations/types.rs — Channel collaborator traits

use async_trait::async_trait;
use serde::Deserialize;

use crate::infra::errors::DejaQError;

/// A message record as returned by channel history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub text: String,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    pub app_id: Option<String>,
    pub subtype: Option<String>,
    pub thread_ts: Option<String>,
}

impl RawMessage {
    /// Authored by a bot user or an app integration.
    pub fn is_automated(&self) -> bool {
        self.bot_id.is_some() || self.app_id.is_some()
    }
}

/// Read access to a channel's messages.
#[async_trait]
pub trait ChannelHistory: Send + Sync {
    /// Resolve a channel name (without '#') to its id.
    async fn find_channel(&self, name: &str) -> Result<String, DejaQError>;

    /// Top-level channel messages, oldest first.
    async fn list_messages(&self, channel: &str) -> Result<Vec<RawMessage>, DejaQError>;

    /// Texts of a thread in order, parent message first. Bot/app messages
    /// are excluded.
    async fn get_thread(&self, channel: &str, thread_ts: &str) -> Result<Vec<String>, DejaQError>;

    /// Stable link to a message. Empty string when it cannot be resolved.
    async fn resolve_permalink(&self, channel: &str, ts: &str) -> String;
}

/// Write access: where replies to the asker go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Post `text` to `channel`, threaded under `thread_ts` when given.
    /// Returns the posted message's timestamp.
    async fn post(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<String, DejaQError>;
}
