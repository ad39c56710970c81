// src/intake/event.rs — Inbound message events and the intake filter

use serde::Deserialize;

use crate::infra::errors::DejaQError;

/// The `event` object of a Slack `event_callback` payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub channel: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub ts: Option<String>,
    /// Client-assigned id, stable across Slack's redeliveries.
    pub client_msg_id: Option<String>,
    /// Set for edits, joins, bot messages and other non-plain messages.
    pub subtype: Option<String>,
    pub bot_id: Option<String>,
    pub app_id: Option<String>,
    /// Present on replies inside an existing thread.
    pub thread_ts: Option<String>,
}

/// Why an event stopped before reaching the ranker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    NotAMessage,
    Subtype(String),
    Automated,
    ThreadReply,
    NoAuthor,
    OtherChannel,
    Malformed(String),
}

/// A message that passed every filter condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedMessage {
    pub channel: String,
    pub user: String,
    pub text: String,
    pub ts: String,
}

impl MessageEvent {
    /// Parse either a full `event_callback` envelope or a bare event object.
    pub fn from_value(raw: &serde_json::Value) -> Result<Self, DejaQError> {
        let event = raw.get("event").unwrap_or(raw);
        if !event.is_object() {
            return Err(DejaQError::MalformedEvent("event is not an object".into()));
        }
        Ok(serde_json::from_value(event.clone())?)
    }

    /// Deduplication key: the client message id, else the timestamp.
    /// `None` means the event cannot be deduplicated.
    pub fn event_id(&self) -> Option<&str> {
        self.client_msg_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.ts.as_deref().filter(|ts| !ts.is_empty()))
    }

    /// Apply the intake filter. Every condition must hold for the message
    /// to be processed.
    pub fn admit(&self, channel_id: &str) -> Result<AdmittedMessage, FilterReason> {
        if self.kind.as_deref().is_some_and(|k| k != "message") {
            return Err(FilterReason::NotAMessage);
        }
        if let Some(subtype) = &self.subtype {
            return Err(FilterReason::Subtype(subtype.clone()));
        }
        if self.bot_id.is_some() || self.app_id.is_some() {
            return Err(FilterReason::Automated);
        }
        if self.thread_ts.is_some() {
            return Err(FilterReason::ThreadReply);
        }
        let Some(user) = self.user.as_ref().filter(|u| !u.is_empty()) else {
            return Err(FilterReason::NoAuthor);
        };
        let Some(channel) = self.channel.as_ref() else {
            return Err(FilterReason::Malformed("missing channel".into()));
        };
        if channel != channel_id {
            return Err(FilterReason::OtherChannel);
        }
        let Some(ts) = self.ts.as_ref().filter(|ts| !ts.is_empty()) else {
            return Err(FilterReason::Malformed("missing ts".into()));
        };
        let Some(text) = self.text.as_ref().filter(|t| !t.trim().is_empty()) else {
            return Err(FilterReason::Malformed("missing text".into()));
        };

        Ok(AdmittedMessage {
            channel: channel.clone(),
            user: user.clone(),
            text: text.clone(),
            ts: ts.clone(),
        })
    }
}
