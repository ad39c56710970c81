// src/integrations/slack.rs — Slack Web API adapter
//
// Reads channel history and threads, resolves permalinks, and posts replies
// through the Slack Web API (https://api.slack.com/methods).

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::infra::errors::DejaQError;
use crate::integrations::types::{ChannelHistory, RawMessage, ReplySink};

const SLACK_API_BASE: &str = "https://slack.com/api";
const COLLABORATOR: &str = "slack";
const PAGE_LIMIT: &str = "200";

/// Slack integration adapter.
pub struct SlackAdapter {
    client: Client,
    bot_token: String,
}

impl SlackAdapter {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            bot_token: bot_token.into(),
        }
    }

    /// Make an authenticated GET request to the Slack API.
    async fn api_get<T: DeserializeOwned + SlackEnvelope>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, DejaQError> {
        let url = format!("{SLACK_API_BASE}/{method}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.bot_token)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;
        decode(method, resp).await
    }

    /// Make an authenticated POST request to the Slack API.
    async fn api_post<T: DeserializeOwned + SlackEnvelope>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, DejaQError> {
        let url = format!("{SLACK_API_BASE}/{method}");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        decode(method, resp).await
    }

    /// Test authentication by calling auth.test.
    pub async fn validate(&self) -> Result<String, DejaQError> {
        let resp: AuthResp = self.api_get("auth.test", &[]).await?;
        Ok(format!(
            "Authenticated as {} in {}",
            resp.user.unwrap_or_default(),
            resp.team.unwrap_or_default()
        ))
    }

    /// Follow `next_cursor` until exhausted, collecting every page's items.
    async fn paginate<T, R>(
        &self,
        method: &str,
        params: &[(&str, &str)],
        items: impl Fn(R) -> (Vec<T>, Option<String>),
    ) -> Result<Vec<T>, DejaQError>
    where
        R: DeserializeOwned + SlackEnvelope,
    {
        let mut all = Vec::new();
        let mut cursor = String::new();
        loop {
            let page: R = {
                let mut query: Vec<(&str, &str)> = params.to_vec();
                query.push(("limit", PAGE_LIMIT));
                if !cursor.is_empty() {
                    query.push(("cursor", &cursor));
                }
                self.api_get(method, &query).await?
            };
            let (batch, next) = items(page);
            all.extend(batch);
            match next.filter(|c| !c.is_empty()) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        Ok(all)
    }
}

async fn decode<T: DeserializeOwned + SlackEnvelope>(
    method: &str,
    resp: reqwest::Response,
) -> Result<T, DejaQError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DejaQError::unavailable(
            COLLABORATOR,
            format!("Slack API {method} returned {status}"),
            status.as_u16() == 429 || status.is_server_error(),
        ));
    }
    let body: T = resp.json().await.map_err(|e| {
        DejaQError::unavailable(COLLABORATOR, format!("Slack API {method}: {e}"), false)
    })?;
    if !body.ok() {
        let error = body.error().unwrap_or("unknown");
        return Err(DejaQError::unavailable(
            COLLABORATOR,
            format!("Slack API {method} failed: {error}"),
            error == "ratelimited",
        ));
    }
    Ok(body)
}

fn transport_error(e: reqwest::Error) -> DejaQError {
    DejaQError::unavailable(COLLABORATOR, e.to_string(), e.is_timeout() || e.is_connect())
}

// -- Slack API response types --

/// The `ok`/`error` pair every Web API response carries.
trait SlackEnvelope {
    fn ok(&self) -> bool;
    fn error(&self) -> Option<&str>;
}

macro_rules! slack_envelope {
    ($($ty:ty),* $(,)?) => {
        $(impl SlackEnvelope for $ty {
            fn ok(&self) -> bool {
                self.ok
            }

            fn error(&self) -> Option<&str> {
                self.error.as_deref()
            }
        })*
    };
}

slack_envelope!(
    AuthResp,
    ConversationsListResp,
    MessagesResp,
    PermalinkResp,
    ChatPostMessageResp,
);

#[derive(Deserialize)]
struct AuthResp {
    ok: bool,
    user: Option<String>,
    team: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ConversationsListResp {
    ok: bool,
    #[serde(default)]
    channels: Vec<SlackChannel>,
    response_metadata: Option<ResponseMetadata>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct SlackChannel {
    id: String,
    name: Option<String>,
}

/// Shape shared by conversations.history and conversations.replies.
#[derive(Deserialize)]
struct MessagesResp {
    ok: bool,
    #[serde(default)]
    messages: Vec<RawMessage>,
    response_metadata: Option<ResponseMetadata>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct PermalinkResp {
    ok: bool,
    permalink: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatPostMessageResp {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

fn next_cursor(meta: Option<ResponseMetadata>) -> Option<String> {
    meta.and_then(|m| m.next_cursor)
}

/// Slack pages history newest first; the index wants arrival order.
fn oldest_first(mut messages: Vec<RawMessage>) -> Vec<RawMessage> {
    messages.sort_by(|a, b| ts_key(&a.ts).total_cmp(&ts_key(&b.ts)));
    messages
}

fn ts_key(ts: &str) -> f64 {
    ts.parse().unwrap_or(0.0)
}

/// Texts of human-authored thread messages, parent first.
fn thread_texts(messages: Vec<RawMessage>) -> Vec<String> {
    messages
        .into_iter()
        .filter(|m| !m.is_automated())
        .map(|m| m.text)
        .collect()
}

// -- Channel collaborator implementations --

#[async_trait]
impl ChannelHistory for SlackAdapter {
    async fn find_channel(&self, name: &str) -> Result<String, DejaQError> {
        let name = name.trim_start_matches('#');
        let channels = self
            .paginate(
                "conversations.list",
                &[
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                ],
                |r: ConversationsListResp| (r.channels, next_cursor(r.response_metadata)),
            )
            .await?;

        channels
            .into_iter()
            .find(|c| c.name.as_deref() == Some(name))
            .map(|c| c.id)
            .ok_or_else(|| DejaQError::Config(format!("Channel {name} not found")))
    }

    async fn list_messages(&self, channel: &str) -> Result<Vec<RawMessage>, DejaQError> {
        let messages = self
            .paginate(
                "conversations.history",
                &[("channel", channel)],
                |r: MessagesResp| (r.messages, next_cursor(r.response_metadata)),
            )
            .await
            .inspect_err(|e| tracing::error!("Error fetching channel history: {e}"))?;
        Ok(oldest_first(messages))
    }

    async fn get_thread(&self, channel: &str, thread_ts: &str) -> Result<Vec<String>, DejaQError> {
        let messages = self
            .paginate(
                "conversations.replies",
                &[("channel", channel), ("ts", thread_ts)],
                |r: MessagesResp| (r.messages, next_cursor(r.response_metadata)),
            )
            .await
            .inspect_err(|e| tracing::error!("Error fetching thread messages: {e}"))?;
        Ok(thread_texts(messages))
    }

    async fn resolve_permalink(&self, channel: &str, ts: &str) -> String {
        let resp: Result<PermalinkResp, _> = self
            .api_get("chat.getPermalink", &[("channel", channel), ("message_ts", ts)])
            .await;
        match resp {
            Ok(r) => r.permalink.unwrap_or_default(),
            Err(e) => {
                tracing::error!("Error getting permalink: {e}");
                String::new()
            }
        }
    }
}

#[async_trait]
impl ReplySink for SlackAdapter {
    async fn post(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<String, DejaQError> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = serde_json::json!(thread_ts);
        }

        let resp: ChatPostMessageResp = self.api_post("chat.postMessage", &body).await?;
        Ok(resp.ts.unwrap_or_default())
    }
}
