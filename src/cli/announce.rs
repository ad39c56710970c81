// src/cli/announce.rs — Post a one-off message to the channel

use crate::infra::config::Config;
use crate::intake::reply::ONLINE_ANNOUNCEMENT;
use crate::integrations::types::{ChannelHistory, ReplySink};
use crate::integrations::SlackAdapter;

pub async fn run_announce(config: &Config, text: Option<&str>) -> anyhow::Result<()> {
    let slack = SlackAdapter::new(config.require_bot_token()?);
    let channel_id = slack.find_channel(&config.slack.channel).await?;

    let text = text.unwrap_or(ONLINE_ANNOUNCEMENT);
    let ts = slack.post(&channel_id, None, text).await?;
    tracing::info!(ts = %ts, "Posted to #{}", config.slack.channel);
    println!("Message sent to #{}", config.slack.channel);
    Ok(())
}
