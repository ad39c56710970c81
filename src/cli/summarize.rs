// src/cli/summarize.rs — Summarize one thread and show the prompt sent

use crate::cli::Services;
use crate::infra::config::Config;
use crate::integrations::types::ChannelHistory;
use crate::summarizer::{build_prompt, ThreadSummarizer};

pub async fn run_summarize(config: &Config, thread_ts: &str) -> anyhow::Result<()> {
    let services = Services::connect(config)?;
    let channel_id = services.slack.find_channel(&config.slack.channel).await?;
    let thread = services.slack.get_thread(&channel_id, thread_ts).await?;

    let prompt = build_prompt(&thread);
    println!("System prompt:\n{}\n", prompt.guidance);
    println!("User prompt:\n{}\n", prompt.instruction);

    let summarizer = ThreadSummarizer::new(services.generator.clone());
    let summary = summarizer.summarize_thread(&thread, Some(thread_ts)).await?;
    println!("Summary:\n{summary}");
    Ok(())
}
