// src/cli/query.rs — Rank channel history against a question

use crate::cli::Services;
use crate::index::bootstrap;
use crate::index::{SimilarityRanker, VectorIndex};
use crate::infra::config::Config;
use crate::integrations::types::ChannelHistory;
use crate::util::truncate_str;

pub async fn run_query(config: &Config, text: &str, threshold: Option<f32>) -> anyhow::Result<()> {
    let services = Services::connect(config)?;
    let threshold = threshold.unwrap_or(config.dedup.similarity_threshold);

    let channel_id = services.slack.find_channel(&config.slack.channel).await?;
    let mut index = VectorIndex::with_max_entries(config.dedup.max_index_entries);
    let loaded = bootstrap::initialize(
        services.slack.as_ref(),
        services.embedder.as_ref(),
        &channel_id,
        &mut index,
    )
    .await?;

    let ranker = SimilarityRanker::new(services.embedder.clone());
    let matches = ranker.query(&index, text, threshold).await?;

    println!(
        "{} of {loaded} messages in #{} scored above {threshold}",
        matches.len(),
        config.slack.channel
    );
    for m in &matches {
        println!(
            "  {:>5.1}%  {}  {}",
            m.percentage(),
            m.message.timestamp,
            truncate_str(&m.message.text, 80)
        );
        if !m.message.permalink.is_empty() {
            println!("          {}", m.message.permalink);
        }
    }
    Ok(())
}
