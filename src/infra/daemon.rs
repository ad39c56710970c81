// src/infra/daemon.rs — Serve loop: Events API receiver → sequential pipeline worker
//
// The HTTP handler only enqueues. A single worker owns the pipeline and
// drains the queue in arrival order, so index insertions follow the order
// Slack delivered the messages.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::api;
use crate::index::bootstrap;
use crate::index::{SimilarityRanker, VectorIndex};
use crate::infra::config::Config;
use crate::infra::errors::DejaQError;
use crate::intake::{EventDeduplicator, EventOutcome, IntakePipeline, PipelineSettings};
use crate::integrations::types::{ChannelHistory, ReplySink};
use crate::provider::{Embedder, Generator};
use crate::summarizer::ThreadSummarizer;

/// Everything the daemon needs to build and run the pipeline.
pub struct DaemonContext {
    pub config: Config,
    pub history: Arc<dyn ChannelHistory>,
    pub replies: Arc<dyn ReplySink>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

/// Resolve the configured channel and bootstrap its index from history.
pub async fn build_pipeline(ctx: &DaemonContext) -> Result<IntakePipeline, DejaQError> {
    let channel_id = ctx.history.find_channel(&ctx.config.slack.channel).await?;
    tracing::info!("Watching #{} ({channel_id})", ctx.config.slack.channel);

    let dedup = &ctx.config.dedup;
    let mut index = VectorIndex::with_max_entries(dedup.max_index_entries);
    bootstrap::initialize(
        ctx.history.as_ref(),
        ctx.embedder.as_ref(),
        &channel_id,
        &mut index,
    )
    .await?;

    let settings = PipelineSettings {
        channel_id,
        threshold: dedup.similarity_threshold,
        handler_timeout: dedup.handler_timeout(),
    };

    Ok(IntakePipeline::new(
        settings,
        index,
        EventDeduplicator::new(dedup.max_processed_events),
        SimilarityRanker::new(ctx.embedder.clone()),
        ThreadSummarizer::new(ctx.generator.clone()),
        ctx.history.clone(),
        ctx.replies.clone(),
    ))
}

/// Run the receiver and the worker until Ctrl+C.
pub async fn run(ctx: DaemonContext) -> anyhow::Result<()> {
    tracing::info!("Deja Q starting...");

    let mut pipeline = build_pipeline(&ctx).await?;
    tracing::info!(indexed = pipeline.index().len(), "Vector index ready");

    let (event_tx, event_rx) = mpsc::channel(ctx.config.server.queue_capacity.max(1));
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let api_state = api::ApiState {
        signing_secret: ctx.config.slack.signing_secret.clone(),
        events: event_tx,
    };
    if api_state.signing_secret.is_none() {
        tracing::warn!("SLACK_SIGNING_SECRET not set; Slack request signatures are not verified");
    }

    let server_config = ctx.config.server.clone();
    let mut server_stop = stop_rx.clone();
    let server = tokio::spawn(async move {
        let shutdown = async move {
            let _ = server_stop.wait_for(|stopped| *stopped).await;
        };
        if let Err(e) = api::start_server(&server_config, api_state, shutdown).await {
            tracing::error!("Events API server failed: {e}");
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down...");
        }
        let _ = stop_tx.send(true);
    });

    println!("Deja Q running. Press Ctrl+C to stop.");

    tokio::select! {
        processed = run_worker(&mut pipeline, event_rx) => {
            tracing::info!(processed, "Event queue closed");
        }
        _ = stop_rx.wait_for(|stopped| *stopped) => {}
    }

    let _ = server.await;
    tracing::info!("Deja Q stopped");
    Ok(())
}

/// Drain `events` one at a time until every sender is gone. Returns the
/// number of events the pipeline handled (admitted past the filter).
pub async fn run_worker(
    pipeline: &mut IntakePipeline,
    mut events: mpsc::Receiver<serde_json::Value>,
) -> usize {
    let mut handled = 0;
    while let Some(event) = events.recv().await {
        match pipeline.handle_event(&event).await {
            Ok(outcome @ EventOutcome::Handled { .. }) => {
                tracing::debug!(?outcome, "Event handled");
                handled += 1;
            }
            Ok(_) => {}
            Err(e) => tracing::error!("Error handling message: {e}"),
        }
    }
    handled
}
