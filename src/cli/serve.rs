// src/cli/serve.rs — Long-running bot

use crate::cli::Services;
use crate::infra::config::Config;
use crate::infra::daemon::{self, DaemonContext};

pub async fn run_serve(config: Config) -> anyhow::Result<()> {
    let services = Services::connect(&config)?;

    let identity = services.slack.validate().await?;
    tracing::info!("{identity}");

    match services.ollama.probe().await {
        Ok(available) => {
            for model in services.ollama.missing_models(&available) {
                tracing::warn!("Ollama model '{model}' is not pulled. Run `ollama pull {model}`.");
            }
        }
        Err(e) => tracing::warn!("{e}"),
    }

    daemon::run(DaemonContext {
        config,
        history: services.slack.clone(),
        replies: services.slack,
        embedder: services.embedder,
        generator: services.generator,
    })
    .await
}
