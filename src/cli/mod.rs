// src/cli/mod.rs — CLI definition (clap derive)

pub mod announce;
pub mod query;
pub mod serve;
pub mod summarize;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::infra::config::Config;
use crate::integrations::SlackAdapter;
use crate::provider::ollama::OllamaProvider;
use crate::provider::retry::Retrying;
use crate::provider::{Embedder, Generator};

#[derive(Parser)]
#[command(
    name = "dejaq",
    about = "Points repeat questions in a Slack channel at the thread that already answered them",
    version
)]
pub struct Cli {
    /// Config file path (default: ~/.dejaq/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index the channel and answer new questions as they arrive
    Serve,
    /// Rank indexed channel messages against a question
    Query {
        /// Question text
        text: String,
        /// Similarity threshold (defaults to dedup.similarity_threshold)
        #[arg(short, long)]
        threshold: Option<f32>,
    },
    /// Post a message to the configured channel
    Announce {
        /// Message text (default: the online announcement)
        text: Option<String>,
    },
    /// Summarize the answer in an existing thread
    Summarize {
        /// Timestamp of the thread's parent message
        thread_ts: String,
    },
}

/// Collaborators shared by every command that talks to Slack and Ollama.
pub struct Services {
    pub slack: Arc<SlackAdapter>,
    pub ollama: Arc<OllamaProvider>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

impl Services {
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        let slack = Arc::new(SlackAdapter::new(config.require_bot_token()?));
        let ollama = Arc::new(OllamaProvider::new(&config.ollama)?);
        Ok(Self {
            slack,
            embedder: Arc::new(Retrying::new(ollama.clone())),
            generator: Arc::new(Retrying::new(ollama.clone())),
            ollama,
        })
    }
}
