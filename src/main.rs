// src/main.rs — Deja Q entry point

use clap::Parser;

use dejaq::cli::{Cli, Commands};
use dejaq::infra::config::Config;
use dejaq::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respects RUST_LOG, falls back to --log-level
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        let mut config = Config::load_from(std::path::Path::new(path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Serve => dejaq::cli::serve::run_serve(config).await,
        Commands::Query { text, threshold } => {
            dejaq::cli::query::run_query(&config, &text, threshold).await
        }
        Commands::Announce { text } => {
            dejaq::cli::announce::run_announce(&config, text.as_deref()).await
        }
        Commands::Summarize { thread_ts } => {
            dejaq::cli::summarize::run_summarize(&config, &thread_ts).await
        }
    }
}
