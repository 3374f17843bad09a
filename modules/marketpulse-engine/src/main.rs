use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use marketpulse_analyst::{Claude, ClaudeClassifier, ClaudeReviewer, ClaudeScorer};
use marketpulse_common::Config;
use marketpulse_engine::crawl::{Crawler, JsonFileCrawler};
use marketpulse_engine::PipelineOrchestrator;
use marketpulse_store::MemoryStore;

#[derive(Parser)]
#[command(name = "marketpulse", about = "Temporal market-event scoring pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one pipeline run over the given crawl batches.
    Run {
        /// JSON crawl batch file; repeat for multiple sources.
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { inputs } => run(inputs).await,
    }
}

async fn run(inputs: Vec<PathBuf>) -> Result<()> {
    let config = Config::from_env();
    let claude = Claude::new(&config.anthropic_api_key, &config.claude_model)
        .with_timeout(std::time::Duration::from_secs(config.collaborator_timeout_secs));

    let crawlers: Vec<Box<dyn Crawler>> = inputs
        .into_iter()
        .map(|path| Box::new(JsonFileCrawler::new(path)) as Box<dyn Crawler>)
        .collect();

    let orchestrator = PipelineOrchestrator::new(
        MemoryStore::new(),
        Arc::new(ClaudeClassifier::new(claude.clone())),
        Arc::new(ClaudeScorer::new(claude.clone())),
        Arc::new(ClaudeReviewer::new(claude)),
        crawlers,
        config,
    );

    let stats = orchestrator.run().await?;
    println!("{stats}");
    Ok(())
}
