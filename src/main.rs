use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tracing::warn;

use docrag::config::Config;
use docrag::embedder::remote::RemoteEmbedder;
use docrag::eval::EvalCase;
use docrag::generate::remote::ChatGenerator;
use docrag::generate::{GenerateError, Generator};
use docrag::service::RagService;
use docrag::store::CorpusStore;

#[derive(Parser)]
#[command(name = "docrag", version, about = "Private-corpus document Q&A")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Rebuild the corpus index from the documents already stored
    Rebuild,
    /// Ask a single question from the command line
    Ask { question: String },
    /// Score retrieval quality against a JSON case file
    Eval {
        /// JSON array of {question, source_doc} cases
        cases: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

/// Stands in when no generation API key is configured; retrieval-only
/// commands still work, and /ask reports the missing key instead of the
/// process refusing to start.
struct UnconfiguredGenerator {
    api_key_env: String,
}

#[async_trait]
impl Generator for UnconfiguredGenerator {
    async fn generate(&self, _question: &str, _context: &str) -> Result<String, GenerateError> {
        Err(GenerateError::MissingApiKey(self.api_key_env.clone()))
    }
}

fn build_generator(config: &Config) -> Arc<dyn Generator> {
    match ChatGenerator::from_config(&config.generation) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            warn!("Generation disabled: {e}");
            Arc::new(UnconfiguredGenerator {
                api_key_env: config.generation.api_key_env.clone(),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    config.validate()?;

    let embedder = Arc::new(
        RemoteEmbedder::from_config(&config.embedding)
            .context("failed to construct embedding client")?,
    );
    let generator = build_generator(&config);
    let top_k = config.search_top_k;
    let bind = config.server.bind.clone();
    let data_dir = config.data_dir.clone();
    let service = Arc::new(RagService::new(config, embedder, generator)?);

    match cli.command {
        Command::Serve => {
            docrag::server::serve(service, &bind).await?;
        }
        Command::Rebuild => {
            let report = service.rebuild().await?;
            println!(
                "Snapshot {} published: {} documents, {} chunks",
                report.version, report.documents, report.chunks
            );
            for skipped in &report.skipped {
                println!("skipped {}: {}", skipped.name, skipped.detail);
            }
        }
        Command::Ask { question } => {
            let outcome = service.ask(&question).await?;
            println!("{}", outcome.answer);
            println!();
            for (rank, hit) in outcome.sources.iter().enumerate() {
                println!(
                    "{}. {} (distance {:.4})",
                    rank + 1,
                    hit.record.chunk_id,
                    hit.distance
                );
            }
        }
        Command::Eval { cases, top_k: k } => {
            let data = std::fs::read_to_string(&cases)
                .with_context(|| format!("failed to read case file {cases}"))?;
            let cases: Vec<EvalCase> =
                serde_json::from_str(&data).context("case file must be a JSON array")?;
            let summary = docrag::eval::run(&service, &cases, k.unwrap_or(top_k)).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);

            let store = CorpusStore::open(&data_dir)?;
            let coverage = docrag::eval::coverage(&store)?;
            println!(
                "coverage: {} text chars -> {} chunked chars (ratio {:.2})",
                coverage.text_chars, coverage.chunk_chars, coverage.ratio
            );
        }
    }

    Ok(())
}
