//! factcheck CLI entrypoint

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use factcheck_core::PublicFilter;
use factcheck_runtime::{
    Collaborator, EvidenceSearchClient, Extractor, FactCheckOrchestrator, GoogleSearchProvider,
    LlmStatementExtractor, OracleClient, ProviderRegistry, RetryPolicy, RuntimeConfig,
};

/// factcheck - extract factual claims from text and verify them against web search
#[derive(Parser, Debug)]
#[command(name = "factcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file (environment variables still apply)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract statements from text and verify each one
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Print the public fact-check cards instead of the full report
        #[arg(long)]
        public: bool,

        /// Only keep refuted statements in the public view
        #[arg(long, requires = "public")]
        refuted_only: bool,

        /// Wrap the report with timestamp, tally and usage
        #[arg(long, conflicts_with = "public")]
        with_metadata: bool,

        /// Search rounds allowed per statement
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Statements verified at the same time
        #[arg(long)]
        concurrency: Option<usize>,

        /// Cancel the batch after this long (e.g. "90s", "2m")
        #[arg(long)]
        deadline: Option<humantime::Duration>,
    },

    /// Print the statements extracted from text
    Extract {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Run one evidence search
    Search {
        /// Search query
        query: String,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Text to process (reads --file or stdin when absent)
    text: Option<String>,

    /// Read text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

impl InputArgs {
    fn read(&self) -> Result<String> {
        let text = match (&self.text, &self.file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            }
        };

        if text.trim().is_empty() {
            bail!("No input text provided");
        }
        Ok(text)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_yaml_file(path)?,
        None => RuntimeConfig::from_env()?,
    };

    match cli.command {
        Commands::Check {
            input,
            public,
            refuted_only,
            with_metadata,
            max_iterations,
            concurrency,
            deadline,
        } => {
            let mut config = config;
            if let Some(n) = max_iterations {
                config.max_iterations = n;
            }
            if let Some(n) = concurrency {
                config.batch.concurrency = n;
            }
            if let Some(deadline) = deadline {
                config.batch.deadline = Some(deadline.into());
            }

            let text = input.read()?;
            let search = GoogleSearchProvider::from_config(&config.search.provider_config)?
                .with_timeout(config.search.timeout);
            let orchestrator = FactCheckOrchestrator::builder()
                .config(config)
                .search_provider(Arc::new(search))
                .build()?;

            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let batch = orchestrator.check_text(&text, &cancel).await?;
            if with_metadata {
                print_json(&batch)?;
            } else if public {
                let filter = if refuted_only {
                    PublicFilter::Refuted
                } else {
                    PublicFilter::All
                };
                print_json(&batch.results.public_view(filter))?;
            } else {
                print_json(&batch.results)?;
            }
        }

        Commands::Extract { input } => {
            let text = input.read()?;
            let provider = ProviderRegistry::with_defaults()
                .create(&config.provider, &config.provider_config)?;
            let oracle = OracleClient::new(provider, config.extractor_completion(), Collaborator::Extractor)
                .with_retry(RetryPolicy::with_max_retries(config.reasoner.max_retries));

            let statements = LlmStatementExtractor::new(oracle).extract(&text).await;
            print_json(&statements)?;
        }

        Commands::Search { query } => {
            let provider = GoogleSearchProvider::from_config(&config.search.provider_config)?
                .with_timeout(config.search.timeout);
            let client = EvidenceSearchClient::new(Arc::new(provider), &config.search);
            print_json(&client.search(&query).await)?;
        }
    }

    Ok(())
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling fact-check");
            cancel.cancel();
        }
    });
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
