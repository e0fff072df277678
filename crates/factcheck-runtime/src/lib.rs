//! # factcheck-runtime
//!
//! Search-augmented verification of factual claims.
//!
//! This crate does everything in fact-checking that touches the network:
//! - statement extraction through a reasoning oracle, with a
//!   sentence-split fallback
//! - evidence search against a web search API, cached and bounded
//! - the per-statement search/reason [`VerificationLoop`]
//! - the batch coordinator, [`FactCheckOrchestrator`]
//!
//! Deterministic parsing and the report model live in `factcheck-core`.
//!
//! ## Failure model
//!
//! A single statement never fails a batch. Search failures are recorded in
//! the evidence trail, oracle failures and malformed replies conclude
//! `unknown`, and a panicking check is reported as an `unknown` result.
//! Only cancellation, invalid configuration and blank input are errors.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use factcheck_runtime::{FactCheckOrchestrator, GoogleSearchProvider, RuntimeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = RuntimeConfig::from_env()?;
//! let search = GoogleSearchProvider::from_config(&config.search.provider_config)?;
//! let orchestrator = FactCheckOrchestrator::builder()
//!     .config(config)
//!     .search_provider(Arc::new(search))
//!     .build()?;
//!
//! let batch = orchestrator
//!     .check_text("The Eiffel Tower is in Berlin.", &CancellationToken::new())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&batch.results)?);
//! ```

pub mod agents;
pub mod cache;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod search;
pub mod verifier;

pub use agents::{
    AgentError, Extractor, LlmStatementExtractor, LlmVerdictReasoner, OracleClient, Reasoner,
    SentenceSplitExtractor,
};
pub use cache::SearchCache;
pub use config::{
    BatchConfig, CacheConfig, ExtractorConfig, ReasonerConfig, RuntimeConfig, SearchConfig,
};
pub use orchestrator::{BatchReport, FactCheckOrchestrator, FactCheckOrchestratorBuilder};
pub use providers::{
    ApiCredential, CompletionConfig, LlmProvider, ProviderError, ProviderRegistry, TokenUsage,
};
pub use resilience::{CircuitBreakerConfig, Collaborator, LlmUsage, RetryPolicy, UsageTracker};
pub use search::{EvidenceSearchClient, SearchError, SearchProvider};
pub use verifier::{budget_exhausted_explanation, VerificationLoop};

#[cfg(feature = "google")]
pub use search::GoogleSearchProvider;

#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;

use thiserror::Error;

use factcheck_core::CoreError;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Fact-check cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
