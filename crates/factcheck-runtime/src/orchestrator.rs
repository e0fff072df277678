//! Batch coordinator.
//!
//! Extracts statements from free text, verifies each one with the
//! [`VerificationLoop`], and assembles the report in extraction order.
//!
//! - Statement checks run as separate tasks, capped by a semaphore
//!   (`batch.concurrency`) and paced by a token bucket
//!   (`batch.rate_per_second`)
//! - A failed or panicked check becomes an `unknown` result; the rest of
//!   the batch carries on
//! - Cancellation (caller token or `batch.deadline`) stops queued and
//!   in-flight checks and fails the batch with [`RuntimeError::Cancelled`]
//! - `token_budget` applies to each call on its own; overlapping batches
//!   never see each other's usage

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use factcheck_core::{
    split_sentences, CheckResult, CoreError, EvidenceBundle, Report, Statement, VerdictTally,
};

use crate::agents::{
    Extractor, LlmStatementExtractor, LlmVerdictReasoner, OracleClient, Reasoner,
};
use crate::cache::SearchCache;
use crate::config::{RuntimeConfig, SearchConfig};
use crate::providers::{CompletionConfig, LlmProvider, ProviderRegistry};
use crate::resilience::{CircuitBreaker, Collaborator, LlmUsage, RetryPolicy, UsageTracker};
use crate::search::{EvidenceSearchClient, SearchProvider};
use crate::verifier::VerificationLoop;
use crate::RuntimeError;

/// A report plus the metadata of the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub checked_at: DateTime<Utc>,
    pub tally: VerdictTally,

    /// Oracle and search usage of this batch
    pub usage: LlmUsage,

    pub results: Report,
}

/// Where an agent comes from: injected as-is, or built per call over the
/// oracle provider so its usage lands in that call's tracker.
enum AgentSource<T: ?Sized> {
    Injected(Arc<T>),
    Oracle(Arc<dyn LlmProvider>),
}

/// Collaborators wired to one call's usage tracker.
struct Session {
    usage: Arc<UsageTracker>,
    extractor: Arc<dyn Extractor>,
    search: Arc<EvidenceSearchClient>,
    verifier: Arc<VerificationLoop>,
}

/// Runs extraction and per-statement verification for whole texts.
///
/// Each call gets its own usage tracker, holding the configured token
/// budget, which forwards into the lifetime tracker behind [`usage`].
///
/// [`usage`]: FactCheckOrchestrator::usage
pub struct FactCheckOrchestrator {
    extractor: AgentSource<dyn Extractor>,
    reasoner: AgentSource<dyn Reasoner>,
    search_provider: Arc<dyn SearchProvider>,
    search_config: SearchConfig,
    cache: Option<SearchCache>,
    breaker: Arc<CircuitBreaker>,
    extractor_completion: CompletionConfig,
    reasoner_completion: CompletionConfig,
    retry: RetryPolicy,
    max_iterations: u32,
    token_budget: Option<u32>,
    usage: Arc<UsageTracker>,
    pacer: Arc<DefaultDirectRateLimiter>,
    concurrency: usize,
    deadline: Option<Duration>,
}

impl FactCheckOrchestrator {
    pub fn builder() -> FactCheckOrchestratorBuilder {
        FactCheckOrchestratorBuilder::new()
    }

    /// Extract statements from `text` and verify each of them.
    pub async fn check_text(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, RuntimeError> {
        if text.trim().is_empty() {
            return Err(CoreError::EmptyStatement.into());
        }

        let cancel = cancel.child_token();
        // Stops spawned checks if this future is dropped or times out
        let _guard = cancel.clone().drop_guard();
        let session = self.session();

        let batch = self.run_batch(&session, text, &cancel);
        let report = match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, batch).await {
                Ok(report) => report?,
                Err(_) => {
                    tracing::warn!(deadline = ?deadline, "Batch deadline exceeded, cancelling");
                    return Err(RuntimeError::Cancelled);
                }
            },
            None => batch.await?,
        };

        let tally = report.tally();
        let usage = session.usage.snapshot();
        tracing::info!(
            statements = report.len(),
            verified = tally.verified,
            refuted = tally.refuted,
            unknown = tally.unknown,
            llm_calls = usage.llm_calls,
            tokens = usage.total_tokens,
            "Batch complete"
        );

        Ok(BatchReport {
            checked_at: Utc::now(),
            tally,
            usage,
            results: report,
        })
    }

    /// Verify one caller-supplied statement, skipping extraction.
    pub async fn check_statement(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, RuntimeError> {
        self.session().verifier.check_statement(text, cancel).await
    }

    /// Run only the extraction step.
    pub async fn extract(&self, text: &str) -> Vec<Statement> {
        self.session().extractor.extract(text).await
    }

    /// Run a single evidence search.
    pub async fn search(&self, query: &str) -> EvidenceBundle {
        self.session().search.search(query).await
    }

    /// Usage accumulated over this orchestrator's lifetime.
    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }

    fn session(&self) -> Session {
        let usage = Arc::new(UsageTracker::child_of(
            Arc::clone(&self.usage),
            self.token_budget,
        ));

        let mut search =
            EvidenceSearchClient::new(Arc::clone(&self.search_provider), &self.search_config)
                .with_circuit_breaker(Arc::clone(&self.breaker))
                .with_usage(Arc::clone(&usage));
        if let Some(cache) = &self.cache {
            search = search.with_cache(cache.clone());
        }
        let search = Arc::new(search);

        let extractor: Arc<dyn Extractor> = match &self.extractor {
            AgentSource::Injected(extractor) => Arc::clone(extractor),
            AgentSource::Oracle(provider) => Arc::new(LlmStatementExtractor::new(
                self.oracle(provider, Collaborator::Extractor, &usage),
            )),
        };
        let reasoner: Arc<dyn Reasoner> = match &self.reasoner {
            AgentSource::Injected(reasoner) => Arc::clone(reasoner),
            AgentSource::Oracle(provider) => Arc::new(LlmVerdictReasoner::new(
                self.oracle(provider, Collaborator::Reasoner, &usage),
            )),
        };
        let verifier = Arc::new(VerificationLoop::new(
            Arc::clone(&search),
            reasoner,
            self.max_iterations,
        ));

        Session {
            usage,
            extractor,
            search,
            verifier,
        }
    }

    fn oracle(
        &self,
        provider: &Arc<dyn LlmProvider>,
        role: Collaborator,
        usage: &Arc<UsageTracker>,
    ) -> OracleClient {
        let completion = match role {
            Collaborator::Extractor => self.extractor_completion.clone(),
            _ => self.reasoner_completion.clone(),
        };
        OracleClient::new(Arc::clone(provider), completion, role)
            .with_retry(self.retry)
            .with_circuit_breaker(Arc::clone(&self.breaker))
            .with_usage(Arc::clone(usage))
    }

    async fn run_batch(
        &self,
        session: &Session,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Report, RuntimeError> {
        let statements = extract_statements(&session.extractor, text, cancel).await?;
        tracing::info!(count = statements.len(), "Statements extracted");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = statements
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, statement)| {
                let verifier = Arc::clone(&session.verifier);
                let semaphore = Arc::clone(&semaphore);
                let pacer = Arc::clone(&self.pacer);
                let cancel = cancel.clone();
                let span = tracing::info_span!("verify_statement", index);

                tokio::spawn(
                    async move {
                        let _permit = tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                            permit = semaphore.acquire_owned() => {
                                permit.map_err(|_| RuntimeError::Cancelled)?
                            }
                        };
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                            _ = pacer.until_ready() => {}
                        }
                        verifier.verify(statement, &cancel).await
                    }
                    .instrument(span),
                )
            })
            .collect();

        let outcomes = join_all(handles).await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (statement, outcome) in statements.into_iter().zip(outcomes) {
            match outcome {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(RuntimeError::Cancelled)) => return Err(RuntimeError::Cancelled),
                Ok(Err(err)) => {
                    tracing::error!(statement = %statement, error = %err, "Fact-check failed");
                    results.push(CheckResult::errored(statement, err, Vec::new()));
                }
                Err(join_err) => {
                    tracing::error!(statement = %statement, error = %join_err, "Fact-check task aborted");
                    results.push(CheckResult::errored(statement, join_err, Vec::new()));
                }
            }
        }

        Ok(results.into_iter().collect())
    }
}

/// Run the extractor in its own task. A panic there falls back to plain
/// sentence splitting, the same as any other extraction failure.
async fn extract_statements(
    extractor: &Arc<dyn Extractor>,
    text: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Statement>, RuntimeError> {
    let extractor = Arc::clone(extractor);
    let owned = text.to_string();
    let task = tokio::spawn(async move { extractor.extract(&owned).await });
    let abort = task.abort_handle();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            abort.abort();
            Err(RuntimeError::Cancelled)
        }
        joined = task => match joined {
            Ok(statements) => Ok(statements),
            Err(err) => {
                let statements = split_sentences(text);
                tracing::warn!(
                    error = %err,
                    count = statements.len(),
                    "Extractor task failed, using sentence split"
                );
                Ok(statements)
            }
        },
    }
}

impl std::fmt::Debug for FactCheckOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactCheckOrchestrator")
            .field("search_provider", &self.search_provider.name())
            .field("max_iterations", &self.max_iterations)
            .field("token_budget", &self.token_budget)
            .field("concurrency", &self.concurrency)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Builder for [`FactCheckOrchestrator`].
///
/// A search provider is required. The reasoner and extractor default to
/// the LLM implementations over the configured oracle provider, which is
/// created from the [`ProviderRegistry`] unless one is supplied.
pub struct FactCheckOrchestratorBuilder {
    config: RuntimeConfig,
    search_provider: Option<Arc<dyn SearchProvider>>,
    llm_provider: Option<Arc<dyn LlmProvider>>,
    reasoner: Option<Arc<dyn Reasoner>>,
    extractor: Option<Arc<dyn Extractor>>,
}

impl FactCheckOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            search_provider: None,
            llm_provider: None,
            reasoner: None,
            extractor: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search_provider = Some(provider);
        self
    }

    pub fn llm_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.llm_provider = Some(provider);
        self
    }

    pub fn reasoner(mut self, reasoner: Arc<dyn Reasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn build(self) -> Result<FactCheckOrchestrator, RuntimeError> {
        let config = self.config;
        config.validate()?;

        let search_provider = self.search_provider.ok_or_else(|| {
            RuntimeError::NotConfigured("no search provider set".to_string())
        })?;

        let mut llm = self.llm_provider;
        let reasoner = match self.reasoner {
            Some(reasoner) => AgentSource::Injected(reasoner),
            None => AgentSource::Oracle(resolve_llm(&mut llm, &config)?),
        };
        let extractor = match self.extractor {
            Some(extractor) => AgentSource::Injected(extractor),
            None => AgentSource::Oracle(resolve_llm(&mut llm, &config)?),
        };

        let cache = config.cache.enabled.then(|| SearchCache::new(&config.cache));
        let rate = NonZeroU32::new(config.batch.rate_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(FactCheckOrchestrator {
            extractor,
            reasoner,
            search_provider,
            cache,
            breaker: Arc::new(CircuitBreaker::new(config.circuit_breaker.clone())),
            extractor_completion: config.extractor_completion(),
            reasoner_completion: config.reasoner_completion(),
            retry: RetryPolicy::with_max_retries(config.reasoner.max_retries),
            max_iterations: config.max_iterations,
            token_budget: config.token_budget,
            usage: Arc::new(UsageTracker::unlimited()),
            pacer: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
            concurrency: config.batch.concurrency,
            deadline: config.batch.deadline,
            search_config: config.search,
        })
    }
}

impl Default for FactCheckOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_llm(
    slot: &mut Option<Arc<dyn LlmProvider>>,
    config: &RuntimeConfig,
) -> Result<Arc<dyn LlmProvider>, RuntimeError> {
    if let Some(provider) = slot {
        return Ok(Arc::clone(provider));
    }

    let registry = ProviderRegistry::with_defaults();
    registry.validate(&config.provider, &config.provider_config)?;
    let provider = registry.create(&config.provider, &config.provider_config)?;
    tracing::debug!(provider = provider.name(), "Created oracle provider");
    *slot = Some(Arc::clone(&provider));
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::SentenceSplitExtractor;
    use crate::providers::testing::ScriptedProvider;
    use crate::search::SearchError;
    use async_trait::async_trait;
    use factcheck_core::{EvidenceItem, ReasonerAction, Verdict};

    struct FixedSearch;

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, query: &str, _num: usize) -> Result<Vec<EvidenceItem>, SearchError> {
            Ok(vec![EvidenceItem::new(query, "snippet", "https://example.com")])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct PanickyReasoner;

    #[async_trait]
    impl Reasoner for PanickyReasoner {
        async fn evaluate(
            &self,
            statement: &Statement,
            _trail: &[EvidenceBundle],
            _force_final: bool,
        ) -> ReasonerAction {
            if statement.as_str().contains("panic") {
                panic!("reasoner blew up");
            }
            ReasonerAction::conclude(Verdict::True, "fine")
        }
    }

    struct PanickyExtractor;

    #[async_trait]
    impl Extractor for PanickyExtractor {
        async fn extract(&self, _text: &str) -> Vec<Statement> {
            panic!("extractor blew up");
        }
    }

    fn fast_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.batch.rate_per_second = 1_000;
        config
    }

    #[test]
    fn test_build_requires_search_provider() {
        let err = FactCheckOrchestrator::builder()
            .reasoner(Arc::new(PanickyReasoner))
            .extractor(Arc::new(SentenceSplitExtractor))
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::NotConfigured(_)));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = fast_config();
        config.max_iterations = 0;
        let err = FactCheckOrchestrator::builder()
            .config(config)
            .search_provider(Arc::new(FixedSearch))
            .reasoner(Arc::new(PanickyReasoner))
            .extractor(Arc::new(SentenceSplitExtractor))
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }

    #[cfg(not(feature = "openai"))]
    #[test]
    fn test_missing_oracle_provider_is_reported() {
        let err = FactCheckOrchestrator::builder()
            .search_provider(Arc::new(FixedSearch))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Unknown provider type"));
    }

    #[tokio::test]
    async fn test_panicking_check_is_isolated() {
        let orchestrator = FactCheckOrchestrator::builder()
            .config(fast_config())
            .search_provider(Arc::new(FixedSearch))
            .reasoner(Arc::new(PanickyReasoner))
            .extractor(Arc::new(SentenceSplitExtractor))
            .build()
            .unwrap();

        let report = orchestrator
            .check_text(
                "Water boils at 100 degrees. This one will panic for sure. Paris is in France.",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let verdicts: Vec<Verdict> = report.results.iter().map(|r| r.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::True, Verdict::Unknown, Verdict::True]);
        let failed = &report.results.results()[1];
        assert!(failed.explanation.starts_with("Error during fact-checking:"));
        assert!(failed.evidence_trail.is_empty());
        assert_eq!(report.tally.verified, 2);
    }

    #[tokio::test]
    async fn test_panicking_extractor_falls_back_to_sentence_split() {
        let orchestrator = FactCheckOrchestrator::builder()
            .config(fast_config())
            .search_provider(Arc::new(FixedSearch))
            .reasoner(Arc::new(PanickyReasoner))
            .extractor(Arc::new(PanickyExtractor))
            .build()
            .unwrap();

        let report = orchestrator
            .check_text(
                "Water boils at 100 degrees. Paris is in France today.",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let statements: Vec<&str> = report.results.iter().map(|r| r.statement.as_str()).collect();
        assert_eq!(statements, vec!["Water boils at 100 degrees", "Paris is in France today"]);
        assert_eq!(report.tally.verified, 2);
    }

    #[tokio::test]
    async fn test_llm_agents_share_one_provider() {
        let provider = Arc::new(ScriptedProvider::replying(&[
            r#"{"statements": ["The Earth orbits the Sun"]}"#,
            r#"{"action": "final", "verdict": "true", "explanation": "Astronomy"}"#,
        ]));
        let orchestrator = FactCheckOrchestrator::builder()
            .config(fast_config())
            .search_provider(Arc::new(FixedSearch))
            .llm_provider(provider.clone())
            .build()
            .unwrap();

        let report = orchestrator
            .check_text("I think the Earth orbits the Sun.", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results.results()[0].verdict, Verdict::True);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(report.usage.llm_calls, 2);
        assert_eq!(report.usage.search_calls, 1);
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let orchestrator = FactCheckOrchestrator::builder()
            .config(fast_config())
            .search_provider(Arc::new(FixedSearch))
            .reasoner(Arc::new(PanickyReasoner))
            .extractor(Arc::new(SentenceSplitExtractor))
            .build()
            .unwrap();

        let err = orchestrator
            .check_text("  \n ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Core(CoreError::EmptyStatement)));
    }
}
