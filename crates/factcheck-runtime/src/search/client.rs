//! Evidence search client.

use std::sync::Arc;
use std::time::Duration;

use factcheck_core::EvidenceBundle;

use super::{SearchError, SearchProvider};
use crate::cache::SearchCache;
use crate::config::SearchConfig;
use crate::resilience::{CircuitBreaker, Collaborator, UsageTracker};

/// Issues one search per call and always answers with a bundle.
///
/// Transport failures, timeouts and an open circuit all come back as an
/// [`EvidenceBundle`] with `error` set; the caller never sees a `Result`.
pub struct EvidenceSearchClient {
    provider: Arc<dyn SearchProvider>,
    result_cap: usize,
    timeout: Duration,
    breaker: Arc<CircuitBreaker>,
    usage: Arc<UsageTracker>,
    cache: Option<SearchCache>,
}

impl EvidenceSearchClient {
    pub fn new(provider: Arc<dyn SearchProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            result_cap: config.result_cap,
            timeout: config.timeout,
            breaker: Arc::new(CircuitBreaker::default()),
            usage: Arc::new(UsageTracker::default()),
            cache: None,
        }
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_cache(mut self, cache: SearchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Search for `query`, returning at most `result_cap` hits.
    pub async fn search(&self, query: &str) -> EvidenceBundle {
        if let Some(cache) = &self.cache {
            if let Some(bundle) = cache.get(query).await {
                tracing::debug!(query, results = bundle.results.len(), "Search cache hit");
                return EvidenceBundle {
                    query: query.to_string(),
                    ..bundle
                };
            }
        }

        let bundle = match self.fetch(query).await {
            Ok(items) => EvidenceBundle::found(query, items).truncate(self.result_cap),
            Err(err) => {
                tracing::warn!(query, error = %err, "Search failed");
                EvidenceBundle::failed(query, err.to_string())
            }
        };

        if let Some(cache) = &self.cache {
            cache.insert(&bundle).await;
        }

        bundle
    }

    async fn fetch(&self, query: &str) -> Result<Vec<factcheck_core::EvidenceItem>, SearchError> {
        if self.breaker.is_open(Collaborator::Search) {
            return Err(SearchError::CircuitOpen);
        }

        self.usage.record_search();
        let outcome = tokio::time::timeout(self.timeout, self.provider.search(query, self.result_cap))
            .await
            .unwrap_or(Err(SearchError::Timeout(self.timeout)));

        match &outcome {
            Ok(items) => {
                self.breaker.record_success(Collaborator::Search);
                tracing::debug!(query, results = items.len(), provider = self.provider.name(), "Search completed");
            }
            Err(_) => self.breaker.record_failure(Collaborator::Search),
        }

        outcome
    }
}

impl std::fmt::Debug for EvidenceSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceSearchClient")
            .field("provider", &self.provider.name())
            .field("result_cap", &self.result_cap)
            .field("timeout", &self.timeout)
            .finish()
    }
}
