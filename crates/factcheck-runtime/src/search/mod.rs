//! Web search providers and the evidence search client.
//!
//! [`SearchProvider`] is the raw transport: one query in, hits or a typed
//! error out. [`EvidenceSearchClient`] wraps a provider with the result
//! cap, timeout, circuit breaker and cache, and turns every failure into
//! an error-bearing [`EvidenceBundle`](factcheck_core::EvidenceBundle).

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use factcheck_core::EvidenceItem;

mod client;

#[cfg(feature = "google")]
mod google;

pub use client::EvidenceSearchClient;

#[cfg(feature = "google")]
pub use google::GoogleSearchProvider;

/// Errors from a search provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    HttpError(String),

    #[error("Search timeout after {0:?}")]
    Timeout(Duration),

    #[error("Search API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Search response parse error: {0}")]
    ParseError(String),

    #[error("Search provider not configured: {0}")]
    NotConfigured(String),

    #[error("search circuit open")]
    CircuitOpen,
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, asking for at most `num` hits.
    ///
    /// Zero matches is `Ok(vec![])`, not an error.
    async fn search(&self, query: &str, num: usize) -> Result<Vec<EvidenceItem>, SearchError>;

    fn name(&self) -> &str;
}
