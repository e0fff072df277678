//! Cache of successful search results.
//!
//! Keyed by the normalised query text. Only error-free bundles are
//! stored, so a failing provider is asked again on every call.

use moka::future::Cache;

use factcheck_core::EvidenceBundle;

use crate::config::CacheConfig;

/// In-memory search cache using moka.
#[derive(Clone)]
pub struct SearchCache {
    cache: Cache<String, EvidenceBundle>,
}

impl SearchCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, query: &str) -> Option<EvidenceBundle> {
        self.cache.get(&cache_key(query)).await
    }

    /// Store a bundle; failed bundles are ignored.
    pub async fn insert(&self, bundle: &EvidenceBundle) {
        if bundle.is_error() {
            return;
        }
        self.cache
            .insert(cache_key(&bundle.query), bundle.clone())
            .await;
    }
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl std::fmt::Debug for SearchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

/// Lowercased, whitespace-collapsed query.
fn cache_key(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
