//! Token and call accounting.
//!
//! Every oracle completion and every search call is recorded here. Each
//! batch gets its own tracker with an optional token budget that stops
//! further oracle calls once spent; callers then take the same degraded
//! path as an oracle failure. Batch trackers forward what they record to
//! a lifetime tracker owned by the orchestrator.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::providers::TokenUsage;

/// A token allowance shared by concurrent tasks.
pub struct TokenBudget {
    pub max_tokens: u32,
    used: AtomicU32,
}

impl TokenBudget {
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            used: AtomicU32::new(0),
        }
    }

    pub fn can_afford(&self, tokens: u32) -> bool {
        self.remaining() >= tokens
    }

    pub fn record(&self, tokens: u32) {
        self.used.fetch_add(tokens, Ordering::SeqCst);
    }

    pub fn remaining(&self) -> u32 {
        self.max_tokens.saturating_sub(self.used.load(Ordering::SeqCst))
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }
}

/// Accumulated usage for one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,

    /// Prompt tokens served from the provider's prompt cache
    pub cached_tokens: u32,

    /// Oracle completions made (extractor and reasoner)
    pub llm_calls: u32,

    /// Searches issued to the provider (cache hits excluded)
    pub search_calls: u32,

    /// Estimated cost in USD
    pub estimated_cost: f64,
}

impl LlmUsage {
    pub fn add(&mut self, usage: &TokenUsage, model: &str) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.cached_tokens += usage.cached_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;
        self.estimated_cost += Self::estimate_cost(usage, model);
    }

    fn estimate_cost(usage: &TokenUsage, model: &str) -> f64 {
        // USD per million tokens: (input, cached input, output)
        let (input_rate, cached_rate, output_rate) = match model {
            m if m.contains("gpt-4o-mini") => (0.15, 0.075, 0.6),
            m if m.contains("gpt-4o") => (2.5, 1.25, 10.0),
            m if m.contains("gpt-4.1-mini") => (0.4, 0.1, 1.6),
            m if m.contains("gpt-4.1") => (2.0, 0.5, 8.0),
            _ => (0.15, 0.075, 0.6),
        };

        let cached = usage.cached_tokens.min(usage.prompt_tokens);
        let uncached = usage.prompt_tokens - cached;

        (uncached as f64 / 1_000_000.0) * input_rate
            + (cached as f64 / 1_000_000.0) * cached_rate
            + (usage.completion_tokens as f64 / 1_000_000.0) * output_rate
    }
}

/// Usage tracker shared by the extractor, reasoner and search client.
pub struct UsageTracker {
    global_budget: Option<TokenBudget>,
    usage: RwLock<LlmUsage>,
    parent: Option<Arc<UsageTracker>>,
}

impl UsageTracker {
    /// Tracker with no token limit.
    pub fn unlimited() -> Self {
        Self {
            global_budget: None,
            usage: RwLock::new(LlmUsage::default()),
            parent: None,
        }
    }

    /// Tracker that refuses oracle calls once `max_tokens` are spent.
    pub fn with_budget(max_tokens: u32) -> Self {
        Self {
            global_budget: Some(TokenBudget::new(max_tokens)),
            usage: RwLock::new(LlmUsage::default()),
            parent: None,
        }
    }

    pub fn from_limit(limit: Option<u32>) -> Self {
        match limit {
            Some(max) => Self::with_budget(max),
            None => Self::unlimited(),
        }
    }

    /// Fresh tracker whose records also land in `parent`.
    pub fn child_of(parent: Arc<UsageTracker>, limit: Option<u32>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::from_limit(limit)
        }
    }

    pub fn can_afford(&self, estimated_tokens: u32) -> bool {
        let own = self
            .global_budget
            .as_ref()
            .map_or(true, |b| b.can_afford(estimated_tokens));
        own && self
            .parent
            .as_ref()
            .map_or(true, |p| p.can_afford(estimated_tokens))
    }

    pub fn record_llm(&self, usage: &TokenUsage, model: &str) {
        if let Some(budget) = &self.global_budget {
            budget.record(usage.total());
        }
        self.usage.write().add(usage, model);
        if let Some(parent) = &self.parent {
            parent.record_llm(usage, model);
        }
    }

    pub fn record_search(&self) {
        self.usage.write().search_calls += 1;
        if let Some(parent) = &self.parent {
            parent.record_search();
        }
    }

    pub fn snapshot(&self) -> LlmUsage {
        self.usage.read().clone()
    }

    pub fn remaining(&self) -> Option<u32> {
        self.global_budget.as_ref().map(TokenBudget::remaining)
    }
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::unlimited()
    }
}
