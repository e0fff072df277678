//! Collaborator doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use factcheck_core::EvidenceItem;
use factcheck_runtime::prompts::EXTRACTOR_SYSTEM_PROMPT;
use factcheck_runtime::providers::{ChatMessage, CompletionResponse};
use factcheck_runtime::{
    CompletionConfig, FactCheckOrchestrator, LlmProvider, ProviderError, RuntimeConfig,
    SearchError, SearchProvider, TokenUsage,
};

type SearchFn = dyn Fn(&str) -> Result<Vec<EvidenceItem>, SearchError> + Send + Sync;

/// Search provider answering from a closure, with an optional per-query delay.
pub struct MockSearch {
    answer: Box<SearchFn>,
    delay: Box<dyn Fn(&str) -> Duration + Send + Sync>,
    pub queries: Mutex<Vec<String>>,
    pub calls: AtomicU32,
}

impl MockSearch {
    pub fn new(
        answer: impl Fn(&str) -> Result<Vec<EvidenceItem>, SearchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            answer: Box::new(answer),
            delay: Box::new(|_| Duration::ZERO),
            queries: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn corroborating() -> Self {
        Self::new(|query| {
            Ok(vec![
                EvidenceItem::new("NASA", format!("{query}: confirmed by satellite imagery"), "https://nasa.gov"),
                EvidenceItem::new("ESA", format!("{query}: measured since antiquity"), "https://esa.int"),
                EvidenceItem::new("Britannica", format!("{query}: established fact"), "https://britannica.com"),
            ])
        })
    }

    pub fn empty() -> Self {
        Self::new(|_| Ok(Vec::new()))
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(SearchError::HttpError("connection refused".to_string())))
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str, _num: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.to_string());

        let delay = (self.delay)(query);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.answer)(query)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Search provider that never answers.
pub struct HangingSearch;

#[async_trait]
impl SearchProvider for HangingSearch {
    async fn search(&self, _query: &str, _num: usize) -> Result<Vec<EvidenceItem>, SearchError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

/// Oracle that routes replies by prompt: extraction requests get the
/// extractor reply, reasoner requests get the queued replies registered
/// for the statement under evaluation.
pub struct RoutedOracle {
    extractor_reply: String,
    reasoner_replies: Mutex<HashMap<String, VecDeque<String>>>,
    pub reasoner_prompts: Mutex<Vec<String>>,
    pub calls: AtomicU32,
}

impl RoutedOracle {
    pub fn new(extractor_reply: impl Into<String>) -> Self {
        Self {
            extractor_reply: extractor_reply.into(),
            reasoner_replies: Mutex::new(HashMap::new()),
            reasoner_prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Extractor reply listing `statements`.
    pub fn extracting(statements: &[&str]) -> Self {
        Self::new(serde_json::json!({ "statements": statements }).to_string())
    }

    pub fn on(self, statement: &str, replies: impl IntoIterator<Item = String>) -> Self {
        self.reasoner_replies
            .lock()
            .insert(statement.to_string(), replies.into_iter().collect());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn reasoner_reply(&self, prompt: &str) -> String {
        let mut replies = self.reasoner_replies.lock();
        replies
            .iter_mut()
            .find(|(statement, _)| prompt.contains(&format!("Claim to verify:\n{}\n", statement)))
            .and_then(|(_, queue)| queue.pop_front())
            .unwrap_or_else(|| final_reply("unknown", "No scripted reply"))
    }
}

#[async_trait]
impl LlmProvider for RoutedOracle {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let is_extraction = messages
            .iter()
            .any(|m| m.role == "system" && m.content == EXTRACTOR_SYSTEM_PROMPT);
        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let content = if is_extraction {
            self.extractor_reply.clone()
        } else {
            self.reasoner_prompts.lock().push(user.clone());
            self.reasoner_reply(&user)
        };

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 50,
                completion_tokens: 10,
                cached_tokens: 0,
            },
            model: config.model.clone(),
            stop_reason: Some("stop".to_string()),
        })
    }

    fn name(&self) -> &str {
        "routed"
    }
}

pub fn final_reply(verdict: &str, explanation: &str) -> String {
    serde_json::json!({
        "action": "final",
        "verdict": verdict,
        "explanation": explanation,
    })
    .to_string()
}

pub fn search_reply(query: &str) -> String {
    serde_json::json!({ "action": "search", "query": query }).to_string()
}

/// Defaults with pacing fast enough not to slow the tests down.
pub fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.batch.rate_per_second = 10_000;
    config.reasoner.max_retries = 0;
    config
}

pub fn orchestrator(
    config: RuntimeConfig,
    search: Arc<dyn SearchProvider>,
    oracle: Arc<dyn LlmProvider>,
) -> FactCheckOrchestrator {
    FactCheckOrchestrator::builder()
        .config(config)
        .search_provider(search)
        .llm_provider(oracle)
        .build()
        .expect("valid test configuration")
}
