//! One guarded round-trip to the reasoning oracle.

use std::sync::Arc;

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::resilience::{retry_transient, CircuitBreaker, Collaborator, RetryPolicy, UsageTracker};

use super::AgentError;

/// An [`LlmProvider`] wrapped with timeout, retry, circuit breaker and
/// usage accounting for one collaborator role.
#[derive(Clone)]
pub struct OracleClient {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    usage: Arc<UsageTracker>,
    role: Collaborator,
}

impl OracleClient {
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig, role: Collaborator) -> Self {
        Self {
            provider,
            completion,
            retry: RetryPolicy::default(),
            breaker: Arc::new(CircuitBreaker::default()),
            usage: Arc::new(UsageTracker::default()),
            role,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.usage = usage;
        self
    }

    pub fn completion(&self) -> &CompletionConfig {
        &self.completion
    }

    /// Send a system + user message pair and return the reply text.
    ///
    /// The configured timeout bounds the whole call, retries included.
    pub async fn ask(&self, system: &str, user: String) -> Result<String, AgentError> {
        if self.breaker.is_open(self.role) {
            return Err(AgentError::CircuitOpen(self.role));
        }

        let estimated = self.provider.estimate_tokens(system)
            + self.provider.estimate_tokens(&user)
            + self.completion.max_tokens;
        if !self.usage.can_afford(estimated) {
            return Err(AgentError::BudgetExceeded);
        }

        let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];
        let call = retry_transient(&self.retry, || {
            self.provider.complete(messages.clone(), &self.completion)
        });

        let outcome = match tokio::time::timeout(self.completion.timeout, call).await {
            Ok(Ok(response)) => {
                self.usage.record_llm(&response.usage, &response.model);
                Ok(response.content)
            }
            Ok(Err(err)) => Err(AgentError::Provider(err)),
            Err(_) => Err(AgentError::Timeout(self.completion.timeout)),
        };

        match &outcome {
            Ok(_) => self.breaker.record_success(self.role),
            Err(err) => {
                tracing::debug!(role = %self.role, provider = self.provider.name(), error = %err, "Oracle call failed");
                self.breaker.record_failure(self.role);
            }
        }

        outcome
    }
}

impl std::fmt::Debug for OracleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleClient")
            .field("provider", &self.provider.name())
            .field("model", &self.completion.model)
            .field("role", &self.role)
            .finish()
    }
}
