//! Resilience around the external collaborators.
//!
//! - Circuit breaker per collaborator (search, reasoner, extractor)
//! - Token usage tracking with an optional global budget
//! - Retry with exponential backoff for transient oracle errors

mod budget;
mod circuit_breaker;
mod retry;

pub use budget::{LlmUsage, TokenBudget, UsageTracker};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Collaborator};
pub use retry::{retry_transient, RetryPolicy};
