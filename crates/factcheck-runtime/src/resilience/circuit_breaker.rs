//! Per-collaborator circuit breaker.
//!
//! After repeated failures from the search service or the oracle, the
//! circuit opens and calls short-circuit to the degraded path (a failed
//! bundle, or a `final/unknown` action) without touching the network.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::duration_str;

/// An external service the engine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    Search,
    Reasoner,
    Extractor,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collaborator::Search => f.write_str("search"),
            Collaborator::Reasoner => f.write_str("reasoner"),
            Collaborator::Extractor => f.write_str("extractor"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,

    /// How long an open circuit rejects calls before a trial call
    #[serde(with = "duration_str")]
    pub recovery_timeout: Duration,

    /// Trial successes needed to close a half-open circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

/// Circuit breaker with one independent circuit per [`Collaborator`].
pub struct CircuitBreaker {
    states: RwLock<HashMap<Collaborator, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Whether calls to `who` should be skipped right now.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to
    /// half-open and lets the call through.
    pub fn is_open(&self, who: Collaborator) -> bool {
        let mut states = self.states.write();
        match states.get(&who) {
            Some(CircuitState::Open { opened_at }) => {
                if opened_at.elapsed() >= self.config.recovery_timeout {
                    states.insert(who, CircuitState::HalfOpen { successes: 0 });
                    tracing::info!(collaborator = %who, "Circuit half-open, allowing trial call");
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    pub fn record_success(&self, who: Collaborator) {
        let mut states = self.states.write();
        match states.get(&who).cloned() {
            Some(CircuitState::HalfOpen { successes }) => {
                if successes + 1 >= self.config.success_threshold {
                    states.insert(who, CircuitState::Closed { failures: 0 });
                    tracing::info!(collaborator = %who, "Circuit closed after recovery");
                } else {
                    states.insert(
                        who,
                        CircuitState::HalfOpen {
                            successes: successes + 1,
                        },
                    );
                }
            }
            Some(CircuitState::Closed { failures }) if failures > 0 => {
                states.insert(who, CircuitState::Closed { failures: 0 });
            }
            _ => {}
        }
    }

    pub fn record_failure(&self, who: Collaborator) {
        let mut states = self.states.write();
        let failures = match states.get(&who) {
            Some(CircuitState::Closed { failures }) => *failures + 1,
            None => 1,
            Some(CircuitState::HalfOpen { .. }) => {
                states.insert(
                    who,
                    CircuitState::Open {
                        opened_at: Instant::now(),
                    },
                );
                tracing::warn!(collaborator = %who, "Circuit reopened after failed trial call");
                return;
            }
            Some(CircuitState::Open { .. }) => return,
        };

        if failures >= self.config.failure_threshold {
            states.insert(
                who,
                CircuitState::Open {
                    opened_at: Instant::now(),
                },
            );
            tracing::warn!(collaborator = %who, failures, "Circuit opened after repeated failures");
        } else {
            states.insert(who, CircuitState::Closed { failures });
        }
    }

    pub fn state(&self, who: Collaborator) -> CircuitState {
        self.states
            .read()
            .get(&who)
            .cloned()
            .unwrap_or(CircuitState::Closed { failures: 0 })
    }

    pub fn reset(&self) {
        self.states.write().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("states", &*self.states.read())
            .finish()
    }
}
