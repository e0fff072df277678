//! Agent traits and their internal error type.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use factcheck_core::{CoreError, EvidenceBundle, ReasonerAction, Statement};

use crate::providers::ProviderError;
use crate::resilience::Collaborator;

/// Why an oracle call produced nothing usable.
///
/// Never escapes an agent: it is turned into the fallback outcome and
/// logged.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0} circuit open")]
    CircuitOpen(Collaborator),

    #[error("token budget exhausted")]
    BudgetExceeded,

    #[error(transparent)]
    Reply(#[from] CoreError),
}

/// Decides, from the evidence so far, whether to search again or conclude.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Evaluate `statement` against `trail`.
    ///
    /// With `force_final` set the reply must be a `Final` action. Failures
    /// come back as `final/unknown`, never as an error.
    async fn evaluate(
        &self,
        statement: &Statement,
        trail: &[EvidenceBundle],
        force_final: bool,
    ) -> ReasonerAction;
}

/// Turns free text into checkable statements.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract statements in text order. Never fails; may be empty.
    async fn extract(&self, text: &str) -> Vec<Statement>;
}
