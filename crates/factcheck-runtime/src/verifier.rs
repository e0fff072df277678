//! The per-statement search/reason loop.
//!
//! ```text
//! INIT -> SEARCHING -> EVALUATING -+-> FINAL
//!             ^                    |
//!             +---- search action -+
//! ```
//!
//! The first search always uses the statement text. The reasoner is told
//! to conclude on the last round (`force_final`), and the loop stops after
//! `max_iterations` searches whatever the reasoner answers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use factcheck_core::{CheckResult, ReasonerAction, Statement, Verdict};

use crate::agents::Reasoner;
use crate::search::EvidenceSearchClient;
use crate::RuntimeError;

enum LoopState {
    Searching { query: String },
    Evaluating,
}

/// Explanation for a statement that ran out of search rounds.
pub fn budget_exhausted_explanation(searches: usize) -> String {
    format!(
        "Unable to reach a conclusion after {} searches (iteration budget exhausted).",
        searches
    )
}

/// Drives one statement through search and evaluation rounds.
pub struct VerificationLoop {
    search: Arc<EvidenceSearchClient>,
    reasoner: Arc<dyn Reasoner>,
    max_iterations: u32,
}

impl VerificationLoop {
    /// `max_iterations` below 1 is treated as 1.
    pub fn new(
        search: Arc<EvidenceSearchClient>,
        reasoner: Arc<dyn Reasoner>,
        max_iterations: u32,
    ) -> Self {
        Self {
            search,
            reasoner,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Validate `text` and verify it as a single statement.
    pub async fn check_statement(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, RuntimeError> {
        let statement = Statement::new(text)?;
        let span = tracing::info_span!("verify_statement", index = 0usize);
        self.verify(statement, cancel).instrument(span).await
    }

    /// Run the loop to completion.
    ///
    /// Only cancellation is an error; search and reasoner failures end up
    /// in the returned result.
    pub async fn verify(
        &self,
        statement: Statement,
        cancel: &CancellationToken,
    ) -> Result<CheckResult, RuntimeError> {
        tracing::info!(statement = %statement, "Fact-checking statement");

        let mut trail = Vec::new();
        let mut iteration: u32 = 0;
        let mut state = LoopState::Searching {
            query: statement.as_str().to_string(),
        };

        loop {
            state = match state {
                LoopState::Searching { query } => {
                    let bundle = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                        bundle = self.search.search(&query) => bundle,
                    };
                    tracing::debug!(
                        iteration,
                        query = %bundle.query,
                        results = bundle.results.len(),
                        error = bundle.error.as_deref(),
                        "Evidence gathered"
                    );
                    trail.push(bundle);
                    LoopState::Evaluating
                }

                LoopState::Evaluating => {
                    let force_final = iteration + 1 >= self.max_iterations;
                    let action = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                        action = self.reasoner.evaluate(&statement, &trail, force_final) => action,
                    };

                    match action {
                        ReasonerAction::Final {
                            verdict,
                            explanation,
                        } => {
                            tracing::info!(
                                statement = %statement,
                                verdict = %verdict,
                                searches = trail.len(),
                                "Verdict reached"
                            );
                            return Ok(CheckResult::new(statement, verdict, explanation, trail));
                        }
                        ReasonerAction::Search { query } => {
                            iteration += 1;
                            if iteration >= self.max_iterations {
                                tracing::warn!(
                                    statement = %statement,
                                    searches = trail.len(),
                                    "Iteration budget exhausted"
                                );
                                let explanation = budget_exhausted_explanation(trail.len());
                                return Ok(CheckResult::new(
                                    statement,
                                    Verdict::Unknown,
                                    explanation,
                                    trail,
                                ));
                            }

                            let query = if query.trim().is_empty() {
                                statement.as_str().to_string()
                            } else {
                                query
                            };
                            tracing::debug!(iteration, query = %query, "Reasoner requested another search");
                            LoopState::Searching { query }
                        }
                    }
                }
            };
        }
    }
}

impl std::fmt::Debug for VerificationLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationLoop")
            .field("search", &self.search)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}
