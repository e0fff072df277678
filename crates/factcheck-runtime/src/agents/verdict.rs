//! LLM-backed verdict reasoner.

use async_trait::async_trait;

use factcheck_core::{EvidenceBundle, ReasonerAction, Statement};

use super::{OracleClient, Reasoner};
use crate::prompts::{reasoner_user_prompt, REASONER_SYSTEM_PROMPT};

/// Explanation used when the oracle asks to search on the last round.
pub(crate) const SEARCH_ON_FINAL_ROUND: &str =
    "Unable to reach a conclusion: the reasoner requested another search after the iteration budget was exhausted.";

/// Asks the oracle for the next action given the evidence trail.
#[derive(Debug, Clone)]
pub struct LlmVerdictReasoner {
    oracle: OracleClient,
}

impl LlmVerdictReasoner {
    pub fn new(oracle: OracleClient) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl Reasoner for LlmVerdictReasoner {
    async fn evaluate(
        &self,
        statement: &Statement,
        trail: &[EvidenceBundle],
        force_final: bool,
    ) -> ReasonerAction {
        let prompt = reasoner_user_prompt(statement, trail, force_final);

        let action = match self.oracle.ask(REASONER_SYSTEM_PROMPT, prompt).await {
            Ok(reply) => ReasonerAction::from_reply(&reply),
            Err(err) => {
                tracing::warn!(statement = %statement, error = %err, "Reasoner call failed, concluding unknown");
                ReasonerAction::unknown(format!("LLM error: {}", err))
            }
        };

        match action {
            ReasonerAction::Search { query } if force_final => {
                tracing::warn!(statement = %statement, query, "Reasoner ignored final-round instruction");
                ReasonerAction::unknown(SEARCH_ON_FINAL_ROUND)
            }
            action => action,
        }
    }
}
