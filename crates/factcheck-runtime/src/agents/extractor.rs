//! Statement extractors.

use async_trait::async_trait;

use factcheck_core::{parse_extractor_reply, split_sentences, Statement};

use super::{AgentError, Extractor, OracleClient};
use crate::prompts::{extractor_user_prompt, EXTRACTOR_SYSTEM_PROMPT};

/// Asks the oracle for verifiable claims, falling back to sentence
/// splitting on any failure.
#[derive(Debug, Clone)]
pub struct LlmStatementExtractor {
    oracle: OracleClient,
}

impl LlmStatementExtractor {
    pub fn new(oracle: OracleClient) -> Self {
        Self { oracle }
    }

    async fn extract_with_oracle(&self, text: &str) -> Result<Vec<Statement>, AgentError> {
        let reply = self
            .oracle
            .ask(EXTRACTOR_SYSTEM_PROMPT, extractor_user_prompt(text))
            .await?;
        Ok(parse_extractor_reply(&reply)?)
    }
}

#[async_trait]
impl Extractor for LlmStatementExtractor {
    async fn extract(&self, text: &str) -> Vec<Statement> {
        match self.extract_with_oracle(text).await {
            Ok(statements) => {
                tracing::debug!(count = statements.len(), "Extracted statements");
                statements
            }
            Err(err) => {
                let statements = split_sentences(text);
                tracing::warn!(
                    error = %err,
                    count = statements.len(),
                    "Statement extraction failed, using sentence split"
                );
                statements
            }
        }
    }
}

/// Sentence-split extraction only, for running without an oracle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceSplitExtractor;

#[async_trait]
impl Extractor for SentenceSplitExtractor {
    async fn extract(&self, text: &str) -> Vec<Statement> {
        split_sentences(text)
    }
}
