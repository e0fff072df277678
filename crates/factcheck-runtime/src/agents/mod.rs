//! The two oracle-backed agents: statement extraction and verdict reasoning.
//!
//! Both are traits so the verification loop and the batch coordinator can
//! run against scripted doubles. The LLM implementations never return an
//! error to their caller; failures degrade to the documented fallback.

mod extractor;
mod oracle;
mod traits;
mod verdict;

pub use extractor::{LlmStatementExtractor, SentenceSplitExtractor};
pub use oracle::OracleClient;
pub use traits::{AgentError, Extractor, Reasoner};
pub use verdict::LlmVerdictReasoner;
