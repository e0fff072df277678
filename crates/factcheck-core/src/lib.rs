//! # factcheck-core
//!
//! Deterministic data model for claim verification.
//!
//! This crate holds everything about fact-checking that does not touch the
//! network:
//! - the records that flow through the engine ([`Statement`],
//!   [`EvidenceBundle`], [`CheckResult`], [`Report`])
//! - strict parsing of reasoning-oracle replies into [`ReasonerAction`]
//! - the sentence-split fallback for statement extraction
//! - the public verdict vocabulary applied at the boundary
//!
//! ## Key Guarantees
//!
//! 1. **Closed verdicts**: every verdict is `true`, `false` or `unknown`,
//!    whatever the oracle replied
//! 2. **No panics on oracle text**: malformed replies normalize to
//!    `final/unknown` with a diagnostic explanation
//! 3. **No I/O**: all network work lives in `factcheck-runtime`
//!
//! ## Example
//!
//! ```rust,ignore
//! use factcheck_core::{ReasonerAction, Verdict};
//!
//! let action = ReasonerAction::from_reply(r#"{"action": "final", "verdict": "true"}"#);
//! assert!(matches!(action, ReasonerAction::Final { verdict: Verdict::True, .. }));
//! ```

pub mod extraction;
pub mod oracle;
pub mod report;
pub mod types;

// Re-export main types at crate root
pub use extraction::{parse_extractor_reply, split_sentences, MIN_FRAGMENT_CHARS};
pub use oracle::{validate_reply, ReasonerAction, ReplyKind};
pub use report::{PublicFactCheck, PublicFilter, PublicSource, PublicVerdict, Report, VerdictTally};
pub use types::{CheckResult, EvidenceBundle, EvidenceItem, Statement, Verdict, NO_EXPLANATION};

use thiserror::Error;

/// Errors from the core data model.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Empty statement provided")]
    EmptyStatement,

    #[error("Malformed oracle reply: {0}")]
    MalformedReply(String),

    #[error("Oracle reply does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Failed to load schema: {0}")]
    SchemaLoad(String),
}
