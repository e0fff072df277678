//! Core types for claim verification.
//!
//! These are the records that flow through the engine: statements come in,
//! evidence bundles accumulate, and one [`CheckResult`] comes out per statement.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Explanation used when the reasoning oracle gives none.
pub const NO_EXPLANATION: &str = "No explanation provided";

/// A short, self-contained factual assertion.
///
/// Always non-empty, trimmed, and without trailing sentence punctuation.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Statement(String);

impl Statement {
    /// Create a statement from raw text.
    ///
    /// Surrounding whitespace and trailing periods are removed. Returns
    /// [`CoreError::EmptyStatement`] if nothing is left.
    pub fn new(text: impl AsRef<str>) -> Result<Self, CoreError> {
        let cleaned = text
            .as_ref()
            .trim()
            .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

        if cleaned.is_empty() {
            return Err(CoreError::EmptyStatement);
        }

        Ok(Self(cleaned.to_string()))
    }

    /// The statement text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Statement {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Statement {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Statement> for String {
    fn from(statement: Statement) -> Self {
        statement.0
    }
}

/// Tri-state adjudication outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    True,
    False,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "true",
            Verdict::False => "false",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search hit.
///
/// Missing fields are empty strings, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub snippet: String,

    #[serde(default)]
    pub link: String,
}

impl EvidenceItem {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            link: link.into(),
        }
    }
}

/// The result of one search query.
///
/// A bundle with `error` set records a failed search; its results are empty
/// or a best-effort partial list. No error does not imply any results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// The query as issued
    pub query: String,

    /// Human-readable failure cause, present only on search failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Search hits in provider order
    #[serde(default)]
    pub results: Vec<EvidenceItem>,
}

impl EvidenceBundle {
    /// A successful search (possibly with zero hits).
    pub fn found(query: impl Into<String>, results: Vec<EvidenceItem>) -> Self {
        Self {
            query: query.into(),
            error: None,
            results,
        }
    }

    /// A failed search.
    pub fn failed(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            error: Some(error.into()),
            results: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Drop results beyond `cap`.
    pub fn truncate(mut self, cap: usize) -> Self {
        self.results.truncate(cap);
        self
    }
}

/// Outcome of verifying one statement.
///
/// `evidence` is in chronological search order and is never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub statement: Statement,

    pub verdict: Verdict,

    /// Always non-empty
    pub explanation: String,

    #[serde(rename = "evidence")]
    pub evidence_trail: Vec<EvidenceBundle>,
}

impl CheckResult {
    /// Build a result; a blank explanation is replaced with [`NO_EXPLANATION`].
    pub fn new(
        statement: Statement,
        verdict: Verdict,
        explanation: impl Into<String>,
        evidence_trail: Vec<EvidenceBundle>,
    ) -> Self {
        let explanation = explanation.into();
        let explanation = if explanation.trim().is_empty() {
            NO_EXPLANATION.to_string()
        } else {
            explanation
        };

        Self {
            statement,
            verdict,
            explanation,
            evidence_trail,
        }
    }

    /// A result for a statement whose check failed internally.
    pub fn errored(
        statement: Statement,
        cause: impl fmt::Display,
        evidence_trail: Vec<EvidenceBundle>,
    ) -> Self {
        Self::new(
            statement,
            Verdict::Unknown,
            format!("Error during fact-checking: {}", cause),
            evidence_trail,
        )
    }

    /// Number of searches that contributed to this result.
    pub fn search_count(&self) -> usize {
        self.evidence_trail.len()
    }

    /// All evidence items across the trail, in trail order.
    pub fn sources(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.evidence_trail.iter().flat_map(|b| b.results.iter())
    }
}
