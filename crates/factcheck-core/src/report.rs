//! The batch report and its caller-facing view.
//!
//! A [`Report`] serializes as an ordered list of check results. The public
//! vocabulary (`verified` / `false` / `unverifiable`) is applied only when
//! building the [`PublicFactCheck`] view at the boundary.

use serde::{Deserialize, Serialize};

use crate::types::{CheckResult, Verdict};

/// Ordered check results, one per extracted statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    results: Vec<CheckResult>,
}

impl Report {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<CheckResult> {
        self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CheckResult> {
        self.results.iter()
    }

    /// Count results per verdict.
    pub fn tally(&self) -> VerdictTally {
        let mut tally = VerdictTally::default();
        for result in &self.results {
            match result.verdict {
                Verdict::True => tally.verified += 1,
                Verdict::False => tally.refuted += 1,
                Verdict::Unknown => tally.unknown += 1,
            }
        }
        tally
    }

    /// Build the caller-facing fact-check cards.
    pub fn public_view(&self, filter: PublicFilter) -> Vec<PublicFactCheck> {
        self.results
            .iter()
            .filter(|r| filter.accepts(r.verdict))
            .map(PublicFactCheck::from)
            .collect()
    }
}

impl FromIterator<CheckResult> for Report {
    fn from_iter<I: IntoIterator<Item = CheckResult>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Report {
    type Item = &'a CheckResult;
    type IntoIter = std::slice::Iter<'a, CheckResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Verdict counts for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictTally {
    pub verified: usize,
    pub refuted: usize,
    pub unknown: usize,
}

/// Verdict vocabulary shown to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicVerdict {
    Verified,
    False,
    Unverifiable,
}

impl From<Verdict> for PublicVerdict {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::True => PublicVerdict::Verified,
            Verdict::False => PublicVerdict::False,
            Verdict::Unknown => PublicVerdict::Unverifiable,
        }
    }
}

/// Which results make it into the public view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PublicFilter {
    /// Every statement
    #[default]
    All,
    /// Only statements judged false
    Refuted,
}

impl PublicFilter {
    fn accepts(&self, verdict: Verdict) -> bool {
        match self {
            PublicFilter::All => true,
            PublicFilter::Refuted => verdict == Verdict::False,
        }
    }
}

/// A cited source in the public view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSource {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// One fact-check card for an end-user UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicFactCheck {
    pub claim: String,
    pub verdict: PublicVerdict,
    pub explanation: String,
    pub sources: Vec<PublicSource>,
}

impl From<&CheckResult> for PublicFactCheck {
    fn from(result: &CheckResult) -> Self {
        Self {
            claim: result.statement.to_string(),
            verdict: result.verdict.into(),
            explanation: result.explanation.clone(),
            sources: result
                .sources()
                .map(|item| PublicSource {
                    title: item.title.clone(),
                    url: item.link.clone(),
                    snippet: item.snippet.clone(),
                })
                .collect(),
        }
    }
}
