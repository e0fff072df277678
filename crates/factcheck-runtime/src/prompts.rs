//! Prompts for the reasoning oracle.
//!
//! The system prompts are constant so the provider can serve them from its
//! prompt cache; only the user message changes between calls.

use std::fmt::Write;

use factcheck_core::{EvidenceBundle, Statement};

/// System prompt for the verdict reasoner.
pub const REASONER_SYSTEM_PROMPT: &str = r#"You are a fact-checking AI. You are given:
1. A claim to verify
2. Evidence gathered so far from web searches

Your task is to decide whether the claim is true, false, or unknown, or to ask for one more search.

## Decision Policy
If multiple independent sources corroborate the statement, conclude true.
If no corroborating sources exist, or contradicting sources outnumber corroborating ones, conclude false.
Reserve unknown strictly for cases where evidence is absent or genuinely ambiguous.

## Requesting More Evidence
If the evidence is insufficient or unclear, request another search:
    {"action": "search", "query": "specific search query to find more information"}

## Final Answer
Otherwise respond with exactly one of:
    {"action": "final", "verdict": "true", "explanation": "detailed explanation"}
    {"action": "final", "verdict": "false", "explanation": "detailed explanation"}
    {"action": "final", "verdict": "unknown", "explanation": "detailed explanation"}

## Rules
- Respond with a single JSON object and nothing else
- "verdict" must be exactly "true", "false" or "unknown" (lowercase)
- Cite the evidence (titles or sources) that supports your explanation
- Searches that failed are marked with "Error"; treat them as missing evidence
"#;

/// Appended to the user message on the last allowed round.
pub const FORCE_FINAL_INSTRUCTION: &str = r#"
The search budget for this claim is exhausted. You MUST respond with a "final" action now.
Do NOT return a "search" action."#;

/// System prompt for the statement extractor.
pub const EXTRACTOR_SYSTEM_PROMPT: &str = r#"You extract factual claims from text so they can be fact-checked.

Return only assertions that can be verified against external sources.

## Exclude
- Opinions and value judgements
- Commands, questions and requests
- Greetings and pleasantries
- Facts about the speaker's own identity ("My name is...", "I am a student")
- Personal anecdotes that no outside source could confirm

## Format
Rewrite each claim as a short, self-contained sentence, keeping names, numbers and dates.
Keep the order in which the claims appear in the text.
Respond with a single JSON object and nothing else:
    {"statements": ["first claim", "second claim"]}
If there are no verifiable claims, respond with {"statements": []}.
"#;

/// Render the evidence trail as the reasoner sees it.
///
/// Searches are numbered from 1 in trail order; every query, error and
/// hit is included.
pub fn render_evidence_trail(trail: &[EvidenceBundle]) -> String {
    let mut out = String::new();

    for (i, bundle) in trail.iter().enumerate() {
        let _ = writeln!(out, "\n--- Search {}: {} ---", i + 1, bundle.query);
        if let Some(error) = &bundle.error {
            let _ = writeln!(out, "Error: {}", error);
        } else if bundle.results.is_empty() {
            let _ = writeln!(out, "No results found");
        }
        for (j, item) in bundle.results.iter().enumerate() {
            let _ = writeln!(out, "\nResult {}:", j + 1);
            let _ = writeln!(out, "Title: {}", or_na(&item.title));
            let _ = writeln!(out, "Snippet: {}", or_na(&item.snippet));
            let _ = writeln!(out, "Source: {}", or_na(&item.link));
        }
    }

    out
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

/// User message for one reasoner call.
pub fn reasoner_user_prompt(
    statement: &Statement,
    trail: &[EvidenceBundle],
    force_final: bool,
) -> String {
    let mut prompt = format!(
        "Claim to verify:\n{}\n\nEvidence from searches:\n{}\n\
         Based on this evidence, determine if the claim is true, false, or unknown. \
         Respond in JSON format only.",
        statement,
        render_evidence_trail(trail)
    );

    if force_final {
        prompt.push_str(FORCE_FINAL_INSTRUCTION);
    }

    prompt
}

/// User message for the extractor.
pub fn extractor_user_prompt(text: &str) -> String {
    format!("Text:\n{}\n\nExtract the verifiable factual claims.", text)
}
