//! The reasoner's reply as a strict tagged union.
//!
//! The oracle answers in free-form JSON. Every reply is canonicalized,
//! schema-checked and deserialized into [`ReasonerAction`]; anything that
//! does not fit becomes `final/unknown` with a diagnostic explanation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::schema::{validate_reply, ReplyKind};
use crate::types::Verdict;
use crate::CoreError;

/// What the reasoner wants to do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReasonerAction {
    /// Gather more evidence with this query
    Search {
        #[serde(default)]
        query: String,
    },

    /// Conclude with a verdict
    Final {
        verdict: Verdict,
        #[serde(default)]
        explanation: String,
    },
}

impl ReasonerAction {
    /// A final action with the given verdict.
    pub fn conclude(verdict: Verdict, explanation: impl Into<String>) -> Self {
        ReasonerAction::Final {
            verdict,
            explanation: explanation.into(),
        }
    }

    /// The safe default: `final/unknown`.
    pub fn unknown(explanation: impl Into<String>) -> Self {
        Self::conclude(Verdict::Unknown, explanation)
    }

    /// Strictly parse an oracle reply.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let value: JsonValue = serde_json::from_str(strip_code_fences(raw))
            .map_err(|e| CoreError::MalformedReply(e.to_string()))?;

        let value = canonicalize(value);
        validate_reply(ReplyKind::Reasoner, &value)?;

        serde_json::from_value(value).map_err(|e| CoreError::MalformedReply(e.to_string()))
    }

    /// Parse an oracle reply, normalizing every failure to `final/unknown`.
    ///
    /// Never fails and never panics.
    pub fn from_reply(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(action) => action,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed reasoner reply, concluding unknown");
                Self::unknown(diagnostic(&e))
            }
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, ReasonerAction::Final { .. })
    }
}

/// Human-readable explanation for a reply that could not be used.
fn diagnostic(error: &CoreError) -> String {
    match error {
        CoreError::MalformedReply(msg) => format!("Error parsing reasoner reply: {}", msg),
        CoreError::SchemaViolation(errors) => {
            format!("Invalid reasoner reply format: {}", errors.join("; "))
        }
        other => format!("Reasoner reply rejected: {}", other),
    }
}

/// Map legacy keys onto the canonical ones and lowercase the tags.
///
/// Older prompts used `kind` for `action` and `result` for `verdict`.
fn canonicalize(value: JsonValue) -> JsonValue {
    let JsonValue::Object(mut map) = value else {
        return value;
    };

    rename_key(&mut map, "kind", "action");
    rename_key(&mut map, "result", "verdict");

    for key in ["action", "verdict"] {
        if let Some(JsonValue::String(s)) = map.get_mut(key) {
            *s = s.trim().to_ascii_lowercase();
        }
    }

    JsonValue::Object(map)
}

fn rename_key(map: &mut Map<String, JsonValue>, from: &str, to: &str) {
    if !map.contains_key(to) {
        if let Some(v) = map.remove(from) {
            map.insert(to.to_string(), v);
        }
    }
}

/// Remove a surrounding Markdown code fence, if any.
pub(crate) fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Skip the info string ("json") on the opening line.
    match rest.find('\n') {
        Some(idx) => rest[idx + 1..].trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_search() {
        let action = ReasonerAction::parse(r#"{"action": "search", "query": "moon composition"}"#)
            .unwrap();
        assert_eq!(
            action,
            ReasonerAction::Search {
                query: "moon composition".to_string()
            }
        );
    }

    #[test]
    fn test_parse_final_with_legacy_result_key() {
        let action = ReasonerAction::parse(
            r#"{"action": "final", "result": "TRUE", "explanation": "NASA confirms"}"#,
        )
        .unwrap();
        assert_eq!(action, ReasonerAction::conclude(Verdict::True, "NASA confirms"));
    }

    #[test]
    fn test_parse_kind_alias() {
        let action = ReasonerAction::parse(r#"{"kind": "final", "verdict": "false"}"#).unwrap();
        assert!(action.is_final());
    }

    #[test]
    fn test_parse_fenced_reply() {
        let raw = "```json\n{\"action\": \"final\", \"verdict\": \"unknown\", \"explanation\": \"x\"}\n```";
        assert_eq!(
            ReasonerAction::parse(raw).unwrap(),
            ReasonerAction::unknown("x")
        );
    }

    #[test]
    fn test_invalid_json_normalizes_to_unknown() {
        let action = ReasonerAction::from_reply("The claim is true.");
        match action {
            ReasonerAction::Final { verdict, explanation } => {
                assert_eq!(verdict, Verdict::Unknown);
                assert!(explanation.starts_with("Error parsing reasoner reply"));
            }
            _ => panic!("Expected final action"),
        }
    }

    #[test]
    fn test_missing_action_normalizes_to_unknown() {
        let action = ReasonerAction::from_reply(r#"{"verdict": "true", "explanation": "ok"}"#);
        match action {
            ReasonerAction::Final { verdict, explanation } => {
                assert_eq!(verdict, Verdict::Unknown);
                assert!(explanation.starts_with("Invalid reasoner reply format"));
            }
            _ => panic!("Expected final action"),
        }
    }

    #[test]
    fn test_unexpected_verdict_normalizes_to_unknown() {
        let action = ReasonerAction::from_reply(
            r#"{"action": "final", "verdict": "misleading", "explanation": "partly"}"#,
        );
        assert!(matches!(
            action,
            ReasonerAction::Final {
                verdict: Verdict::Unknown,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_action_normalizes_to_unknown() {
        let action = ReasonerAction::from_reply(r#"{"action": "answer", "verdict": "true"}"#);
        assert!(matches!(
            action,
            ReasonerAction::Final {
                verdict: Verdict::Unknown,
                ..
            }
        ));
    }

    #[test]
    fn test_search_without_query_has_empty_query() {
        let action = ReasonerAction::parse(r#"{"action": "search"}"#).unwrap();
        assert_eq!(action, ReasonerAction::Search { query: String::new() });
    }

    proptest! {
        #[test]
        fn prop_from_reply_never_panics(raw in ".*") {
            let _ = ReasonerAction::from_reply(&raw);
        }

        #[test]
        fn prop_final_verdict_stays_in_vocabulary(verdict in "[a-zA-Z]{0,12}") {
            let raw = format!(r#"{{"action": "final", "verdict": "{}", "explanation": "e"}}"#, verdict);
            if let ReasonerAction::Final { verdict: v, .. } = ReasonerAction::from_reply(&raw) {
                prop_assert!(matches!(v, Verdict::True | Verdict::False | Verdict::Unknown));
                if !matches!(verdict.to_ascii_lowercase().as_str(), "true" | "false" | "unknown") {
                    prop_assert_eq!(v, Verdict::Unknown);
                }
            } else {
                prop_assert!(false, "final reply must stay final");
            }
        }
    }
}
