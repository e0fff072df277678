//! Statement extraction helpers.
//!
//! The oracle-based extractor lives in the runtime; this module holds the
//! deterministic parts: normalizing the oracle's statement list and the
//! sentence-split fallback used when the oracle path fails.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::oracle::{strip_code_fences, validate_reply, ReplyKind};
use crate::types::Statement;
use crate::CoreError;

/// Fallback fragments must be longer than this many characters.
pub const MIN_FRAGMENT_CHARS: usize = 10;

lazy_static! {
    /// Any run of sentence terminators, whether or not a space follows.
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"[.!?]+").unwrap();
}

#[derive(Debug, Deserialize)]
struct ExtractorReply {
    statements: Vec<String>,
}

/// Parse the extractor oracle's reply into statements.
///
/// Each string is trimmed and stripped of trailing periods; blanks are
/// dropped. Order is preserved.
pub fn parse_extractor_reply(raw: &str) -> Result<Vec<Statement>, CoreError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| CoreError::MalformedReply(e.to_string()))?;

    validate_reply(ReplyKind::Extractor, &value)?;

    let reply: ExtractorReply =
        serde_json::from_value(value).map_err(|e| CoreError::MalformedReply(e.to_string()))?;

    Ok(reply
        .statements
        .iter()
        .filter_map(|s| Statement::new(s).ok())
        .collect())
}

/// Split text into sentence fragments and keep the non-trivial ones.
///
/// This is the last line of defense for extraction: it never fails and
/// returns an empty list when nothing qualifies.
pub fn split_sentences(text: &str) -> Vec<Statement> {
    SENTENCE_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|fragment| fragment.chars().count() > MIN_FRAGMENT_CHARS)
        .filter_map(|fragment| Statement::new(fragment).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fallback_discards_short_fragments() {
        let statements =
            split_sentences("A. B. The global population surpassed 8 billion in 2022.");
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].as_str(),
            "The global population surpassed 8 billion in 2022"
        );
    }

    #[test]
    fn test_fallback_splits_on_all_terminators() {
        let statements = split_sentences(
            "Is the sky blue today? Water boils at 100 degrees Celsius! Paris is in France.",
        );
        let texts: Vec<&str> = statements.iter().map(|s| s.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Is the sky blue today",
                "Water boils at 100 degrees Celsius",
                "Paris is in France"
            ]
        );
    }

    #[test]
    fn test_fallback_splits_without_trailing_space() {
        let statements = split_sentences("Water boils at 100C.It is hot outside today");
        let texts: Vec<&str> = statements.iter().map(|s| s.as_str()).collect();
        assert_eq!(texts, vec!["Water boils at 100C", "It is hot outside today"]);
    }

    #[test]
    fn test_fallback_empty_input() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("Hi. Ok!").is_empty());
    }

    #[test]
    fn test_parse_reply_normalizes_statements() {
        let raw = r#"{"statements": ["  The Earth is round. ", "", "Water is wet."]}"#;
        let statements = parse_extractor_reply(raw).unwrap();
        let texts: Vec<&str> = statements.iter().map(|s| s.as_str()).collect();
        assert_eq!(texts, vec!["The Earth is round", "Water is wet"]);
    }

    #[test]
    fn test_parse_reply_rejects_wrong_shape() {
        assert!(matches!(
            parse_extractor_reply(r#"{"claims": ["x"]}"#),
            Err(CoreError::SchemaViolation(_))
        ));
        assert!(matches!(
            parse_extractor_reply("not json"),
            Err(CoreError::MalformedReply(_))
        ));
    }

    #[test]
    fn test_parse_reply_empty_list_is_valid() {
        let statements = parse_extractor_reply(r#"{"statements": []}"#).unwrap();
        assert!(statements.is_empty());
    }

    proptest! {
        #[test]
        fn prop_fallback_fragments_are_trimmed_and_long(text in ".{0,200}") {
            for statement in split_sentences(&text) {
                let s = statement.as_str();
                prop_assert_eq!(s, s.trim());
                prop_assert!(s.chars().count() > MIN_FRAGMENT_CHARS);
                prop_assert!(!s.contains(['.', '!', '?']));
            }
        }
    }
}
