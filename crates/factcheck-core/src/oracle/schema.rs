//! JSON Schema validation for oracle replies.
//!
//! Replies are validated against the schemas in `schemas/` before they are
//! deserialized, so a reply either matches the documented shape exactly or
//! is reported with the offending instance paths.

use std::sync::OnceLock;

use crate::CoreError;

/// Embedded reasoner reply schema (loaded at compile time).
const REASONER_SCHEMA_JSON: &str = include_str!("../../schemas/reasoner_reply.schema.json");

/// Embedded extractor reply schema (loaded at compile time).
const EXTRACTOR_SCHEMA_JSON: &str = include_str!("../../schemas/extractor_reply.schema.json");

static REASONER_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static EXTRACTOR_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Which reply shape to validate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Reasoner,
    Extractor,
}

fn compile(source: &str) -> Result<jsonschema::Validator, String> {
    let schema_value: serde_json::Value = match serde_json::from_str(source) {
        Ok(v) => v,
        Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
    };

    match jsonschema::options().build(&schema_value) {
        Ok(v) => Ok(v),
        Err(e) => Err(format!("Failed to compile schema: {}", e)),
    }
}

fn get_validator(kind: ReplyKind) -> Result<&'static jsonschema::Validator, CoreError> {
    let result = match kind {
        ReplyKind::Reasoner => REASONER_SCHEMA.get_or_init(|| compile(REASONER_SCHEMA_JSON)),
        ReplyKind::Extractor => EXTRACTOR_SCHEMA.get_or_init(|| compile(EXTRACTOR_SCHEMA_JSON)),
    };

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(CoreError::SchemaLoad(e.clone())),
    }
}

/// Validate a reply against its schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_reply(kind: ReplyKind, reply: &serde_json::Value) -> Result<(), CoreError> {
    let validator = get_validator(kind)?;

    let errors: Vec<String> = validator
        .iter_errors(reply)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::SchemaViolation(errors))
    }
}
