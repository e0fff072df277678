//! Oracle reply handling.
//!
//! The reasoning oracle is an untrusted text source. This module turns its
//! replies into typed values and never lets a parse failure escape as a panic.

mod action;
mod schema;

pub use action::ReasonerAction;
pub use schema::{validate_reply, ReplyKind};

pub(crate) use action::strip_code_fences;
