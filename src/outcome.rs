//! Invocation outcomes and the hand-built error report payload.
//!
//! The error payload is assembled with plain string formatting. It must not
//! go through serde: a failure in the serializer while reporting a failure
//! would leave the invocation unreported.

use crate::errors::RuntimeError;
use std::fmt::Write;

/// Message reported when a failure carries no message of its own.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// What the runtime tells the host about one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeReport {
    /// The handler finished; reported with a `null` body.
    Success,
    /// Decoding or handling failed.
    Failure(ErrorReport),
}

impl OutcomeReport {
    /// Convert the result of the dispatch step into a report.
    pub fn from_result(result: &crate::Result<()>) -> Self {
        match result {
            Ok(()) => OutcomeReport::Success,
            Err(e) => OutcomeReport::Failure(ErrorReport::from_error(e)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeReport::Success)
    }

    /// The error report, if this is a failure.
    pub fn failure(&self) -> Option<&ErrorReport> {
        match self {
            OutcomeReport::Success => None,
            OutcomeReport::Failure(report) => Some(report),
        }
    }
}

/// Body of an error report: `{"errorType":"…","errorMessage":"…"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub error_type: String,
    pub error_message: String,
}

impl ErrorReport {
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        let error_message = error_message.into();
        Self {
            error_type: error_type.into(),
            error_message: if error_message.is_empty() {
                UNKNOWN_ERROR_MESSAGE.to_string()
            } else {
                error_message
            },
        }
    }

    pub fn from_error(err: &RuntimeError) -> Self {
        Self::new(err.error_type(), err.error_message())
    }

    /// Render the wire payload.
    pub fn to_json(&self) -> String {
        format!(
            "{{\"errorType\":\"{}\",\"errorMessage\":\"{}\"}}",
            escape_json(&self.error_type),
            escape_json(&self.error_message)
        )
    }
}

/// Escape text for use inside a JSON string literal.
///
/// Backslash and double quote are escaped, and so are control characters,
/// so multi-line messages still produce a valid document.
pub fn escape_json(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c < '\u{20}' => {
                // Writing to a String cannot fail.
                let _ = write!(escaped, "\\u{:04x}", u32::from(c));
            }
            c => escaped.push(c),
        }
    }
    escaped
}
