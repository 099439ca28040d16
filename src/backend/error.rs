//! Language-level errors raised by node execution and the external collaborators.
//!
//! Every variant is user-visible and catchable by the surrounding program. The
//! typed-mismatch signal of the speculative entry points is not part of this
//! enum; see [`crate::backend::nodes::Speculated`].

use std::fmt;

/// Result type for node execution and collaborator calls
pub type JsResult<T> = Result<T, JsError>;

/// Errors surfaced to the executing program
#[derive(Debug, Clone, PartialEq)]
pub enum JsError {
    /// Assignment target is `null` or `undefined` and cannot act as a receiver
    TypeCoercion(String),

    /// Any other TypeError (rejected store, wrong receiver, null options)
    Type(String),

    /// Option value or option combination outside the allowed set
    Range(String),

    /// Pattern rejected at compile time
    PatternSyntax { pattern: String, message: String },

    /// Locale or formatting data could not be loaded
    ResourceUnavailable(String),

    /// Wrong number of arguments passed to a collaborator entry point
    Arity { expected: usize, actual: usize },

    /// Argument of the wrong kind passed to a collaborator entry point
    UnsupportedType(String),
}

impl JsError {
    /// Name of the language-level error class this error is reported as
    pub fn class_name(&self) -> &'static str {
        match self {
            JsError::TypeCoercion(_) | JsError::Type(_) | JsError::UnsupportedType(_) => {
                "TypeError"
            }
            JsError::Range(_) => "RangeError",
            JsError::PatternSyntax { .. } => "SyntaxError",
            JsError::ResourceUnavailable(_) => "Error",
            JsError::Arity { .. } => "TypeError",
        }
    }

    /// True for every variant reported as a `TypeError`
    pub fn is_type_error(&self) -> bool {
        self.class_name() == "TypeError"
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsError::TypeCoercion(msg) => write!(f, "TypeError: {}", msg),
            JsError::Type(msg) => write!(f, "TypeError: {}", msg),
            JsError::Range(msg) => write!(f, "RangeError: {}", msg),
            JsError::PatternSyntax { pattern, message } => {
                write!(f, "SyntaxError: Invalid regular expression: /{}/: {}", pattern, message)
            }
            JsError::ResourceUnavailable(msg) => write!(f, "Error: {}", msg),
            JsError::Arity { expected, actual } => {
                write!(f, "TypeError: expected at most {} arguments, got {}", expected, actual)
            }
            JsError::UnsupportedType(msg) => write!(f, "TypeError: unsupported argument: {}", msg),
        }
    }
}

impl std::error::Error for JsError {}
