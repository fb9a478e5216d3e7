//! Unified, `miette`-based diagnostic system for the Mantra engine.
//!
//! All failure modes of the crate are represented by [`MantraError`]. Two of
//! its variants carry very different contracts and callers must treat them
//! accordingly:
//!
//! - [`MantraError::MatchFailure`] is *expected* control flow: a pattern did
//!   not fit the value. Rewrite passes branch on it (`if let Err(..)` /
//!   fallback arms) to implement switch-style dispatch.
//! - [`MantraError::PatternConflict`] is a programming error raised while
//!   *constructing* a matcher, never while matching. It signals a malformed
//!   pattern and is not meant to be caught.
//!
//! Traversal and pattern-compilation errors are fatal: a failed rewrite
//! leaves the tree in an unspecified state, so callers must abandon the
//! whole expansion.

use miette::{Diagnostic, LabeledSpan, SourceCode};
use thiserror::Error;

use crate::ast::Span;

/// Type-safe error classification corresponding to `MantraError` variants.
/// Used by tests and callers that dispatch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Fatal walker errors: unrecognized node shape, illegal rewrite.
    Traversal,
    /// Pattern compilation errors: unrecognized pattern form, unknown type.
    Pattern,
    /// Expected match failures that drive branching.
    MatchFailure,
    /// Construction-time variable conflicts in composite matchers.
    PatternConflict,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Traversal => "Traversal",
            ErrorType::Pattern => "Pattern",
            ErrorType::MatchFailure => "MatchFailure",
            ErrorType::PatternConflict => "PatternConflict",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for all Mantra failure modes.
#[derive(Debug, Error)]
pub enum MantraError {
    #[error("Traversal error: {message}")]
    Traversal { message: String, span: Option<Span> },
    #[error("Pattern error: {message}")]
    Pattern { message: String, span: Option<Span> },
    #[error("Pattern match failed: {message}")]
    MatchFailure { message: String },
    #[error("Pattern variable conflict: '{name}' is bound by more than one sibling matcher")]
    PatternConflict { name: String },
}

impl MantraError {
    /// Returns the type-safe classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            MantraError::Traversal { .. } => ErrorType::Traversal,
            MantraError::Pattern { .. } => ErrorType::Pattern,
            MantraError::MatchFailure { .. } => ErrorType::MatchFailure,
            MantraError::PatternConflict { .. } => ErrorType::PatternConflict,
        }
    }

    /// True for the recoverable, branch-driving match failure.
    pub fn is_match_failure(&self) -> bool {
        matches!(self, MantraError::MatchFailure { .. })
    }

    /// The source span this error points at, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            MantraError::Traversal { span, .. } => *span,
            MantraError::Pattern { span, .. } => *span,
            MantraError::MatchFailure { .. } | MantraError::PatternConflict { .. } => None,
        }
    }
}

impl Diagnostic for MantraError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("mantra::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            MantraError::PatternConflict { .. } => Some(Box::new(
                "rename one of the pattern variables; sibling matchers must bind disjoint names",
            )),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span()?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(self.to_string()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

// =============================
// Error constructor helpers
// =============================

/// Fatal traversal error: unrecognized node shape or illegal rewrite.
pub fn traversal_error(message: impl Into<String>, span: Option<Span>) -> MantraError {
    MantraError::Traversal {
        message: message.into(),
        span,
    }
}

/// Pattern compilation error: the AST form is not a recognizable pattern.
pub fn pattern_error(message: impl Into<String>, span: Option<Span>) -> MantraError {
    MantraError::Pattern {
        message: message.into(),
        span,
    }
}

/// Expected match failure with a human-readable diagnostic.
pub fn match_failure(message: impl Into<String>) -> MantraError {
    MantraError::MatchFailure {
        message: message.into(),
    }
}

/// Construction-time variable conflict in a composite matcher.
pub fn variable_conflict(name: impl Into<String>) -> MantraError {
    MantraError::PatternConflict { name: name.into() }
}
