//! Failure taxonomy shared across the squill pipeline.
//!
//! Three stages, three policies:
//!
//! - Lexer errors accumulate during scanning but are fatal to the tokenize
//!   operation: a non-empty list surfaces as one [`TokenizeError`].
//! - Parser errors ([`ParsingError`]) accumulate in-band; the parser
//!   recovers and keeps going, so callers get a partial AST plus the list.
//! - Analysis errors ([`AnalysisError`]) accumulate in the analysis context
//!   with a severity; the analyzer never aborts while there is a tree to
//!   walk.

use std::fmt;

use squill_ast::{NodeId, Span};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Lexer errors
// ---------------------------------------------------------------------------

/// What went wrong while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    UnterminatedString,
    UnterminatedBlockComment,
    UnexpectedCharacter(char),
    /// A literal that scanned but does not denote a value (odd blob digit
    /// count, out-of-range number, empty parameter name).
    MalformedLiteral(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => f.write_str("unterminated string literal"),
            Self::UnterminatedBlockComment => f.write_str("unterminated block comment"),
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            Self::MalformedLiteral(detail) => write!(f, "malformed literal: {detail}"),
        }
    }
}

/// One scanning failure with its source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {span}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// The cumulated tokenizer failure: scanning finished, but the error list
/// was non-empty, so the tokenize operation as a whole fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError {
    pub errors: Vec<LexError>,
}

impl std::error::Error for TokenizeError {}

impl TokenizeError {
    #[must_use]
    pub fn new(errors: Vec<LexError>) -> Self {
        Self { errors }
    }
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tokenizing failed with {} error(s)", self.errors.len())?;
        if let Some(first) = self.errors.first() {
            write!(f, ": {first}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parser errors
// ---------------------------------------------------------------------------

/// A recoverable parse failure: message plus the span of the offending
/// token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {span}")]
pub struct ParsingError {
    pub message: String,
    pub span: Span,
}

impl ParsingError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis errors
// ---------------------------------------------------------------------------

/// How bad an analysis finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The statement cannot be soundly consumed downstream.
    Critical,
    /// Suspicious but usable (e.g. a duplicate table alias).
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
        })
    }
}

/// One analysis finding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{severity}: {message} at {span}")]
pub struct AnalysisError {
    pub message: String,
    pub severity: Severity,
    pub span: Span,
    /// The node the finding is attached to, when there is one.
    pub affected: Option<NodeId>,
}

impl AnalysisError {
    #[must_use]
    pub fn critical(message: impl Into<String>, span: Span, affected: Option<NodeId>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Critical,
            span,
            affected,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>, span: Span, affected: Option<NodeId>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
            span,
            affected,
        }
    }

    #[must_use]
    pub const fn is_critical(&self) -> bool {
        matches!(self.severity, Severity::Critical)
    }
}
