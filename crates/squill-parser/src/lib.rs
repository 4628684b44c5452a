//! Lexer and recursive-descent SQL parser for the squill front-end.
//!
//! Hand-written scanner and parser with Pratt precedence climbing for
//! expressions, producing arena nodes from `squill-ast`. Lexer errors
//! accumulate and fail the strict tokenize operation as a unit; parser
//! errors accumulate while panic-mode recovery keeps producing partial
//! statements.

pub mod expr;
pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::{Lexer, LexMetricsSnapshot, lex_metrics_snapshot, reset_lex_metrics};
pub use parser::{
    MAX_PARSE_DEPTH, ParseMetricsSnapshot, ParseResult, Parser, parse, parse_metrics_snapshot,
    parse_multiple, reset_parse_metrics,
};
pub use token::{Token, TokenKind};
