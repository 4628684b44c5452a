//! Squill: a SQL front-end engine.
//!
//! Turns SQLite-dialect SQL into a typed, scope-resolved AST suitable for
//! downstream code generation. Three stages run in order — tokenize,
//! parse, analyze — fronted by [`Engine`], which owns the registered-table
//! snapshot.
//!
//! ```
//! use squill::{Column, ColumnType, Engine, Table};
//!
//! let mut engine = Engine::new();
//! engine.register_table(Table::new(
//!     "demo",
//!     vec![
//!         Column::new("id", ColumnType::Integer, false),
//!         Column::new("content", ColumnType::Text, true),
//!     ],
//! ));
//!
//! let ctx = engine.analyze("SELECT * FROM demo WHERE id = ?");
//! assert!(!ctx.has_critical_errors());
//! ```
//!
//! The engine is single-threaded: a pure function from (source string,
//! table snapshot) to an analysis context. `register_table` mutates the
//! snapshot and must not race an in-flight operation; concurrent callers
//! use independent engines or synchronize externally.

pub use squill_analyzer::{AnalysisContext, ColumnBinding, Symbol};
pub use squill_ast::{Ast, NodeId, NodeKind, Span};
pub use squill_error::{
    AnalysisError, LexError, LexErrorKind, ParsingError, Severity, TokenizeError,
};
pub use squill_parser::{ParseResult, Token, TokenKind};
pub use squill_types::{
    BaseType, Column, ColumnFeature, ColumnType, ResolveResult, ResolvedType, Table, TypeHint,
};

/// The engine facade: a registered-table snapshot plus the public
/// operations of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    tables: Vec<Table>,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table to the known-table list. No validation: the caller
    /// (a host-language DSL parser) is trusted.
    pub fn register_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// The registered-table snapshot.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Tokenize `source`. Scanning itself never aborts, but a non-empty
    /// error list fails the operation as a unit.
    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>, TokenizeError> {
        let (tokens, errors) = squill_parser::Lexer::tokenize(source);
        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(TokenizeError::new(errors))
        }
    }

    /// Parse the first statement in `sql`. Parser (and lexer) errors are
    /// collected in the result; the AST may contain error placeholders.
    #[must_use]
    pub fn parse(&self, sql: &str) -> ParseResult {
        squill_parser::parse(sql)
    }

    /// Parse a `;`-separated script. Each result's `sql` is that
    /// statement's substring of the input; `errors` is the full list,
    /// shared by all results.
    #[must_use]
    pub fn parse_multiple(&self, sql: &str) -> Vec<ParseResult> {
        squill_parser::parse_multiple(sql)
    }

    /// Parse then analyze. Convenience for `analyze_parsed(parse(sql))`.
    #[must_use]
    pub fn analyze(&self, sql: &str) -> AnalysisContext {
        self.analyze_parsed(self.parse(sql))
    }

    /// Run the analysis pipeline over a parse result: parent assignment,
    /// scope construction, then — for CRUD statements only — star
    /// expansion, reference resolution, and type inference. Parser errors
    /// carry over into the context as critical findings; analyzer findings
    /// accumulate and never abort the pipeline.
    #[must_use]
    pub fn analyze_parsed(&self, parsed: ParseResult) -> AnalysisContext {
        let ParseResult {
            ast,
            root,
            errors,
            sql,
        } = parsed;
        let mut ctx = squill_analyzer::analyze(ast, root, sql, &self.tables);
        for err in errors {
            ctx.errors.push(AnalysisError::critical(
                format!("syntax: {}", err.message),
                err.span,
                None,
            ));
        }
        ctx
    }
}
