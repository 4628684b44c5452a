//! Recursive-descent SQL parser.
//!
//! Hand-written, single pass over the token stream with one-token
//! lookahead (plus fixed-distance peeks for disambiguation). Expression
//! parsing lives in `expr.rs`. Nodes are allocated into a [`squill_ast::Ast`]
//! arena as they are recognized.
//!
//! Errors are collected, not thrown: a failed clause records a
//! [`ParsingError`] and the parser skips to the next synchronization point
//! (clause keyword, `;`, statement-start keyword, `)` or end of input),
//! leaving behind a partial statement whose failed positions hold `Error`
//! placeholder nodes. Recovery never crosses a statement boundary by
//! unwinding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use squill_ast::{
    Assignment, Ast, ColumnConstraintDef, ColumnDefinition, CompoundOp, CreateIndexStatement,
    CreateTableStatement, CreateTriggerStatement, DeleteStatement, FromClause, IndexedColumn,
    InsertSource, InsertStatement, JoinConstraint, JoinKind, NamedWindow, NodeId, NodeKind,
    NullsOrder, OrderingTerm, Reference, SelectStatement, SortDirection, Span,
    TableConstraintDef, TriggerEvent, TriggerTiming, UpdateStatement,
};
use squill_error::ParsingError;

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

static SQUILL_PARSE_STATEMENTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static SQUILL_PARSE_ERRORS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshot of parser metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseMetricsSnapshot {
    pub squill_parse_statements_total: u64,
    pub squill_parse_errors_total: u64,
}

/// Take a point-in-time snapshot of parser metrics.
#[must_use]
pub fn parse_metrics_snapshot() -> ParseMetricsSnapshot {
    ParseMetricsSnapshot {
        squill_parse_statements_total: SQUILL_PARSE_STATEMENTS_TOTAL.load(Ordering::Relaxed),
        squill_parse_errors_total: SQUILL_PARSE_ERRORS_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset parser metrics (tests/diagnostics).
pub fn reset_parse_metrics() {
    SQUILL_PARSE_STATEMENTS_TOTAL.store(0, Ordering::Relaxed);
    SQUILL_PARSE_ERRORS_TOTAL.store(0, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// ParseResult
// ---------------------------------------------------------------------------

/// One parsed statement: its arena, its root node, the parser error list,
/// and the statement's source text.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub ast: Ast,
    pub root: NodeId,
    /// The full parser error list for the parse call that produced this
    /// result (shared across all statements of a multi-statement parse).
    pub errors: Vec<ParsingError>,
    /// The source substring covering this statement.
    pub sql: String,
}

/// Parse a single statement (the first in `sql`).
#[must_use]
pub fn parse(sql: &str) -> ParseResult {
    let mut results = parse_multiple(sql);
    if results.is_empty() {
        // Empty input still yields a result so callers have an AST to hold.
        let mut ast = Ast::new();
        let root = ast.alloc(NodeKind::Error, Span::ZERO);
        return ParseResult {
            ast,
            root,
            errors: vec![ParsingError::new("no statement found", Span::ZERO)],
            sql: sql.to_owned(),
        };
    }
    results.swap_remove(0)
}

/// Parse a `;`-separated sequence of statements. A missing trailing
/// semicolon is tolerated. Every returned result carries the full error
/// list; `sql` is the substring covering just that statement.
#[must_use]
pub fn parse_multiple(sql: &str) -> Vec<ParseResult> {
    let span = tracing::debug_span!(
        target: "squill.parse",
        "parse",
        statements = tracing::field::Empty,
        parse_errors = tracing::field::Empty,
    );
    let _guard = span.enter();

    let (tokens, lex_errors) = Lexer::tokenize(sql);
    let mut parser = Parser::new(tokens);
    // Lexer failures surface in-band here so parsing always yields a result;
    // the engine's strict tokenize entry point reports them as a unit.
    for err in lex_errors {
        parser
            .errors
            .push(ParsingError::new(err.kind.to_string(), err.span));
    }

    let mut raw = Vec::new();
    while !parser.at_eof() {
        if parser.eat(&TokenKind::Semicolon) {
            continue;
        }
        let first = parser.current_span().offset;
        let root = parser.parse_statement();
        let last = parser.previous_end().max(first);
        let _ = parser.eat(&TokenKind::Semicolon);
        let ast = std::mem::take(&mut parser.ast);
        SQUILL_PARSE_STATEMENTS_TOTAL.fetch_add(1, Ordering::Relaxed);
        raw.push((ast, root, first, last));
    }

    SQUILL_PARSE_ERRORS_TOTAL.fetch_add(parser.errors.len() as u64, Ordering::Relaxed);
    span.record("statements", raw.len() as u64);
    span.record("parse_errors", parser.errors.len() as u64);

    let errors = parser.errors;
    raw.into_iter()
        .map(|(ast, root, first, last)| ParseResult {
            ast,
            root,
            errors: errors.clone(),
            sql: sql
                .get(first as usize..last as usize)
                .unwrap_or_default()
                .to_owned(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Maximum expression/statement nesting before the parser refuses input.
pub const MAX_PARSE_DEPTH: u32 = 500;

pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) errors: Vec<ParsingError>,
    pub(crate) depth: u32,
    pub(crate) ast: Ast,
    /// Highest bind-variable index assigned so far in this statement.
    pub(crate) highest_var: u32,
    /// Indices already assigned to named variables in this statement.
    pub(crate) named_vars: HashMap<String, u32>,
}

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            depth: 0,
            ast: Ast::new(),
            highest_var: 0,
            named_vars: HashMap::new(),
        }
    }

    #[must_use]
    pub fn from_sql(sql: &str) -> (Self, Vec<squill_error::LexError>) {
        let (tokens, lex_errors) = Lexer::tokenize(sql);
        (Self::new(tokens), lex_errors)
    }

    // -----------------------------------------------------------------------
    // Token navigation
    // -----------------------------------------------------------------------

    pub(crate) fn peek(&self) -> &TokenKind {
        self.tokens.get(self.pos).map_or(&TokenKind::Eof, |t| &t.kind)
    }

    pub(crate) fn peek_nth(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(&TokenKind::Eof, |t| &t.kind)
    }

    pub(crate) fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
    }

    /// Structural match on the token discriminant (payloads ignored).
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    pub(crate) fn check_kw(&self, kw: &TokenKind) -> bool {
        self.peek() == kw
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_kw(&mut self, kw: &TokenKind) -> bool {
        if self.peek() == kw {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_kw(&mut self, kw: &TokenKind, what: &str) -> Result<Span, ParsingError> {
        if self.peek() == kw {
            let sp = self.current_span();
            self.advance();
            Ok(sp)
        } else {
            Err(self.err_expected(what))
        }
    }

    pub(crate) fn expect_token(
        &mut self,
        kind: &TokenKind,
        what: &str,
    ) -> Result<Span, ParsingError> {
        if self.check(kind) {
            let sp = self.current_span();
            self.advance();
            Ok(sp)
        } else {
            Err(self.err_expected(what))
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.current().map_or(Span::ZERO, |t| t.span)
    }

    /// End offset of the most recently consumed token.
    pub(crate) fn previous_end(&self) -> u32 {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.span.end())
    }

    pub(crate) fn err_expected(&self, what: &str) -> ParsingError {
        ParsingError::new(
            format!("expected {what}, got {:?}", self.peek()),
            self.current_span(),
        )
    }

    pub(crate) fn err_msg(&self, msg: impl Into<String>) -> ParsingError {
        ParsingError::new(msg, self.current_span())
    }

    // -----------------------------------------------------------------------
    // Recursion guard
    // -----------------------------------------------------------------------

    pub(crate) fn with_recursion_guard<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParsingError>,
    ) -> Result<T, ParsingError> {
        if self.depth >= MAX_PARSE_DEPTH {
            return Err(self.err_msg(format!(
                "statement is nested too deeply (maximum depth {MAX_PARSE_DEPTH})"
            )));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    // -----------------------------------------------------------------------
    // Recovery
    // -----------------------------------------------------------------------

    /// Statement-level panic recovery: skip to the next `;` (consumed) or
    /// statement-start keyword or end of input.
    fn synchronize(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof => return,
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                k if k.is_statement_start() => return,
                _ => self.advance(),
            }
        }
    }

    /// Clause-level recovery: skip to the next clause keyword, `;`, `)`,
    /// statement-start keyword, or end of input. `;` and `)` are left for
    /// the caller to consume.
    pub(crate) fn sync_clause(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::Semicolon | TokenKind::RightParen => return,
                k if k.is_clause_start() || k.is_statement_start() => return,
                _ => self.advance(),
            }
        }
    }

    /// Parse an expression; on failure record the error, resynchronize to
    /// the next clause boundary, and stand in an `Error` placeholder node.
    pub(crate) fn guarded_expr(&mut self) -> NodeId {
        match self.parse_expr() {
            Ok(id) => id,
            Err(err) => {
                let span = err.span;
                tracing::warn!(
                    target: "squill.parse",
                    error = %err,
                    "parse recovery: replacing clause expression"
                );
                self.errors.push(err);
                self.sync_clause();
                self.ast.alloc(NodeKind::Error, span)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Identifiers and small pieces
    // -----------------------------------------------------------------------

    pub(crate) fn parse_identifier(&mut self) -> Result<String, ParsingError> {
        match self.peek().clone() {
            TokenKind::Id(s) | TokenKind::QuotedId(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.err_expected("identifier")),
        }
    }

    pub(crate) fn parse_comma_sep<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, ParsingError>,
    ) -> Result<Vec<T>, ParsingError> {
        let mut items = vec![item(self)?];
        while self.eat(&TokenKind::Comma) {
            items.push(item(self)?);
        }
        Ok(items)
    }

    /// `AS name`, or a bare (quoted) identifier in alias position.
    fn try_alias(&mut self) -> Result<Option<String>, ParsingError> {
        if self.eat_kw(&TokenKind::KwAs) {
            return Ok(Some(self.parse_identifier()?));
        }
        match self.peek() {
            TokenKind::Id(_) | TokenKind::QuotedId(_) => Ok(Some(self.parse_identifier()?)),
            _ => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Parse one statement, always producing a node. A failure that escapes
    /// clause recovery records its error, resynchronizes at statement level,
    /// and yields a bare `Error` node.
    pub fn parse_statement(&mut self) -> NodeId {
        // Fresh per statement: statements are independent prepared units.
        self.highest_var = 0;
        self.named_vars.clear();

        let start = self.current_span();
        match self.with_recursion_guard(Self::parse_statement_inner) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(
                    target: "squill.parse",
                    error = %err,
                    "parse recovery: skipping malformed statement"
                );
                self.errors.push(err);
                self.synchronize();
                self.ast.alloc(NodeKind::Error, start)
            }
        }
    }

    fn parse_statement_inner(&mut self) -> Result<NodeId, ParsingError> {
        match self.peek() {
            TokenKind::KwSelect => self.parse_select_stmt(false, Vec::new()),
            TokenKind::KwWith => self.parse_with_leading(),
            TokenKind::KwInsert => self.parse_insert_stmt(false, Vec::new()),
            TokenKind::KwUpdate => self.parse_update_stmt(false, Vec::new()),
            TokenKind::KwDelete => self.parse_delete_stmt(false, Vec::new()),
            TokenKind::KwCreate => self.parse_create(),
            _ => Err(self.err_msg(format!(
                "unexpected token at start of statement: {:?}",
                self.peek()
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // WITH
    // -----------------------------------------------------------------------

    pub(crate) fn parse_with_leading(&mut self) -> Result<NodeId, ParsingError> {
        self.expect_kw(&TokenKind::KwWith, "WITH")?;
        let recursive = self.eat_kw(&TokenKind::KwRecursive);
        let ctes = self.parse_comma_sep(Self::parse_cte)?;
        match self.peek() {
            TokenKind::KwSelect => self.parse_select_stmt(recursive, ctes),
            TokenKind::KwInsert => self.parse_insert_stmt(recursive, ctes),
            TokenKind::KwUpdate => self.parse_update_stmt(recursive, ctes),
            TokenKind::KwDelete => self.parse_delete_stmt(recursive, ctes),
            _ => Err(self.err_expected("SELECT, INSERT, UPDATE, or DELETE after WITH")),
        }
    }

    pub(crate) fn parse_cte(&mut self) -> Result<NodeId, ParsingError> {
        let start = self.current_span();
        let name = self.parse_identifier()?;
        let columns = if self.eat(&TokenKind::LeftParen) {
            let cols = self.parse_comma_sep(Self::parse_identifier)?;
            self.expect_token(&TokenKind::RightParen, ")")?;
            cols
        } else {
            Vec::new()
        };
        self.expect_kw(&TokenKind::KwAs, "AS")?;
        self.expect_token(&TokenKind::LeftParen, "(")?;
        let body = self.parse_select_stmt(false, Vec::new())?;
        let end = self.expect_token(&TokenKind::RightParen, ")")?;
        Ok(self.ast.alloc(
            NodeKind::Cte {
                name,
                columns,
                body,
            },
            start.merge(end),
        ))
    }

    // -----------------------------------------------------------------------
    // SELECT
    // -----------------------------------------------------------------------

    pub(crate) fn parse_select_stmt(
        &mut self,
        recursive: bool,
        ctes: Vec<NodeId>,
    ) -> Result<NodeId, ParsingError> {
        self.with_recursion_guard(|p| p.parse_select_stmt_inner(recursive, ctes))
    }

    fn parse_select_stmt_inner(
        &mut self,
        recursive: bool,
        ctes: Vec<NodeId>,
    ) -> Result<NodeId, ParsingError> {
        let start = self.current_span();
        let mut select = self.parse_select_core(recursive, ctes)?;

        loop {
            let op = if self.eat_kw(&TokenKind::KwUnion) {
                if self.eat_kw(&TokenKind::KwAll) {
                    CompoundOp::UnionAll
                } else {
                    CompoundOp::Union
                }
            } else if self.eat_kw(&TokenKind::KwIntersect) {
                CompoundOp::Intersect
            } else if self.eat_kw(&TokenKind::KwExcept) {
                CompoundOp::Except
            } else {
                break;
            };
            let core_start = self.current_span();
            let core = self.parse_select_core(false, Vec::new())?;
            let core_span = core_start.merge(Span::new(self.previous_end(), 0));
            let core_id = self.ast.alloc(NodeKind::Select(core), core_span);
            select.compounds.push((op, core_id));
        }

        select.order_by = self.parse_order_by_clause();
        select.limit = self.parse_limit_clause();

        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self.ast.alloc(NodeKind::Select(select), span))
    }

    /// One `SELECT ... [FROM] [WHERE] [GROUP BY] [HAVING] [WINDOW]` core,
    /// without compound/ORDER BY/LIMIT handling.
    fn parse_select_core(
        &mut self,
        recursive: bool,
        ctes: Vec<NodeId>,
    ) -> Result<SelectStatement, ParsingError> {
        self.expect_kw(&TokenKind::KwSelect, "SELECT")?;
        let distinct = if self.eat_kw(&TokenKind::KwDistinct) {
            true
        } else {
            let _ = self.eat_kw(&TokenKind::KwAll);
            false
        };

        let columns = self.guarded_result_columns();
        let from = self.parse_from_clause_opt();
        let where_clause = self.parse_where_clause_opt();
        let group_by = self.parse_group_by_opt();
        let having = self.parse_having_opt();
        let windows = self.parse_window_clause_opt();

        Ok(SelectStatement {
            recursive,
            ctes,
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            windows,
            order_by: None,
            limit: None,
            compounds: Vec::new(),
        })
    }

    fn guarded_result_columns(&mut self) -> Vec<NodeId> {
        match self.parse_comma_sep(Self::parse_result_column) {
            Ok(cols) => cols,
            Err(err) => {
                let span = err.span;
                self.errors.push(err);
                self.sync_clause();
                vec![self.ast.alloc(NodeKind::Error, span)]
            }
        }
    }

    fn parse_result_column(&mut self) -> Result<NodeId, ParsingError> {
        let start = self.current_span();
        if self.eat(&TokenKind::Star) {
            return Ok(self.ast.alloc(NodeKind::StarResultColumn(None), start));
        }
        // table.* form: identifier, dot, star.
        if matches!(self.peek(), TokenKind::Id(_) | TokenKind::QuotedId(_))
            && self.peek_nth(1) == &TokenKind::Dot
            && self.peek_nth(2) == &TokenKind::Star
        {
            let table = self.parse_identifier()?;
            self.advance(); // dot
            let end = self.current_span();
            self.advance(); // star
            return Ok(self
                .ast
                .alloc(NodeKind::StarResultColumn(Some(table)), start.merge(end)));
        }
        let expr = self.parse_expr()?;
        let alias = self.try_alias()?;
        let span = self.ast.span(expr).merge(Span::new(self.previous_end(), 0));
        Ok(self
            .ast
            .alloc(NodeKind::ExprResultColumn { expr, alias }, span))
    }

    // -----------------------------------------------------------------------
    // FROM and JOINs
    // -----------------------------------------------------------------------

    fn parse_from_clause_opt(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwFrom) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        match self.parse_from_body(start) {
            Ok(id) => Some(id),
            Err(err) => {
                self.errors.push(err);
                self.sync_clause();
                None
            }
        }
    }

    fn parse_from_body(&mut self, start: Span) -> Result<NodeId, ParsingError> {
        let source = self.parse_table_or_subquery()?;
        let mut joins = Vec::new();
        loop {
            let join_start = self.current_span();
            if let Some((kind, natural)) = self.try_join_type()? {
                let table = self.parse_table_or_subquery()?;
                let constraint = self.parse_join_constraint()?;
                let span = join_start.merge(Span::new(self.previous_end(), 0));
                joins.push(self.ast.alloc(
                    NodeKind::Join {
                        kind,
                        natural,
                        source: table,
                        constraint,
                    },
                    span,
                ));
            } else if self.eat(&TokenKind::Comma) {
                let table = self.parse_table_or_subquery()?;
                let span = join_start.merge(self.ast.span(table));
                joins.push(self.ast.alloc(
                    NodeKind::Join {
                        kind: JoinKind::Cross,
                        natural: false,
                        source: table,
                        constraint: None,
                    },
                    span,
                ));
            } else {
                break;
            }
        }
        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self
            .ast
            .alloc(NodeKind::From(FromClause { source, joins }), span))
    }

    fn parse_table_or_subquery(&mut self) -> Result<NodeId, ParsingError> {
        let start = self.current_span();
        if self.eat(&TokenKind::LeftParen) {
            if !matches!(self.peek(), TokenKind::KwSelect | TokenKind::KwWith) {
                return Err(self.err_expected("SELECT after '(' in FROM"));
            }
            let select = if self.check_kw(&TokenKind::KwWith) {
                self.parse_with_leading()?
            } else {
                self.parse_select_stmt(false, Vec::new())?
            };
            let end = self.expect_token(&TokenKind::RightParen, ")")?;
            let alias = self.try_alias()?;
            let span = start.merge(end).merge(Span::new(self.previous_end(), 0));
            return Ok(self.ast.alloc(NodeKind::SelectSource { select, alias }, span));
        }

        let name = self.parse_identifier()?;
        let alias = self.try_alias()?;
        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self
            .ast
            .alloc(NodeKind::TableReference { name, alias }, span))
    }

    fn try_join_type(&mut self) -> Result<Option<(JoinKind, bool)>, ParsingError> {
        let natural = self.eat_kw(&TokenKind::KwNatural);
        let kind = if self.eat_kw(&TokenKind::KwJoin) {
            Some(JoinKind::Inner)
        } else if self.eat_kw(&TokenKind::KwInner) {
            self.expect_kw(&TokenKind::KwJoin, "JOIN")?;
            Some(JoinKind::Inner)
        } else if self.eat_kw(&TokenKind::KwCross) {
            self.expect_kw(&TokenKind::KwJoin, "JOIN")?;
            Some(JoinKind::Cross)
        } else if self.eat_kw(&TokenKind::KwLeft) {
            let _ = self.eat_kw(&TokenKind::KwOuter);
            self.expect_kw(&TokenKind::KwJoin, "JOIN")?;
            Some(JoinKind::Left)
        } else if self.eat_kw(&TokenKind::KwRight) {
            let _ = self.eat_kw(&TokenKind::KwOuter);
            self.expect_kw(&TokenKind::KwJoin, "JOIN")?;
            Some(JoinKind::Right)
        } else if self.eat_kw(&TokenKind::KwFull) {
            let _ = self.eat_kw(&TokenKind::KwOuter);
            self.expect_kw(&TokenKind::KwJoin, "JOIN")?;
            Some(JoinKind::Full)
        } else {
            None
        };
        match kind {
            Some(k) => Ok(Some((k, natural))),
            None if natural => Err(self.err_expected("JOIN after NATURAL")),
            None => Ok(None),
        }
    }

    fn parse_join_constraint(&mut self) -> Result<Option<JoinConstraint>, ParsingError> {
        if self.eat_kw(&TokenKind::KwOn) {
            Ok(Some(JoinConstraint::On(self.parse_expr()?)))
        } else if self.eat_kw(&TokenKind::KwUsing) {
            self.expect_token(&TokenKind::LeftParen, "(")?;
            let cols = self.parse_comma_sep(Self::parse_identifier)?;
            self.expect_token(&TokenKind::RightParen, ")")?;
            Ok(Some(JoinConstraint::Using(cols)))
        } else {
            Ok(None)
        }
    }

    // -----------------------------------------------------------------------
    // WHERE / GROUP BY / HAVING / WINDOW / ORDER BY / LIMIT
    // -----------------------------------------------------------------------

    fn parse_where_clause_opt(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwWhere) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        let expr = self.guarded_expr();
        let span = start.merge(self.ast.span(expr));
        Some(self.ast.alloc(NodeKind::Where(expr), span))
    }

    fn parse_group_by_opt(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwGroup) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        if let Err(err) = self.expect_kw(&TokenKind::KwBy, "BY") {
            self.errors.push(err);
            self.sync_clause();
            return None;
        }
        let exprs = match self.parse_comma_sep(Self::parse_expr) {
            Ok(exprs) => exprs,
            Err(err) => {
                let span = err.span;
                self.errors.push(err);
                self.sync_clause();
                vec![self.ast.alloc(NodeKind::Error, span)]
            }
        };
        let span = start.merge(Span::new(self.previous_end(), 0));
        Some(self.ast.alloc(NodeKind::GroupBy(exprs), span))
    }

    fn parse_having_opt(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwHaving) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        let expr = self.guarded_expr();
        let span = start.merge(self.ast.span(expr));
        Some(self.ast.alloc(NodeKind::Having(expr), span))
    }

    fn parse_window_clause_opt(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwWindow) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        let windows = match self.parse_comma_sep(|p| {
            let name = p.parse_identifier()?;
            p.expect_kw(&TokenKind::KwAs, "AS")?;
            let spec = p.parse_window_spec()?;
            Ok(NamedWindow { name, spec })
        }) {
            Ok(windows) => windows,
            Err(err) => {
                self.errors.push(err);
                self.sync_clause();
                Vec::new()
            }
        };
        let span = start.merge(Span::new(self.previous_end(), 0));
        Some(self.ast.alloc(NodeKind::WindowClause(windows), span))
    }

    fn parse_order_by_clause(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwOrder) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        if let Err(err) = self.expect_kw(&TokenKind::KwBy, "BY") {
            self.errors.push(err);
            self.sync_clause();
            return None;
        }
        let terms = match self.parse_comma_sep(Self::parse_ordering_term) {
            Ok(terms) => terms,
            Err(err) => {
                self.errors.push(err);
                self.sync_clause();
                Vec::new()
            }
        };
        let span = start.merge(Span::new(self.previous_end(), 0));
        Some(self.ast.alloc(NodeKind::OrderBy(terms), span))
    }

    pub(crate) fn parse_ordering_term(&mut self) -> Result<OrderingTerm, ParsingError> {
        let expr = self.parse_expr()?;
        let direction = if self.eat_kw(&TokenKind::KwAsc) {
            Some(SortDirection::Asc)
        } else if self.eat_kw(&TokenKind::KwDesc) {
            Some(SortDirection::Desc)
        } else {
            None
        };
        let nulls = if self.eat_kw(&TokenKind::KwNulls) {
            if self.eat_kw(&TokenKind::KwFirst) {
                Some(NullsOrder::First)
            } else {
                self.expect_kw(&TokenKind::KwLast, "FIRST or LAST")?;
                Some(NullsOrder::Last)
            }
        } else {
            None
        };
        Ok(OrderingTerm {
            expr,
            direction,
            nulls,
        })
    }

    fn parse_limit_clause(&mut self) -> Option<NodeId> {
        if !self.check_kw(&TokenKind::KwLimit) {
            return None;
        }
        let start = self.current_span();
        self.advance();
        let first = self.guarded_expr();
        let (limit, offset) = if self.eat_kw(&TokenKind::KwOffset) {
            (first, Some(self.guarded_expr()))
        } else if self.eat(&TokenKind::Comma) {
            // `LIMIT offset, count` compatibility form.
            (self.guarded_expr(), Some(first))
        } else {
            (first, None)
        };
        let span = start.merge(Span::new(self.previous_end(), 0));
        Some(self.ast.alloc(NodeKind::Limit { limit, offset }, span))
    }

    fn parse_returning(&mut self) -> Vec<NodeId> {
        if !self.eat_kw(&TokenKind::KwReturning) {
            return Vec::new();
        }
        match self.parse_comma_sep(Self::parse_result_column) {
            Ok(cols) => cols,
            Err(err) => {
                let span = err.span;
                self.errors.push(err);
                self.sync_clause();
                vec![self.ast.alloc(NodeKind::Error, span)]
            }
        }
    }

    // -----------------------------------------------------------------------
    // INSERT
    // -----------------------------------------------------------------------

    fn parse_insert_stmt(
        &mut self,
        recursive: bool,
        ctes: Vec<NodeId>,
    ) -> Result<NodeId, ParsingError> {
        let start = self.expect_kw(&TokenKind::KwInsert, "INSERT")?;
        self.expect_kw(&TokenKind::KwInto, "INTO")?;
        let table_start = self.current_span();
        let name = self.parse_identifier()?;
        let table = self.ast.alloc(
            NodeKind::TableReference { name, alias: None },
            table_start,
        );

        let columns = if self.check(&TokenKind::LeftParen)
            && !matches!(self.peek_nth(1), TokenKind::KwSelect | TokenKind::KwWith)
        {
            self.advance();
            let cols = self.parse_comma_sep(Self::parse_identifier)?;
            self.expect_token(&TokenKind::RightParen, ")")?;
            cols
        } else {
            Vec::new()
        };

        let source = if self.eat_kw(&TokenKind::KwValues) {
            let rows = self.parse_comma_sep(|p| {
                p.expect_token(&TokenKind::LeftParen, "(")?;
                let row = p.parse_comma_sep(Self::parse_expr)?;
                p.expect_token(&TokenKind::RightParen, ")")?;
                Ok(row)
            })?;
            InsertSource::Values(rows)
        } else if matches!(self.peek(), TokenKind::KwSelect | TokenKind::KwWith) {
            let select = if self.check_kw(&TokenKind::KwWith) {
                self.parse_with_leading()?
            } else {
                self.parse_select_stmt(false, Vec::new())?
            };
            InsertSource::Select(select)
        } else if self.eat_kw(&TokenKind::KwDefault) {
            self.expect_kw(&TokenKind::KwValues, "VALUES")?;
            InsertSource::DefaultValues
        } else {
            return Err(self.err_expected("VALUES, SELECT, or DEFAULT VALUES"));
        };

        let returning = self.parse_returning();
        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self.ast.alloc(
            NodeKind::Insert(InsertStatement {
                recursive,
                ctes,
                table,
                columns,
                source,
                returning,
            }),
            span,
        ))
    }

    // -----------------------------------------------------------------------
    // UPDATE
    // -----------------------------------------------------------------------

    fn parse_update_stmt(
        &mut self,
        recursive: bool,
        ctes: Vec<NodeId>,
    ) -> Result<NodeId, ParsingError> {
        let start = self.expect_kw(&TokenKind::KwUpdate, "UPDATE")?;
        let table_start = self.current_span();
        let name = self.parse_identifier()?;
        let alias = if self.eat_kw(&TokenKind::KwAs) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let table = self.ast.alloc(
            NodeKind::TableReference { name, alias },
            table_start.merge(Span::new(self.previous_end(), 0)),
        );

        self.expect_kw(&TokenKind::KwSet, "SET")?;
        let assignments = self.parse_comma_sep(|p| {
            let col_span = p.current_span();
            let column_name = p.parse_identifier()?;
            let column = p
                .ast
                .alloc(NodeKind::Reference(Reference::bare(column_name)), col_span);
            p.expect_token(&TokenKind::Eq, "=")?;
            let value = p.parse_expr()?;
            Ok(Assignment { column, value })
        })?;

        let from = self.parse_from_clause_opt();
        let where_clause = self.parse_where_clause_opt();
        let returning = self.parse_returning();
        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self.ast.alloc(
            NodeKind::Update(UpdateStatement {
                recursive,
                ctes,
                table,
                assignments,
                from,
                where_clause,
                returning,
            }),
            span,
        ))
    }

    // -----------------------------------------------------------------------
    // DELETE
    // -----------------------------------------------------------------------

    fn parse_delete_stmt(
        &mut self,
        recursive: bool,
        ctes: Vec<NodeId>,
    ) -> Result<NodeId, ParsingError> {
        let start = self.expect_kw(&TokenKind::KwDelete, "DELETE")?;
        self.expect_kw(&TokenKind::KwFrom, "FROM")?;
        let table_start = self.current_span();
        let name = self.parse_identifier()?;
        let alias = self.try_alias()?;
        let table = self.ast.alloc(
            NodeKind::TableReference { name, alias },
            table_start.merge(Span::new(self.previous_end(), 0)),
        );

        let where_clause = self.parse_where_clause_opt();
        let returning = self.parse_returning();
        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self.ast.alloc(
            NodeKind::Delete(DeleteStatement {
                recursive,
                ctes,
                table,
                where_clause,
                returning,
            }),
            span,
        ))
    }

    // -----------------------------------------------------------------------
    // CREATE TABLE / INDEX / TRIGGER
    // -----------------------------------------------------------------------

    fn parse_create(&mut self) -> Result<NodeId, ParsingError> {
        let start = self.expect_kw(&TokenKind::KwCreate, "CREATE")?;
        if self.eat_kw(&TokenKind::KwTable) {
            self.parse_create_table(start)
        } else if self.eat_kw(&TokenKind::KwUnique) {
            self.expect_kw(&TokenKind::KwIndex, "INDEX")?;
            self.parse_create_index(start, true)
        } else if self.eat_kw(&TokenKind::KwIndex) {
            self.parse_create_index(start, false)
        } else if self.eat_kw(&TokenKind::KwTrigger) {
            self.parse_create_trigger(start)
        } else {
            Err(self.err_expected("TABLE, INDEX, UNIQUE INDEX, or TRIGGER"))
        }
    }

    fn parse_if_not_exists(&mut self) -> Result<bool, ParsingError> {
        if self.check_kw(&TokenKind::KwIf) {
            self.advance();
            self.expect_kw(&TokenKind::KwNot, "NOT")?;
            self.expect_kw(&TokenKind::KwExists, "EXISTS")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_create_table(&mut self, start: Span) -> Result<NodeId, ParsingError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_identifier()?;
        self.expect_token(&TokenKind::LeftParen, "(")?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            match self.peek() {
                TokenKind::KwPrimary | TokenKind::KwUnique | TokenKind::KwCheck
                | TokenKind::KwForeign => {
                    constraints.push(self.parse_table_constraint()?);
                }
                _ => columns.push(self.parse_column_definition()?),
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect_token(&TokenKind::RightParen, ")")?;

        Ok(self.ast.alloc(
            NodeKind::CreateTable(CreateTableStatement {
                name,
                if_not_exists,
                columns,
                constraints,
            }),
            start.merge(end),
        ))
    }

    fn parse_column_definition(&mut self) -> Result<ColumnDefinition, ParsingError> {
        let name = self.parse_identifier()?;
        let type_name = if matches!(self.peek(), TokenKind::Id(_)) {
            Some(self.parse_type_name()?)
        } else {
            None
        };

        let mut constraints = Vec::new();
        loop {
            let constraint = match self.peek() {
                TokenKind::KwPrimary => {
                    self.advance();
                    self.expect_kw(&TokenKind::KwKey, "KEY")?;
                    let direction = if self.eat_kw(&TokenKind::KwAsc) {
                        Some(SortDirection::Asc)
                    } else if self.eat_kw(&TokenKind::KwDesc) {
                        Some(SortDirection::Desc)
                    } else {
                        None
                    };
                    let autoincrement = self.eat_kw(&TokenKind::KwAutoincrement);
                    ColumnConstraintDef::PrimaryKey {
                        direction,
                        autoincrement,
                    }
                }
                TokenKind::KwNot => {
                    self.advance();
                    self.expect_kw(&TokenKind::KwNull, "NULL")?;
                    ColumnConstraintDef::NotNull
                }
                TokenKind::KwUnique => {
                    self.advance();
                    ColumnConstraintDef::Unique
                }
                TokenKind::KwDefault => {
                    self.advance();
                    let expr = if self.eat(&TokenKind::LeftParen) {
                        let e = self.parse_expr()?;
                        self.expect_token(&TokenKind::RightParen, ")")?;
                        e
                    } else {
                        self.parse_expr()?
                    };
                    ColumnConstraintDef::Default(expr)
                }
                TokenKind::KwCheck => {
                    self.advance();
                    self.expect_token(&TokenKind::LeftParen, "(")?;
                    let e = self.parse_expr()?;
                    self.expect_token(&TokenKind::RightParen, ")")?;
                    ColumnConstraintDef::Check(e)
                }
                TokenKind::KwCollate => {
                    self.advance();
                    ColumnConstraintDef::Collate(self.parse_identifier()?)
                }
                TokenKind::KwReferences => {
                    self.advance();
                    let table = self.parse_identifier()?;
                    let columns = if self.eat(&TokenKind::LeftParen) {
                        let cols = self.parse_comma_sep(Self::parse_identifier)?;
                        self.expect_token(&TokenKind::RightParen, ")")?;
                        cols
                    } else {
                        Vec::new()
                    };
                    ColumnConstraintDef::References { table, columns }
                }
                _ => break,
            };
            constraints.push(constraint);
        }

        Ok(ColumnDefinition {
            name,
            type_name,
            constraints,
        })
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraintDef, ParsingError> {
        match self.peek() {
            TokenKind::KwPrimary => {
                self.advance();
                self.expect_kw(&TokenKind::KwKey, "KEY")?;
                self.expect_token(&TokenKind::LeftParen, "(")?;
                let cols = self.parse_comma_sep(Self::parse_identifier)?;
                self.expect_token(&TokenKind::RightParen, ")")?;
                Ok(TableConstraintDef::PrimaryKey(cols))
            }
            TokenKind::KwUnique => {
                self.advance();
                self.expect_token(&TokenKind::LeftParen, "(")?;
                let cols = self.parse_comma_sep(Self::parse_identifier)?;
                self.expect_token(&TokenKind::RightParen, ")")?;
                Ok(TableConstraintDef::Unique(cols))
            }
            TokenKind::KwCheck => {
                self.advance();
                self.expect_token(&TokenKind::LeftParen, "(")?;
                let e = self.parse_expr()?;
                self.expect_token(&TokenKind::RightParen, ")")?;
                Ok(TableConstraintDef::Check(e))
            }
            TokenKind::KwForeign => {
                self.advance();
                self.expect_kw(&TokenKind::KwKey, "KEY")?;
                self.expect_token(&TokenKind::LeftParen, "(")?;
                let columns = self.parse_comma_sep(Self::parse_identifier)?;
                self.expect_token(&TokenKind::RightParen, ")")?;
                self.expect_kw(&TokenKind::KwReferences, "REFERENCES")?;
                let table = self.parse_identifier()?;
                let references = if self.eat(&TokenKind::LeftParen) {
                    let cols = self.parse_comma_sep(Self::parse_identifier)?;
                    self.expect_token(&TokenKind::RightParen, ")")?;
                    cols
                } else {
                    Vec::new()
                };
                Ok(TableConstraintDef::ForeignKey {
                    columns,
                    table,
                    references,
                })
            }
            _ => Err(self.err_expected("table constraint")),
        }
    }

    fn parse_create_index(&mut self, start: Span, unique: bool) -> Result<NodeId, ParsingError> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_identifier()?;
        self.expect_kw(&TokenKind::KwOn, "ON")?;
        let table = self.parse_identifier()?;
        self.expect_token(&TokenKind::LeftParen, "(")?;
        let columns = self.parse_comma_sep(|p| {
            let expr = p.parse_expr()?;
            let direction = if p.eat_kw(&TokenKind::KwAsc) {
                Some(SortDirection::Asc)
            } else if p.eat_kw(&TokenKind::KwDesc) {
                Some(SortDirection::Desc)
            } else {
                None
            };
            Ok(IndexedColumn { expr, direction })
        })?;
        self.expect_token(&TokenKind::RightParen, ")")?;
        let where_clause = self.parse_where_clause_opt();
        let span = start.merge(Span::new(self.previous_end(), 0));
        Ok(self.ast.alloc(
            NodeKind::CreateIndex(CreateIndexStatement {
                name,
                unique,
                if_not_exists,
                table,
                columns,
                where_clause,
            }),
            span,
        ))
    }

    fn parse_create_trigger(&mut self, start: Span) -> Result<NodeId, ParsingError> {
        let name = self.parse_identifier()?;
        let timing = if self.eat_kw(&TokenKind::KwBefore) {
            Some(TriggerTiming::Before)
        } else if self.eat_kw(&TokenKind::KwAfter) {
            Some(TriggerTiming::After)
        } else if self.eat_kw(&TokenKind::KwInstead) {
            self.expect_kw(&TokenKind::KwOf, "OF")?;
            Some(TriggerTiming::InsteadOf)
        } else {
            None
        };

        let event = if self.eat_kw(&TokenKind::KwDelete) {
            TriggerEvent::Delete
        } else if self.eat_kw(&TokenKind::KwInsert) {
            TriggerEvent::Insert
        } else if self.eat_kw(&TokenKind::KwUpdate) {
            let cols = if self.eat_kw(&TokenKind::KwOf) {
                self.parse_comma_sep(Self::parse_identifier)?
            } else {
                Vec::new()
            };
            TriggerEvent::Update(cols)
        } else {
            return Err(self.err_expected("DELETE, INSERT, or UPDATE"));
        };

        self.expect_kw(&TokenKind::KwOn, "ON")?;
        let table = self.parse_identifier()?;

        let for_each_row = if self.check_kw(&TokenKind::KwFor) {
            self.advance();
            self.expect_kw(&TokenKind::KwEach, "EACH")?;
            self.expect_kw(&TokenKind::KwRow, "ROW")?;
            true
        } else {
            false
        };

        let when = if self.eat_kw(&TokenKind::KwWhen) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect_kw(&TokenKind::KwBegin, "BEGIN")?;
        let mut body = Vec::new();
        while !self.check_kw(&TokenKind::KwEnd) && !self.at_eof() {
            let stmt = self.with_recursion_guard(Self::parse_statement_inner)?;
            body.push(stmt);
            self.expect_token(&TokenKind::Semicolon, ";")?;
        }
        let end = self.expect_kw(&TokenKind::KwEnd, "END")?;

        Ok(self.ast.alloc(
            NodeKind::CreateTrigger(CreateTriggerStatement {
                name,
                timing,
                event,
                table,
                for_each_row,
                when,
                body,
            }),
            start.merge(end),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squill_ast::BinaryOp;

    fn parse_one(sql: &str) -> ParseResult {
        let result = parse(sql);
        assert!(
            result.errors.is_empty(),
            "unexpected parse errors for {sql:?}: {:?}",
            result.errors
        );
        result
    }

    fn select_of(result: &ParseResult) -> &SelectStatement {
        match result.ast.kind(result.root) {
            NodeKind::Select(select) => select,
            other => panic!("expected Select, got {other:?}"),
        }
    }

    /// Collect (index, name) for every variable node in document order.
    fn variables(result: &ParseResult) -> Vec<(u32, Option<String>)> {
        let mut vars = Vec::new();
        result.ast.walk(result.root, &mut |ast, id| {
            if let NodeKind::Variable(v) = ast.kind(id) {
                vars.push((v.index, v.name.clone()));
            }
        });
        vars
    }

    // ── SELECT ──

    #[test]
    fn test_select_structure() {
        let result = parse_one("SELECT id, content AS body FROM demo WHERE id > 10");
        let select = select_of(&result);
        assert_eq!(select.columns.len(), 2);
        assert!(select.from.is_some());
        assert!(select.where_clause.is_some());
        assert!(select.group_by.is_none());
        match result.ast.kind(select.columns[1]) {
            NodeKind::ExprResultColumn { alias, .. } => {
                assert_eq!(alias.as_deref(), Some("body"));
            }
            other => panic!("expected ExprResultColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_select_star_and_table_star() {
        let result = parse_one("SELECT *, demo.* FROM demo");
        let select = select_of(&result);
        assert!(matches!(
            result.ast.kind(select.columns[0]),
            NodeKind::StarResultColumn(None)
        ));
        assert!(matches!(
            result.ast.kind(select.columns[1]),
            NodeKind::StarResultColumn(Some(t)) if t == "demo"
        ));
    }

    #[test]
    fn test_select_join() {
        let result = parse_one("SELECT * FROM demo JOIN tbl ON demo.id = tbl.id");
        let select = select_of(&result);
        let from = select.from.expect("from clause");
        let NodeKind::From(from_clause) = result.ast.kind(from) else {
            panic!("expected From node");
        };
        assert_eq!(from_clause.joins.len(), 1);
        let NodeKind::Join {
            kind, constraint, ..
        } = result.ast.kind(from_clause.joins[0])
        else {
            panic!("expected Join node");
        };
        assert_eq!(*kind, JoinKind::Inner);
        assert!(matches!(constraint, Some(JoinConstraint::On(_))));
    }

    #[test]
    fn test_select_comma_join_is_cross() {
        let result = parse_one("SELECT * FROM a, b");
        let select = select_of(&result);
        let NodeKind::From(from_clause) = result.ast.kind(select.from.unwrap()) else {
            panic!("expected From node");
        };
        let NodeKind::Join { kind, .. } = result.ast.kind(from_clause.joins[0]) else {
            panic!("expected Join node");
        };
        assert_eq!(*kind, JoinKind::Cross);
    }

    #[test]
    fn test_select_subquery_source() {
        let result = parse_one("SELECT * FROM (SELECT id FROM demo) AS d");
        let select = select_of(&result);
        let NodeKind::From(from_clause) = result.ast.kind(select.from.unwrap()) else {
            panic!("expected From node");
        };
        assert!(matches!(
            result.ast.kind(from_clause.source),
            NodeKind::SelectSource { alias: Some(a), .. } if a == "d"
        ));
    }

    #[test]
    fn test_select_group_having_order_limit() {
        let result = parse_one(
            "SELECT content FROM demo GROUP BY content HAVING count(*) > 1 \
             ORDER BY content DESC NULLS LAST LIMIT 10 OFFSET 5",
        );
        let select = select_of(&result);
        assert!(select.group_by.is_some());
        assert!(select.having.is_some());
        assert!(select.order_by.is_some());
        let NodeKind::Limit { offset, .. } = result.ast.kind(select.limit.unwrap()) else {
            panic!("expected Limit node");
        };
        assert!(offset.is_some());
    }

    #[test]
    fn test_select_limit_comma_form() {
        let result = parse_one("SELECT 1 LIMIT 5, 10");
        let select = select_of(&result);
        let NodeKind::Limit { limit, offset } = result.ast.kind(select.limit.unwrap()) else {
            panic!("expected Limit node");
        };
        assert!(matches!(
            result.ast.kind(*limit),
            NodeKind::Literal(squill_ast::Literal::Integer(10))
        ));
        assert!(matches!(
            result.ast.kind(offset.unwrap()),
            NodeKind::Literal(squill_ast::Literal::Integer(5))
        ));
    }

    #[test]
    fn test_select_compound() {
        let result = parse_one("SELECT 1 UNION ALL SELECT 2 EXCEPT SELECT 3");
        let select = select_of(&result);
        assert_eq!(select.compounds.len(), 2);
        assert_eq!(select.compounds[0].0, CompoundOp::UnionAll);
        assert_eq!(select.compounds[1].0, CompoundOp::Except);
    }

    #[test]
    fn test_select_cte() {
        let result = parse_one("WITH recent (id) AS (SELECT id FROM demo) SELECT * FROM recent");
        let select = select_of(&result);
        assert_eq!(select.ctes.len(), 1);
        assert!(matches!(
            result.ast.kind(select.ctes[0]),
            NodeKind::Cte { name, columns, .. } if name == "recent" && columns == &["id".to_owned()]
        ));
    }

    #[test]
    fn test_select_window_function() {
        let result = parse_one("SELECT row_number() OVER (PARTITION BY content ORDER BY id)");
        let select = select_of(&result);
        let NodeKind::ExprResultColumn { expr, .. } = result.ast.kind(select.columns[0]) else {
            panic!("expected result column");
        };
        let NodeKind::WindowFunction { name, window, .. } = result.ast.kind(*expr) else {
            panic!("expected WindowFunction");
        };
        assert_eq!(name, "row_number");
        assert_eq!(window.partition_by.len(), 1);
        assert_eq!(window.order_by.len(), 1);
    }

    #[test]
    fn test_select_window_frame() {
        let result = parse_one("SELECT sum(id) OVER (ROWS BETWEEN 1 PRECEDING AND CURRENT ROW)");
        let select = select_of(&result);
        let NodeKind::ExprResultColumn { expr, .. } = result.ast.kind(select.columns[0]) else {
            panic!("expected result column");
        };
        let NodeKind::WindowFunction { window, .. } = result.ast.kind(*expr) else {
            panic!("expected WindowFunction");
        };
        let frame = window.frame.as_ref().expect("frame");
        assert_eq!(frame.frame_type, squill_ast::FrameType::Rows);
        assert!(matches!(frame.start, squill_ast::FrameBound::Preceding(_)));
        assert_eq!(frame.end, Some(squill_ast::FrameBound::CurrentRow));
    }

    // ── Expressions ──

    #[test]
    fn test_between_and_is_not_conjunction() {
        let result = parse_one("SELECT 1 WHERE a BETWEEN 1 AND 2 AND b");
        let select = select_of(&result);
        let NodeKind::Where(expr) = result.ast.kind(select.where_clause.unwrap()) else {
            panic!("expected Where node");
        };
        // Top level must be AND(between, b), not BETWEEN(a, 1, AND(2, b)).
        let NodeKind::Binary { op, lhs, .. } = result.ast.kind(*expr) else {
            panic!("expected Binary, got {:?}", result.ast.kind(*expr));
        };
        assert_eq!(*op, BinaryOp::And);
        assert!(matches!(result.ast.kind(*lhs), NodeKind::Between { .. }));
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let result = parse_one("SELECT 1 + 2 * 3");
        let select = select_of(&result);
        let NodeKind::ExprResultColumn { expr, .. } = result.ast.kind(select.columns[0]) else {
            panic!("expected result column");
        };
        let NodeKind::Binary { op, rhs, .. } = result.ast.kind(*expr) else {
            panic!("expected Binary");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            result.ast.kind(*rhs),
            NodeKind::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn test_in_forms() {
        let variable = parse_one("SELECT 1 WHERE a IN ?");
        let list = parse_one("SELECT 1 WHERE a IN (?)");
        let sub = parse_one("SELECT 1 WHERE a IN (SELECT 1)");

        let where_expr = |r: &ParseResult| {
            let select = match r.ast.kind(r.root) {
                NodeKind::Select(s) => s,
                _ => panic!("expected select"),
            };
            let NodeKind::Where(e) = r.ast.kind(select.where_clause.unwrap()) else {
                panic!("expected Where");
            };
            *e
        };

        assert!(matches!(
            variable.ast.kind(where_expr(&variable)),
            NodeKind::InVariable { .. }
        ));
        assert!(matches!(
            list.ast.kind(where_expr(&list)),
            NodeKind::InList { items, .. } if items.len() == 1
        ));
        assert!(matches!(
            sub.ast.kind(where_expr(&sub)),
            NodeKind::InSubquery { .. }
        ));
    }

    #[test]
    fn test_is_null_folding() {
        let result = parse_one("SELECT a IS NULL, b IS NOT NULL, c ISNULL, d NOTNULL");
        let select = select_of(&result);
        let exprs: Vec<_> = select
            .columns
            .iter()
            .map(|&c| match result.ast.kind(c) {
                NodeKind::ExprResultColumn { expr, .. } => *expr,
                other => panic!("expected column, got {other:?}"),
            })
            .collect();
        assert!(matches!(
            result.ast.kind(exprs[0]),
            NodeKind::IsNull { not: false, .. }
        ));
        assert!(matches!(
            result.ast.kind(exprs[1]),
            NodeKind::IsNull { not: true, .. }
        ));
        assert!(matches!(
            result.ast.kind(exprs[2]),
            NodeKind::IsNull { not: false, .. }
        ));
        assert!(matches!(
            result.ast.kind(exprs[3]),
            NodeKind::IsNull { not: true, .. }
        ));
    }

    #[test]
    fn test_case_and_cast() {
        let result = parse_one("SELECT CASE WHEN a THEN 1 ELSE 2 END, CAST(x AS TEXT)");
        let select = select_of(&result);
        assert_eq!(select.columns.len(), 2);
    }

    #[test]
    fn test_not_like() {
        let result = parse_one("SELECT 1 WHERE a NOT LIKE 'x%' ESCAPE '\\'");
        let select = select_of(&result);
        let NodeKind::Where(expr) = result.ast.kind(select.where_clause.unwrap()) else {
            panic!("expected Where");
        };
        assert!(matches!(
            result.ast.kind(*expr),
            NodeKind::Like {
                not: true,
                escape: Some(_),
                ..
            }
        ));
    }

    // ── Bind variable indexing ──

    #[test]
    fn test_variable_index_assignment() {
        let result = parse_one("SELECT ?2, ?, :a, ?, :a");
        assert_eq!(
            variables(&result),
            vec![
                (2, None),
                (3, None),
                (4, Some("a".to_owned())),
                (5, None),
                (4, Some("a".to_owned())),
            ]
        );
    }

    #[test]
    fn test_variable_index_plain_sequence() {
        let result = parse_one("SELECT ?, ?, ?");
        assert_eq!(
            variables(&result)
                .into_iter()
                .map(|(i, _)| i)
                .collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_variable_indices_restart_per_statement() {
        let results = parse_multiple("SELECT ?; SELECT ?");
        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(variables(result), vec![(1, None)]);
        }
    }

    // ── INSERT / UPDATE / DELETE ──

    #[test]
    fn test_insert_values() {
        let result = parse_one("INSERT INTO demo (id, content) VALUES (1, 'a'), (2, 'b')");
        let NodeKind::Insert(insert) = result.ast.kind(result.root) else {
            panic!("expected Insert");
        };
        assert_eq!(insert.columns, vec!["id".to_owned(), "content".to_owned()]);
        let InsertSource::Values(rows) = &insert.source else {
            panic!("expected VALUES source");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_insert_select_and_default() {
        let from_select = parse_one("INSERT INTO demo SELECT * FROM other");
        let NodeKind::Insert(insert) = from_select.ast.kind(from_select.root) else {
            panic!("expected Insert");
        };
        assert!(matches!(insert.source, InsertSource::Select(_)));

        let default = parse_one("INSERT INTO demo DEFAULT VALUES");
        let NodeKind::Insert(insert) = default.ast.kind(default.root) else {
            panic!("expected Insert");
        };
        assert!(matches!(insert.source, InsertSource::DefaultValues));
    }

    #[test]
    fn test_update() {
        let result = parse_one("UPDATE demo SET content = 'x', id = id + 1 WHERE id = 3 RETURNING id");
        let NodeKind::Update(update) = result.ast.kind(result.root) else {
            panic!("expected Update");
        };
        assert_eq!(update.assignments.len(), 2);
        assert!(update.where_clause.is_some());
        assert_eq!(update.returning.len(), 1);
    }

    #[test]
    fn test_delete() {
        let result = parse_one("DELETE FROM demo WHERE id = 1");
        let NodeKind::Delete(delete) = result.ast.kind(result.root) else {
            panic!("expected Delete");
        };
        assert!(delete.where_clause.is_some());
    }

    // ── DDL ──

    #[test]
    fn test_create_table() {
        let result = parse_one(
            "CREATE TABLE demo (\
               id INTEGER PRIMARY KEY AUTOINCREMENT, \
               content TEXT NOT NULL DEFAULT 'x' CHECK (length(content) > 0), \
               owner INTEGER REFERENCES users (id), \
               UNIQUE (content))",
        );
        let NodeKind::CreateTable(create) = result.ast.kind(result.root) else {
            panic!("expected CreateTable");
        };
        assert_eq!(create.name, "demo");
        assert_eq!(create.columns.len(), 3);
        assert_eq!(create.constraints.len(), 1);
        assert!(matches!(
            create.columns[0].constraints[0],
            ColumnConstraintDef::PrimaryKey {
                autoincrement: true,
                ..
            }
        ));
        assert!(matches!(
            create.columns[2].constraints[0],
            ColumnConstraintDef::References { ref table, .. } if table == "users"
        ));
    }

    #[test]
    fn test_create_index() {
        let result = parse_one("CREATE UNIQUE INDEX idx ON demo (content DESC) WHERE id > 0");
        let NodeKind::CreateIndex(create) = result.ast.kind(result.root) else {
            panic!("expected CreateIndex");
        };
        assert!(create.unique);
        assert_eq!(create.table, "demo");
        assert_eq!(create.columns.len(), 1);
        assert!(create.where_clause.is_some());
    }

    #[test]
    fn test_create_trigger() {
        let result = parse_one(
            "CREATE TRIGGER trg AFTER UPDATE OF content ON demo FOR EACH ROW \
             WHEN 1 BEGIN DELETE FROM demo WHERE id = 0; END",
        );
        let NodeKind::CreateTrigger(create) = result.ast.kind(result.root) else {
            panic!("expected CreateTrigger");
        };
        assert_eq!(create.timing, Some(TriggerTiming::After));
        assert!(matches!(create.event, TriggerEvent::Update(ref cols) if cols.len() == 1));
        assert!(create.for_each_row);
        assert!(create.when.is_some());
        assert_eq!(create.body.len(), 1);
    }

    // ── Recovery ──

    #[test]
    fn test_recovery_produces_partial_select() {
        let result = parse("SELECT FROM demo WHERE id = 1");
        assert!(!result.errors.is_empty());
        // The statement still parsed as a Select with its FROM and WHERE.
        let NodeKind::Select(select) = result.ast.kind(result.root) else {
            panic!("expected partial Select, got {:?}", result.ast.kind(result.root));
        };
        assert!(select.from.is_some());
        assert!(select.where_clause.is_some());
        assert!(matches!(
            result.ast.kind(select.columns[0]),
            NodeKind::Error
        ));
    }

    #[test]
    fn test_recovery_does_not_cross_statement_boundary() {
        let results = parse_multiple("SELECT %%; SELECT 2");
        assert_eq!(results.len(), 2);
        assert!(!results[0].errors.is_empty());
        // Second statement parses cleanly despite the first failing.
        assert!(matches!(
            results[1].ast.kind(results[1].root),
            NodeKind::Select(_)
        ));
    }

    #[test]
    fn test_unknown_statement_start_yields_error_node() {
        let result = parse("FOO BAR");
        assert!(!result.errors.is_empty());
        assert!(matches!(result.ast.kind(result.root), NodeKind::Error));
    }

    // ── Multi-statement spans ──

    #[test]
    fn test_parse_multiple_sql_substrings() {
        let results = parse_multiple("SELECT 1;\nSELECT 2");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sql, "SELECT 1");
        assert_eq!(results[1].sql, "SELECT 2");
        // Both share the (empty) error list.
        assert!(results.iter().all(|r| r.errors.is_empty()));
    }

    #[test]
    fn test_parse_multiple_tolerates_trailing_semicolon() {
        assert_eq!(parse_multiple("SELECT 1;").len(), 1);
        assert_eq!(parse_multiple("SELECT 1").len(), 1);
        assert_eq!(parse_multiple(";;SELECT 1;;").len(), 1);
    }

    // ── Parent assignment over parsed trees ──

    #[test]
    fn test_every_reachable_node_has_one_parent() {
        let mut result = parse_one(
            "WITH c AS (SELECT id FROM demo) \
             SELECT c.id, count(*) OVER (ORDER BY c.id) \
             FROM c WHERE c.id BETWEEN ? AND ? ORDER BY 1 LIMIT 3",
        );
        let root = result.root;
        result.ast.assign_parents(root);
        let mut seen = std::collections::HashSet::new();
        result.ast.walk(root, &mut |ast, id| {
            assert!(seen.insert(id), "node {id} visited twice");
            if id == root {
                assert!(ast.parent(id).is_none());
            } else {
                assert!(ast.parent(id).is_some(), "node {id} has no parent");
            }
        });
    }

    // ── Round-trip ──

    #[test]
    fn test_render_reparse_token_kinds() {
        let sql = "SELECT 1;";
        let result = parse_one(sql);
        let rendered = squill_ast::render(&result.ast, result.root);
        let (orig_tokens, _) = Lexer::tokenize(sql);
        let (rendered_tokens, _) = Lexer::tokenize(&rendered);
        let orig_kinds: Vec<_> = orig_tokens
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, TokenKind::Semicolon))
            .collect();
        let rendered_kinds: Vec<_> = rendered_tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(orig_kinds, rendered_kinds);
    }

    // ── Property tests ──

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn is_keyword(s: &str) -> bool {
            TokenKind::lookup_keyword(s).is_some()
        }

        fn arb_ident() -> BoxedStrategy<String> {
            prop::string::string_regex("[a-z][a-z0-9_]{0,5}")
                .expect("valid regex")
                .prop_filter("not a keyword", |s| !is_keyword(s))
                .boxed()
        }

        fn arb_literal() -> BoxedStrategy<String> {
            prop_oneof![
                any::<i32>().prop_map(|n| n.to_string()),
                (1i32..1000).prop_map(|n| format!("{n}.{}", n % 100)),
                arb_ident().prop_map(|s| format!("'{s}'")),
                Just("NULL".to_owned()),
                Just("TRUE".to_owned()),
                Just("FALSE".to_owned()),
            ]
            .boxed()
        }

        fn arb_expr(depth: u32) -> BoxedStrategy<String> {
            if depth == 0 {
                prop_oneof![
                    arb_literal(),
                    arb_ident(),
                    (arb_ident(), arb_ident()).prop_map(|(t, c)| format!("{t}.{c}")),
                ]
                .boxed()
            } else {
                let leaf = arb_expr(0);
                prop_oneof![
                    4 => leaf,
                    2 => (arb_expr(depth - 1), prop_oneof![
                        Just("+"), Just("-"), Just("*"), Just("/"),
                        Just("="), Just("!="), Just("<"), Just("<="),
                        Just(">"), Just(">="), Just("AND"), Just("OR"),
                        Just("||"),
                    ], arb_expr(depth - 1))
                        .prop_map(|(l, op, r)| format!("({l} {op} {r})")),
                    1 => arb_expr(depth - 1).prop_map(|e| format!("(NOT {e})")),
                    1 => arb_expr(depth - 1).prop_map(|e| format!("{e} IS NULL")),
                    1 => (arb_expr(depth - 1), arb_expr(0), arb_expr(0))
                        .prop_map(|(e, lo, hi)| format!("{e} BETWEEN {lo} AND {hi}")),
                    1 => (arb_expr(depth - 1), proptest::collection::vec(arb_expr(0), 1..4))
                        .prop_map(|(e, items)| format!("{e} IN ({})", items.join(", "))),
                    1 => (arb_ident(), proptest::collection::vec(arb_expr(0), 0..3))
                        .prop_map(|(name, args)| format!("{name}({})", args.join(", "))),
                    1 => arb_expr(depth - 1).prop_map(|e| format!("CAST({e} AS TEXT)")),
                ]
                .boxed()
            }
        }

        fn arb_select() -> BoxedStrategy<String> {
            use std::fmt::Write as _;
            let cols =
                proptest::collection::vec(arb_expr(1), 1..4).prop_map(|cols| cols.join(", "));
            (cols, arb_ident(), prop::option::of(arb_expr(1)), prop::option::of(1u32..100))
                .prop_map(|(cols, table, where_clause, limit)| {
                    let mut sql = format!("SELECT {cols} FROM {table}");
                    if let Some(w) = where_clause {
                        write!(sql, " WHERE {w}").expect("write to String");
                    }
                    if let Some(l) = limit {
                        write!(sql, " LIMIT {l}").expect("write to String");
                    }
                    sql
                })
                .boxed()
        }

        fn try_parse_clean(sql: &str) -> Option<ParseResult> {
            let result = parse(sql);
            result.errors.is_empty().then_some(result)
        }

        proptest::proptest! {
            #![proptest_config(proptest::prelude::ProptestConfig::with_cases(256))]

            #[test]
            fn test_render_roundtrip_idempotent(sql in arb_select()) {
                let Some(first) = try_parse_clean(&sql) else {
                    return Ok(());
                };
                let rendered1 = squill_ast::render(&first.ast, first.root);
                let second = try_parse_clean(&rendered1);
                prop_assert!(second.is_some(), "re-parse failed for {rendered1:?}");
                let second = second.expect("checked above");
                let rendered2 = squill_ast::render(&second.ast, second.root);
                prop_assert_eq!(rendered1, rendered2);
            }

            #[test]
            fn test_anonymous_variable_indices_are_sequential(n in 1usize..8) {
                let cols = vec!["?"; n].join(", ");
                let result = parse(&format!("SELECT {cols}"));
                prop_assert!(result.errors.is_empty());
                let indices: Vec<u32> = {
                    let mut v = Vec::new();
                    result.ast.walk(result.root, &mut |ast, id| {
                        if let NodeKind::Variable(var) = ast.kind(id) {
                            v.push(var.index);
                        }
                    });
                    v
                };
                prop_assert_eq!(indices, (1..=n as u32).collect::<Vec<_>>());
            }
        }
    }
}
