//! Pratt expression parser.
//!
//! Precedence climbing over an explicit binding-power table so the grammar
//! is auditable in one place. Lowest to highest:
//!
//!   OR
//!   AND
//!   NOT (prefix)
//!   = == != <> IS [NOT] IN LIKE GLOB MATCH REGEXP BETWEEN ISNULL NOTNULL
//!   < <= > >=
//!   & | << >> (bitwise)
//!   + - (binary)
//!   * / %
//!   || (concat)
//!   COLLATE (postfix)
//!   ~ - + (unary prefix)
//!
//! `BETWEEN x AND y` parses its bounds above AND level, so the inner AND
//! belongs to the ternary, not to conjunction.

use squill_ast::{
    BinaryOp, CaseWhen, FrameBound, FrameSpec, FrameType, FunctionArgs, LikeOp, Literal, NodeId,
    NodeKind, Reference, Span, TypeName, UnaryOp, Variable, WindowSpec,
};
use squill_error::ParsingError;

use crate::parser::Parser;
use crate::token::{Token, TokenKind};

// Binding powers: higher binds tighter. Left BP is compared against the
// minimum; right BP is handed to the recursive call.
mod bp {
    pub const OR: (u8, u8) = (1, 2);
    pub const AND: (u8, u8) = (3, 4);
    /// Prefix NOT right binding power.
    pub const NOT_PREFIX: u8 = 5;
    /// Equality, pattern match, membership, BETWEEN.
    pub const EQUALITY: (u8, u8) = (7, 8);
    pub const COMPARISON: (u8, u8) = (9, 10);
    /// All bitwise operators share one level.
    pub const BITWISE: (u8, u8) = (11, 12);
    pub const ADD: (u8, u8) = (13, 14);
    pub const MUL: (u8, u8) = (15, 16);
    pub const CONCAT: (u8, u8) = (17, 18);
    /// COLLATE postfix left binding power.
    pub const COLLATE: u8 = 19;
    /// Unary prefix (- + ~) right binding power.
    pub const UNARY: u8 = 21;
}

impl Parser {
    /// Parse a single expression.
    pub fn parse_expr(&mut self) -> Result<NodeId, ParsingError> {
        self.with_recursion_guard(|p| p.parse_expr_bp(0))
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<NodeId, ParsingError> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if let Some(l_bp) = self.postfix_bp() {
                if l_bp < min_bp {
                    break;
                }
                lhs = self.parse_postfix(lhs)?;
                continue;
            }

            if let Some((l_bp, r_bp)) = self.infix_bp() {
                if l_bp < min_bp {
                    break;
                }
                lhs = self.with_recursion_guard(|p| p.parse_infix(lhs, r_bp))?;
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn advance_token(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    // -----------------------------------------------------------------------
    // Bind-variable index assignment
    // -----------------------------------------------------------------------

    /// Explicit index wins and raises the high-water mark; a repeated name
    /// reuses its index; everything else takes highest-seen + 1.
    fn assign_variable_index(&mut self, explicit: Option<u32>, name: Option<&str>) -> u32 {
        if let Some(n) = explicit {
            self.highest_var = self.highest_var.max(n);
            return n;
        }
        if let Some(name) = name {
            if let Some(&index) = self.named_vars.get(name) {
                return index;
            }
            self.highest_var += 1;
            self.named_vars.insert(name.to_owned(), self.highest_var);
            return self.highest_var;
        }
        self.highest_var += 1;
        self.highest_var
    }

    fn alloc_variable(&mut self, explicit: Option<u32>, name: Option<String>, span: Span) -> NodeId {
        let index = self.assign_variable_index(explicit, name.as_deref());
        self.ast
            .alloc(NodeKind::Variable(Variable { index, name }), span)
    }

    // -----------------------------------------------------------------------
    // Prefix
    // -----------------------------------------------------------------------

    #[allow(clippy::too_many_lines)]
    fn parse_prefix(&mut self) -> Result<NodeId, ParsingError> {
        let tok = self.advance_token();
        match &tok.kind {
            // Literals
            TokenKind::Integer(i) => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::Integer(*i)), tok.span)),
            TokenKind::Real(v) => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::Real(*v)), tok.span)),
            TokenKind::String(s) => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::String(s.clone())), tok.span)),
            TokenKind::Blob(b) => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::Blob(b.clone())), tok.span)),
            TokenKind::KwNull => Ok(self.ast.alloc(NodeKind::Literal(Literal::Null), tok.span)),
            TokenKind::KwTrue => Ok(self.ast.alloc(NodeKind::Literal(Literal::True), tok.span)),
            TokenKind::KwFalse => Ok(self.ast.alloc(NodeKind::Literal(Literal::False), tok.span)),
            TokenKind::KwCurrentTime => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::CurrentTime), tok.span)),
            TokenKind::KwCurrentDate => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::CurrentDate), tok.span)),
            TokenKind::KwCurrentTimestamp => Ok(self
                .ast
                .alloc(NodeKind::Literal(Literal::CurrentTimestamp), tok.span)),

            // Bind variables
            TokenKind::Question => Ok(self.alloc_variable(None, None, tok.span)),
            TokenKind::QuestionNum(n) => Ok(self.alloc_variable(Some(*n), None, tok.span)),
            TokenKind::ColonParam(s) | TokenKind::AtParam(s) | TokenKind::DollarParam(s) => {
                Ok(self.alloc_variable(None, Some(s.clone()), tok.span))
            }

            // Unary prefix operators
            TokenKind::Minus => self.parse_unary(UnaryOp::Negate, tok.span),
            TokenKind::Plus => self.parse_unary(UnaryOp::Plus, tok.span),
            TokenKind::Tilde => self.parse_unary(UnaryOp::BitNot, tok.span),

            // Prefix NOT (including NOT EXISTS)
            TokenKind::KwNot => {
                if self.check_kw(&TokenKind::KwExists) {
                    self.advance();
                    return self.parse_exists_tail(tok.span, true);
                }
                let operand = self.parse_expr_bp(bp::NOT_PREFIX)?;
                let span = tok.span.merge(self.ast.span(operand));
                Ok(self.ast.alloc(
                    NodeKind::Unary {
                        op: UnaryOp::Not,
                        operand,
                    },
                    span,
                ))
            }

            // EXISTS (subquery)
            TokenKind::KwExists => self.parse_exists_tail(tok.span, false),

            // CAST(expr AS type)
            TokenKind::KwCast => {
                self.expect_token(&TokenKind::LeftParen, "(")?;
                let expr = self.parse_expr()?;
                self.expect_kw(&TokenKind::KwAs, "AS")?;
                let target = self.parse_type_name()?;
                let end = self.expect_token(&TokenKind::RightParen, ")")?;
                Ok(self
                    .ast
                    .alloc(NodeKind::Cast { expr, target }, tok.span.merge(end)))
            }

            // CASE
            TokenKind::KwCase => self.parse_case(tok.span),

            // Parenthesized expression or scalar subquery
            TokenKind::LeftParen => {
                if matches!(self.peek(), TokenKind::KwSelect | TokenKind::KwWith) {
                    let select = if self.check_kw(&TokenKind::KwWith) {
                        self.parse_with_leading()?
                    } else {
                        self.parse_select_stmt(false, Vec::new())?
                    };
                    let end = self.expect_token(&TokenKind::RightParen, ")")?;
                    return Ok(self
                        .ast
                        .alloc(NodeKind::Subquery(select), tok.span.merge(end)));
                }
                let inner = self.parse_expr()?;
                self.expect_token(&TokenKind::RightParen, ")")?;
                Ok(inner)
            }

            // Identifier: reference or function call
            TokenKind::Id(name) | TokenKind::QuotedId(name) => {
                let name = name.clone();
                self.parse_ident_expr(name, tok.span)
            }

            _ => {
                // Leave the unexpected token in place so clause-level
                // recovery can resynchronize on it (it may be FROM, WHERE,
                // or another clause keyword).
                if tok.kind != TokenKind::Eof {
                    self.pos -= 1;
                }
                Err(ParsingError::new(
                    format!("unexpected token in expression: {:?}", tok.kind),
                    tok.span,
                ))
            }
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, start: Span) -> Result<NodeId, ParsingError> {
        let operand = self.parse_expr_bp(bp::UNARY)?;
        let span = start.merge(self.ast.span(operand));
        Ok(self.ast.alloc(NodeKind::Unary { op, operand }, span))
    }

    fn parse_exists_tail(&mut self, start: Span, not: bool) -> Result<NodeId, ParsingError> {
        self.expect_token(&TokenKind::LeftParen, "(")?;
        let select = self.parse_select_stmt(false, Vec::new())?;
        let end = self.expect_token(&TokenKind::RightParen, ")")?;
        Ok(self
            .ast
            .alloc(NodeKind::Exists { select, not }, start.merge(end)))
    }

    /// `name`, `name.column`, or `name(args)`.
    fn parse_ident_expr(&mut self, name: String, start: Span) -> Result<NodeId, ParsingError> {
        if self.check(&TokenKind::LeftParen) {
            return self.parse_function_call(name, start);
        }
        if self.check(&TokenKind::Dot) {
            self.advance();
            let col_span = self.current_span();
            let column = self.parse_identifier()?;
            let span = start.merge(col_span);
            return Ok(self
                .ast
                .alloc(NodeKind::Reference(Reference::qualified(name, column)), span));
        }
        Ok(self
            .ast
            .alloc(NodeKind::Reference(Reference::bare(name)), start))
    }

    /// `name([DISTINCT] args)` with an optional `OVER` window.
    fn parse_function_call(&mut self, name: String, start: Span) -> Result<NodeId, ParsingError> {
        self.expect_token(&TokenKind::LeftParen, "(")?;
        let distinct = self.eat_kw(&TokenKind::KwDistinct);
        let args = if self.eat(&TokenKind::Star) {
            FunctionArgs::Star
        } else if self.check(&TokenKind::RightParen) {
            FunctionArgs::List(Vec::new())
        } else {
            FunctionArgs::List(self.parse_comma_sep(Self::parse_expr)?)
        };
        let end = self.expect_token(&TokenKind::RightParen, ")")?;

        if self.eat_kw(&TokenKind::KwOver) {
            let window = if self.check(&TokenKind::LeftParen) {
                self.parse_window_spec()?
            } else {
                // OVER window_name
                WindowSpec {
                    base: Some(self.parse_identifier()?),
                    ..WindowSpec::default()
                }
            };
            let span = start.merge(Span::new(self.previous_end(), 0));
            return Ok(self
                .ast
                .alloc(NodeKind::WindowFunction { name, args, window }, span));
        }

        Ok(self.ast.alloc(
            NodeKind::FunctionCall {
                name,
                args,
                distinct,
            },
            start.merge(end),
        ))
    }

    /// `( [base] [PARTITION BY ...] [ORDER BY ...] [frame] )`
    pub(crate) fn parse_window_spec(&mut self) -> Result<WindowSpec, ParsingError> {
        self.expect_token(&TokenKind::LeftParen, "(")?;
        let mut spec = WindowSpec::default();

        if matches!(self.peek(), TokenKind::Id(_) | TokenKind::QuotedId(_)) {
            spec.base = Some(self.parse_identifier()?);
        }
        if self.check_kw(&TokenKind::KwPartition) {
            self.advance();
            self.expect_kw(&TokenKind::KwBy, "BY")?;
            spec.partition_by = self.parse_comma_sep(Self::parse_expr)?;
        }
        if self.check_kw(&TokenKind::KwOrder) {
            self.advance();
            self.expect_kw(&TokenKind::KwBy, "BY")?;
            spec.order_by = self.parse_comma_sep(Self::parse_ordering_term)?;
        }

        let frame_type = if self.eat_kw(&TokenKind::KwRows) {
            Some(FrameType::Rows)
        } else if self.eat_kw(&TokenKind::KwRange) {
            Some(FrameType::Range)
        } else if self.eat_kw(&TokenKind::KwGroups) {
            Some(FrameType::Groups)
        } else {
            None
        };
        if let Some(frame_type) = frame_type {
            let (start, end) = if self.eat_kw(&TokenKind::KwBetween) {
                let start = self.parse_frame_bound()?;
                self.expect_kw(&TokenKind::KwAnd, "AND")?;
                let end = self.parse_frame_bound()?;
                (start, Some(end))
            } else {
                (self.parse_frame_bound()?, None)
            };
            spec.frame = Some(FrameSpec {
                frame_type,
                start,
                end,
            });
        }

        self.expect_token(&TokenKind::RightParen, ")")?;
        Ok(spec)
    }

    fn parse_frame_bound(&mut self) -> Result<FrameBound, ParsingError> {
        if self.eat_kw(&TokenKind::KwUnbounded) {
            if self.eat_kw(&TokenKind::KwPreceding) {
                return Ok(FrameBound::UnboundedPreceding);
            }
            self.expect_kw(&TokenKind::KwFollowing, "PRECEDING or FOLLOWING")?;
            return Ok(FrameBound::UnboundedFollowing);
        }
        if self.eat_kw(&TokenKind::KwCurrent) {
            self.expect_kw(&TokenKind::KwRow, "ROW")?;
            return Ok(FrameBound::CurrentRow);
        }
        let expr = self.parse_expr()?;
        if self.eat_kw(&TokenKind::KwPreceding) {
            Ok(FrameBound::Preceding(expr))
        } else {
            self.expect_kw(&TokenKind::KwFollowing, "PRECEDING or FOLLOWING")?;
            Ok(FrameBound::Following(expr))
        }
    }

    fn parse_case(&mut self, start: Span) -> Result<NodeId, ParsingError> {
        let operand = if self.check_kw(&TokenKind::KwWhen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let mut whens = Vec::new();
        while self.eat_kw(&TokenKind::KwWhen) {
            let when = self.parse_expr()?;
            self.expect_kw(&TokenKind::KwThen, "THEN")?;
            let then = self.parse_expr()?;
            whens.push(CaseWhen { when, then });
        }
        if whens.is_empty() {
            return Err(self.err_expected("WHEN"));
        }
        let else_expr = if self.eat_kw(&TokenKind::KwElse) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect_kw(&TokenKind::KwEnd, "END")?;
        Ok(self.ast.alloc(
            NodeKind::Case {
                operand,
                whens,
                else_expr,
            },
            start.merge(end),
        ))
    }

    pub(crate) fn parse_type_name(&mut self) -> Result<TypeName, ParsingError> {
        let mut name = self.parse_identifier()?;
        // Multi-word type names: VARCHAR, UNSIGNED BIG INT, ...
        while matches!(self.peek(), TokenKind::Id(_)) {
            name.push(' ');
            name.push_str(&self.parse_identifier()?);
        }
        let (arg1, arg2) = if self.eat(&TokenKind::LeftParen) {
            let a1 = self.parse_number_like()?;
            let a2 = if self.eat(&TokenKind::Comma) {
                Some(self.parse_number_like()?)
            } else {
                None
            };
            self.expect_token(&TokenKind::RightParen, ")")?;
            (Some(a1), a2)
        } else {
            (None, None)
        };
        Ok(TypeName { name, arg1, arg2 })
    }

    fn parse_number_like(&mut self) -> Result<String, ParsingError> {
        match self.peek().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(n.to_string())
            }
            TokenKind::Real(v) => {
                self.advance();
                Ok(v.to_string())
            }
            _ => Err(self.err_expected("numeric type argument")),
        }
    }

    // -----------------------------------------------------------------------
    // Postfix
    // -----------------------------------------------------------------------

    fn postfix_bp(&self) -> Option<u8> {
        match self.peek() {
            TokenKind::KwCollate => Some(bp::COLLATE),
            TokenKind::KwIsnull | TokenKind::KwNotnull => Some(bp::EQUALITY.0),
            _ => None,
        }
    }

    fn parse_postfix(&mut self, lhs: NodeId) -> Result<NodeId, ParsingError> {
        let tok = self.advance_token();
        match &tok.kind {
            TokenKind::KwCollate => {
                let collation = self.parse_identifier()?;
                let span = self.ast.span(lhs).merge(Span::new(self.previous_end(), 0));
                Ok(self.ast.alloc(
                    NodeKind::Collate {
                        expr: lhs,
                        collation,
                    },
                    span,
                ))
            }
            TokenKind::KwIsnull => {
                let span = self.ast.span(lhs).merge(tok.span);
                Ok(self
                    .ast
                    .alloc(NodeKind::IsNull { expr: lhs, not: false }, span))
            }
            TokenKind::KwNotnull => {
                let span = self.ast.span(lhs).merge(tok.span);
                Ok(self
                    .ast
                    .alloc(NodeKind::IsNull { expr: lhs, not: true }, span))
            }
            other => Err(ParsingError::new(
                format!("unexpected postfix token: {other:?}"),
                tok.span,
            )),
        }
    }

    // -----------------------------------------------------------------------
    // Infix
    // -----------------------------------------------------------------------

    fn infix_bp(&self) -> Option<(u8, u8)> {
        match self.peek() {
            TokenKind::KwOr => Some(bp::OR),
            TokenKind::KwAnd => Some(bp::AND),

            TokenKind::Eq
            | TokenKind::EqEq
            | TokenKind::Ne
            | TokenKind::LtGt
            | TokenKind::KwIs
            | TokenKind::KwLike
            | TokenKind::KwGlob
            | TokenKind::KwMatch
            | TokenKind::KwRegexp
            | TokenKind::KwBetween
            | TokenKind::KwIn => Some(bp::EQUALITY),

            // NOT LIKE / NOT GLOB / NOT MATCH / NOT REGEXP / NOT BETWEEN / NOT IN
            TokenKind::KwNot => match self.peek_nth(1) {
                TokenKind::KwLike
                | TokenKind::KwGlob
                | TokenKind::KwMatch
                | TokenKind::KwRegexp
                | TokenKind::KwBetween
                | TokenKind::KwIn => Some(bp::EQUALITY),
                _ => None,
            },

            TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => Some(bp::COMPARISON),

            TokenKind::Ampersand
            | TokenKind::Pipe
            | TokenKind::ShiftLeft
            | TokenKind::ShiftRight => Some(bp::BITWISE),

            TokenKind::Plus | TokenKind::Minus => Some(bp::ADD),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(bp::MUL),
            TokenKind::Concat => Some(bp::CONCAT),

            _ => None,
        }
    }

    fn parse_infix(&mut self, lhs: NodeId, r_bp: u8) -> Result<NodeId, ParsingError> {
        let tok = self.advance_token();
        match &tok.kind {
            TokenKind::Plus => self.make_binary(lhs, BinaryOp::Add, r_bp),
            TokenKind::Minus => self.make_binary(lhs, BinaryOp::Subtract, r_bp),
            TokenKind::Star => self.make_binary(lhs, BinaryOp::Multiply, r_bp),
            TokenKind::Slash => self.make_binary(lhs, BinaryOp::Divide, r_bp),
            TokenKind::Percent => self.make_binary(lhs, BinaryOp::Modulo, r_bp),
            TokenKind::Concat => self.make_binary(lhs, BinaryOp::Concat, r_bp),
            TokenKind::Eq | TokenKind::EqEq => self.make_binary(lhs, BinaryOp::Eq, r_bp),
            TokenKind::Ne | TokenKind::LtGt => self.make_binary(lhs, BinaryOp::Ne, r_bp),
            TokenKind::Lt => self.make_binary(lhs, BinaryOp::Lt, r_bp),
            TokenKind::Le => self.make_binary(lhs, BinaryOp::Le, r_bp),
            TokenKind::Gt => self.make_binary(lhs, BinaryOp::Gt, r_bp),
            TokenKind::Ge => self.make_binary(lhs, BinaryOp::Ge, r_bp),
            TokenKind::Ampersand => self.make_binary(lhs, BinaryOp::BitAnd, r_bp),
            TokenKind::Pipe => self.make_binary(lhs, BinaryOp::BitOr, r_bp),
            TokenKind::ShiftLeft => self.make_binary(lhs, BinaryOp::ShiftLeft, r_bp),
            TokenKind::ShiftRight => self.make_binary(lhs, BinaryOp::ShiftRight, r_bp),
            TokenKind::KwOr => self.make_binary(lhs, BinaryOp::Or, r_bp),
            TokenKind::KwAnd => self.make_binary(lhs, BinaryOp::And, r_bp),

            // IS [NOT] — `IS NULL` folds into the IsNull node.
            TokenKind::KwIs => {
                let not = self.eat_kw(&TokenKind::KwNot);
                if self.check_kw(&TokenKind::KwNull) {
                    let end = self.current_span();
                    self.advance();
                    let span = self.ast.span(lhs).merge(end);
                    return Ok(self.ast.alloc(NodeKind::IsNull { expr: lhs, not }, span));
                }
                let op = if not { BinaryOp::IsNot } else { BinaryOp::Is };
                self.make_binary(lhs, op, r_bp)
            }

            TokenKind::KwLike => self.parse_like(lhs, LikeOp::Like, false),
            TokenKind::KwGlob => self.parse_like(lhs, LikeOp::Glob, false),
            TokenKind::KwMatch => self.parse_like(lhs, LikeOp::Match, false),
            TokenKind::KwRegexp => self.parse_like(lhs, LikeOp::Regexp, false),
            TokenKind::KwBetween => self.parse_between(lhs, false),
            TokenKind::KwIn => self.parse_in(lhs, false),

            TokenKind::KwNot => {
                let next = self.advance_token();
                match &next.kind {
                    TokenKind::KwLike => self.parse_like(lhs, LikeOp::Like, true),
                    TokenKind::KwGlob => self.parse_like(lhs, LikeOp::Glob, true),
                    TokenKind::KwMatch => self.parse_like(lhs, LikeOp::Match, true),
                    TokenKind::KwRegexp => self.parse_like(lhs, LikeOp::Regexp, true),
                    TokenKind::KwBetween => self.parse_between(lhs, true),
                    TokenKind::KwIn => self.parse_in(lhs, true),
                    other => Err(ParsingError::new(
                        format!(
                            "expected LIKE, GLOB, MATCH, REGEXP, BETWEEN, or IN after NOT, got {other:?}"
                        ),
                        next.span,
                    )),
                }
            }

            other => Err(ParsingError::new(
                format!("unexpected infix token: {other:?}"),
                tok.span,
            )),
        }
    }

    fn make_binary(&mut self, lhs: NodeId, op: BinaryOp, r_bp: u8) -> Result<NodeId, ParsingError> {
        let rhs = self.parse_expr_bp(r_bp)?;
        let span = self.ast.span(lhs).merge(self.ast.span(rhs));
        Ok(self.ast.alloc(NodeKind::Binary { op, lhs, rhs }, span))
    }

    fn parse_like(&mut self, lhs: NodeId, op: LikeOp, not: bool) -> Result<NodeId, ParsingError> {
        let pattern = self.parse_expr_bp(bp::EQUALITY.1)?;
        let escape = if self.eat_kw(&TokenKind::KwEscape) {
            Some(self.parse_expr_bp(bp::EQUALITY.1)?)
        } else {
            None
        };
        let end = escape.unwrap_or(pattern);
        let span = self.ast.span(lhs).merge(self.ast.span(end));
        Ok(self.ast.alloc(
            NodeKind::Like {
                subject: lhs,
                pattern,
                escape,
                op,
                not,
            },
            span,
        ))
    }

    fn parse_between(&mut self, lhs: NodeId, not: bool) -> Result<NodeId, ParsingError> {
        // Bounds parse above AND level so the separator AND stays ours.
        let low = self.parse_expr_bp(bp::NOT_PREFIX + 1)?;
        self.expect_kw(&TokenKind::KwAnd, "AND in BETWEEN")?;
        let high = self.parse_expr_bp(bp::NOT_PREFIX + 1)?;
        let span = self.ast.span(lhs).merge(self.ast.span(high));
        Ok(self.ast.alloc(
            NodeKind::Between {
                subject: lhs,
                low,
                high,
                not,
            },
            span,
        ))
    }

    /// `IN (list)`, `IN (SELECT ...)`, or `IN ?`.
    fn parse_in(&mut self, lhs: NodeId, not: bool) -> Result<NodeId, ParsingError> {
        // Right-hand bind variable: the expanding-list form.
        match self.peek().clone() {
            TokenKind::Question => {
                let span = self.current_span();
                self.advance();
                let variable = self.alloc_variable(None, None, span);
                let node_span = self.ast.span(lhs).merge(span);
                return Ok(self.ast.alloc(
                    NodeKind::InVariable {
                        subject: lhs,
                        variable,
                        not,
                    },
                    node_span,
                ));
            }
            TokenKind::QuestionNum(n) => {
                let span = self.current_span();
                self.advance();
                let variable = self.alloc_variable(Some(n), None, span);
                let node_span = self.ast.span(lhs).merge(span);
                return Ok(self.ast.alloc(
                    NodeKind::InVariable {
                        subject: lhs,
                        variable,
                        not,
                    },
                    node_span,
                ));
            }
            TokenKind::ColonParam(s) | TokenKind::AtParam(s) | TokenKind::DollarParam(s) => {
                let span = self.current_span();
                self.advance();
                let variable = self.alloc_variable(None, Some(s), span);
                let node_span = self.ast.span(lhs).merge(span);
                return Ok(self.ast.alloc(
                    NodeKind::InVariable {
                        subject: lhs,
                        variable,
                        not,
                    },
                    node_span,
                ));
            }
            _ => {}
        }

        self.expect_token(&TokenKind::LeftParen, "( or bind variable after IN")?;
        if matches!(self.peek(), TokenKind::KwSelect | TokenKind::KwWith) {
            let select = if self.check_kw(&TokenKind::KwWith) {
                self.parse_with_leading()?
            } else {
                self.parse_select_stmt(false, Vec::new())?
            };
            let end = self.expect_token(&TokenKind::RightParen, ")")?;
            let span = self.ast.span(lhs).merge(end);
            return Ok(self.ast.alloc(
                NodeKind::InSubquery {
                    subject: lhs,
                    select,
                    not,
                },
                span,
            ));
        }

        let items = if self.check(&TokenKind::RightParen) {
            Vec::new()
        } else {
            self.parse_comma_sep(Self::parse_expr)?
        };
        let end = self.expect_token(&TokenKind::RightParen, ")")?;
        let span = self.ast.span(lhs).merge(end);
        Ok(self.ast.alloc(
            NodeKind::InList {
                subject: lhs,
                items,
                not,
            },
            span,
        ))
    }
}
