//! SQL lexer.
//!
//! Converts SQL text into a token stream with one-byte lookahead, using
//! memchr for accelerated delimiter scans. Scanning never aborts: every
//! failure is recorded as a [`LexError`] and the scanner moves past the
//! offending input, so the caller always receives the full token stream
//! for whatever did scan. Two-character operators are recognized before
//! their one-character prefixes.

use std::sync::atomic::{AtomicU64, Ordering};

use memchr::memchr;
use squill_ast::Span;
use squill_error::{LexError, LexErrorKind};

use crate::token::{Token, TokenKind};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

static SQUILL_LEX_TOKENS_TOTAL: AtomicU64 = AtomicU64::new(0);
static SQUILL_LEX_ERRORS_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Point-in-time snapshot of lexer metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LexMetricsSnapshot {
    pub squill_lex_tokens_total: u64,
    pub squill_lex_errors_total: u64,
}

/// Take a point-in-time snapshot of lexer metrics.
#[must_use]
pub fn lex_metrics_snapshot() -> LexMetricsSnapshot {
    LexMetricsSnapshot {
        squill_lex_tokens_total: SQUILL_LEX_TOKENS_TOTAL.load(Ordering::Relaxed),
        squill_lex_errors_total: SQUILL_LEX_ERRORS_TOTAL.load(Ordering::Relaxed),
    }
}

/// Reset lexer metrics (tests/diagnostics).
pub fn reset_lex_metrics() {
    SQUILL_LEX_TOKENS_TOTAL.store(0, Ordering::Relaxed);
    SQUILL_LEX_ERRORS_TOTAL.store(0, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

/// SQL lexer over UTF-8 source bytes.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire input. Returns the token stream (always
    /// terminated by `Eof`) and the accumulated lexer errors.
    #[must_use]
    pub fn tokenize(source: &'a str) -> (Vec<Token>, Vec<LexError>) {
        let span = tracing::debug_span!(
            target: "squill.lex",
            "tokenize",
            tokens = tracing::field::Empty,
            errors = tracing::field::Empty,
        );
        let _guard = span.enter();

        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            match lexer.next_token() {
                Some(tok) => {
                    let is_eof = tok.kind == TokenKind::Eof;
                    tokens.push(tok);
                    if is_eof {
                        break;
                    }
                }
                // An error was recorded; keep scanning.
                None => {}
            }
        }

        SQUILL_LEX_TOKENS_TOTAL.fetch_add(tokens.len() as u64, Ordering::Relaxed);
        SQUILL_LEX_ERRORS_TOTAL.fetch_add(lexer.errors.len() as u64, Ordering::Relaxed);
        span.record("tokens", tokens.len() as u64);
        span.record("errors", lexer.errors.len() as u64);

        (tokens, lexer.errors)
    }

    /// Produce the next token, or `None` when the input at the cursor was
    /// invalid (an error has been recorded and the cursor advanced).
    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace_and_comments();

        if self.pos >= self.src.len() {
            return Some(self.token_at(TokenKind::Eof, self.pos));
        }

        let start = self.pos;
        let ch = self.src[self.pos];

        let kind = match ch {
            b'\'' => self.lex_string(start)?,
            b'"' => self.lex_quoted_id(start, b'"')?,
            b'`' => self.lex_quoted_id(start, b'`')?,
            b'[' => self.lex_bracket_id(start)?,
            b'X' | b'x' if self.peek_at(1) == Some(b'\'') => self.lex_blob(start)?,
            b'0'..=b'9' => self.lex_number(start)?,
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.lex_number(start)?
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_identifier(start),
            b'?' => self.lex_question(start)?,
            b':' => self.lex_named_param(start, TokenKind::ColonParam)?,
            b'@' => self.lex_named_param(start, TokenKind::AtParam)?,
            b'$' => self.lex_named_param(start, TokenKind::DollarParam)?,

            b'+' => self.single(TokenKind::Plus),
            b'-' => self.single(TokenKind::Minus),
            b'*' => self.single(TokenKind::Star),
            b'/' => self.single(TokenKind::Slash),
            b'%' => self.single(TokenKind::Percent),
            b'&' => self.single(TokenKind::Ampersand),
            b'~' => self.single(TokenKind::Tilde),
            b'.' => self.single(TokenKind::Dot),
            b',' => self.single(TokenKind::Comma),
            b';' => self.single(TokenKind::Semicolon),
            b'(' => self.single(TokenKind::LeftParen),
            b')' => self.single(TokenKind::RightParen),

            b'<' => self.lex_lt(),
            b'>' => self.lex_gt(),
            b'=' => self.lex_eq(),
            b'!' => self.lex_bang(start)?,
            b'|' => self.lex_pipe(),

            _ => {
                // Advance past the whole codepoint so multi-byte characters
                // produce one error, not one per byte.
                let text = std::str::from_utf8(&self.src[self.pos..])
                    .ok()
                    .and_then(|s| s.chars().next());
                let (c, width) = text.map_or(('\u{FFFD}', 1), |c| (c, c.len_utf8()));
                self.pos += width;
                self.error(LexErrorKind::UnexpectedCharacter(c), start);
                return None;
            }
        };

        Some(self.token_at(kind, start))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn token_at(&self, kind: TokenKind, start: usize) -> Token {
        let span = Span::new(start as u32, (self.pos - start) as u32);
        let lexeme = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        Token { kind, span, lexeme }
    }

    fn error(&mut self, kind: LexErrorKind, start: usize) {
        let span = Span::new(start as u32, (self.pos - start) as u32);
        self.errors.push(LexError { kind, span });
    }

    /// Skip whitespace, `--` line comments, and non-nesting `/* */` block
    /// comments. An unterminated block comment is an error that consumes
    /// the rest of the input.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }

            if self.src.get(self.pos) == Some(&b'-') && self.peek_at(1) == Some(b'-') {
                self.pos += 2;
                while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }

            if self.src.get(self.pos) == Some(&b'/') && self.peek_at(1) == Some(b'*') {
                let start = self.pos;
                self.pos += 2;
                let mut closed = false;
                while self.pos < self.src.len() {
                    if self.src[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                        self.pos += 2;
                        closed = true;
                        break;
                    }
                    self.pos += 1;
                }
                if !closed {
                    self.error(LexErrorKind::UnterminatedBlockComment, start);
                }
                continue;
            }

            break;
        }
    }

    // -----------------------------------------------------------------------
    // Literals
    // -----------------------------------------------------------------------

    /// Single-quoted string with `''` escape. memchr finds each candidate
    /// closing quote.
    fn lex_string(&mut self, start: usize) -> Option<TokenKind> {
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            match memchr(b'\'', &self.src[self.pos..]) {
                Some(offset) => {
                    value.push_str(&String::from_utf8_lossy(
                        &self.src[self.pos..self.pos + offset],
                    ));
                    self.pos += offset + 1; // content + quote
                    if self.peek() == Some(b'\'') {
                        value.push('\'');
                        self.pos += 1;
                    } else {
                        return Some(TokenKind::String(value));
                    }
                }
                None => {
                    self.pos = self.src.len();
                    self.error(LexErrorKind::UnterminatedString, start);
                    return None;
                }
            }
        }
    }

    /// `"name"` or `` `name` `` quoted identifier with doubled-quote escape.
    fn lex_quoted_id(&mut self, start: usize, quote: u8) -> Option<TokenKind> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match memchr(quote, &self.src[self.pos..]) {
                Some(offset) => {
                    value.push_str(&String::from_utf8_lossy(
                        &self.src[self.pos..self.pos + offset],
                    ));
                    self.pos += offset + 1;
                    if self.peek() == Some(quote) {
                        value.push(quote as char);
                        self.pos += 1;
                    } else {
                        return Some(TokenKind::QuotedId(value));
                    }
                }
                None => {
                    self.pos = self.src.len();
                    self.error(LexErrorKind::UnterminatedString, start);
                    return None;
                }
            }
        }
    }

    /// `[name]` quoted identifier.
    fn lex_bracket_id(&mut self, start: usize) -> Option<TokenKind> {
        self.pos += 1;
        match memchr(b']', &self.src[self.pos..]) {
            Some(offset) => {
                let value =
                    String::from_utf8_lossy(&self.src[self.pos..self.pos + offset]).into_owned();
                self.pos += offset + 1;
                Some(TokenKind::QuotedId(value))
            }
            None => {
                self.pos = self.src.len();
                self.error(LexErrorKind::UnterminatedString, start);
                None
            }
        }
    }

    /// `X'...'` blob literal; an even count of hex digits is required.
    fn lex_blob(&mut self, start: usize) -> Option<TokenKind> {
        self.pos += 2; // X and opening quote
        match memchr(b'\'', &self.src[self.pos..]) {
            Some(offset) => {
                let hex = &self.src[self.pos..self.pos + offset];
                self.pos += offset + 1;
                if hex.len() % 2 != 0 || !hex.iter().all(u8::is_ascii_hexdigit) {
                    self.error(
                        LexErrorKind::MalformedLiteral("blob literal requires even hex".into()),
                        start,
                    );
                    return None;
                }
                let bytes = hex
                    .chunks(2)
                    .map(|pair| {
                        let s = std::str::from_utf8(pair).unwrap_or("00");
                        u8::from_str_radix(s, 16).unwrap_or(0)
                    })
                    .collect();
                Some(TokenKind::Blob(bytes))
            }
            None => {
                self.pos = self.src.len();
                self.error(LexErrorKind::UnterminatedString, start);
                None
            }
        }
    }

    /// Integer, hex integer, or float (fraction and/or exponent).
    fn lex_number(&mut self, start: usize) -> Option<TokenKind> {
        if self.src[self.pos] == b'0' && self.peek_at(1).is_some_and(|c| c == b'x' || c == b'X') {
            self.pos += 2;
            let hex_start = self.pos;
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_hexdigit() {
                self.pos += 1;
            }
            if self.pos == hex_start {
                self.error(LexErrorKind::MalformedLiteral("empty hex literal".into()), start);
                return None;
            }
            let text = String::from_utf8_lossy(&self.src[hex_start..self.pos]);
            return match i64::from_str_radix(&text, 16) {
                Ok(v) => Some(TokenKind::Integer(v)),
                Err(_) => {
                    self.error(
                        LexErrorKind::MalformedLiteral(format!("hex literal out of range: {text}")),
                        start,
                    );
                    None
                }
            };
        }

        let mut is_float = self.src[start] == b'.';

        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        } else if self.src[start] == b'.' {
            // Leading-dot form: consume the dot then the fraction digits.
            self.pos += 1;
            while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                self.pos += 1;
            }
        }
        if self.peek().is_some_and(|c| c == b'e' || c == b'E') {
            let mut lookahead = 1;
            if self
                .peek_at(1)
                .is_some_and(|c| c == b'+' || c == b'-')
            {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += lookahead;
                while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }

        let text = String::from_utf8_lossy(&self.src[start..self.pos]);
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => Some(TokenKind::Real(v)),
                Err(_) => {
                    self.error(
                        LexErrorKind::MalformedLiteral(format!("invalid float: {text}")),
                        start,
                    );
                    None
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => Some(TokenKind::Integer(v)),
                Err(_) => {
                    self.error(
                        LexErrorKind::MalformedLiteral(format!("integer out of range: {text}")),
                        start,
                    );
                    None
                }
            }
        }
    }

    /// Bare identifier or keyword.
    fn lex_identifier(&mut self, start: usize) -> TokenKind {
        self.pos += 1;
        while self.pos < self.src.len() {
            let ch = self.src[self.pos];
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        TokenKind::lookup_keyword(&text).unwrap_or(TokenKind::Id(text))
    }

    /// `?` or `?NNN`.
    fn lex_question(&mut self, start: usize) -> Option<TokenKind> {
        self.pos += 1;
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Some(TokenKind::Question);
        }
        let num_start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.src[num_start..self.pos]);
        match text.parse::<u32>() {
            Ok(n) => Some(TokenKind::QuestionNum(n)),
            Err(_) => {
                self.error(
                    LexErrorKind::MalformedLiteral(format!("variable index out of range: {text}")),
                    start,
                );
                None
            }
        }
    }

    /// `:name`, `@name`, or `$name`.
    fn lex_named_param(
        &mut self,
        start: usize,
        make: impl FnOnce(String) -> TokenKind,
    ) -> Option<TokenKind> {
        self.pos += 1;
        let name_start = self.pos;
        while self.pos < self.src.len() {
            let ch = self.src[self.pos];
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == name_start {
            self.error(
                LexErrorKind::MalformedLiteral("empty variable name".into()),
                start,
            );
            return None;
        }
        let name = String::from_utf8_lossy(&self.src[name_start..self.pos]).into_owned();
        Some(make(name))
    }

    // -----------------------------------------------------------------------
    // Multi-character operators
    // -----------------------------------------------------------------------

    fn lex_lt(&mut self) -> TokenKind {
        self.pos += 1;
        match self.peek() {
            Some(b'=') => self.single(TokenKind::Le),
            Some(b'>') => self.single(TokenKind::LtGt),
            Some(b'<') => self.single(TokenKind::ShiftLeft),
            _ => TokenKind::Lt,
        }
    }

    fn lex_gt(&mut self) -> TokenKind {
        self.pos += 1;
        match self.peek() {
            Some(b'=') => self.single(TokenKind::Ge),
            Some(b'>') => self.single(TokenKind::ShiftRight),
            _ => TokenKind::Gt,
        }
    }

    fn lex_eq(&mut self) -> TokenKind {
        self.pos += 1;
        if self.peek() == Some(b'=') {
            self.single(TokenKind::EqEq)
        } else {
            TokenKind::Eq
        }
    }

    fn lex_bang(&mut self, start: usize) -> Option<TokenKind> {
        self.pos += 1;
        if self.peek() == Some(b'=') {
            Some(self.single(TokenKind::Ne))
        } else {
            self.error(LexErrorKind::UnexpectedCharacter('!'), start);
            None
        }
    }

    fn lex_pipe(&mut self) -> TokenKind {
        self.pos += 1;
        if self.peek() == Some(b'|') {
            self.single(TokenKind::Concat)
        } else {
            TokenKind::Pipe
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::tokenize(src);
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn errors(src: &str) -> Vec<LexError> {
        Lexer::tokenize(src).1
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(
            kinds("42 0 0xFF"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Integer(0),
                TokenKind::Integer(255),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_float_literals() {
        let tokens = kinds("3.14 1e10 .5 1.0e-3");
        assert!(matches!(tokens[0], TokenKind::Real(v) if (v - 3.14).abs() < 1e-10));
        assert!(matches!(tokens[1], TokenKind::Real(v) if (v - 1e10).abs() < 1.0));
        assert!(matches!(tokens[2], TokenKind::Real(v) if (v - 0.5).abs() < 1e-10));
        assert!(matches!(tokens[3], TokenKind::Real(v) if (v - 0.001).abs() < 1e-10));
    }

    #[test]
    fn test_string_literals_with_escape() {
        let tokens = kinds("'hello' 'it''s' ''");
        assert_eq!(tokens[0], TokenKind::String("hello".to_owned()));
        assert_eq!(tokens[1], TokenKind::String("it's".to_owned()));
        assert_eq!(tokens[2], TokenKind::String(String::new()));
    }

    #[test]
    fn test_blob_literals() {
        let tokens = kinds("X'CAFE' x'00ff'");
        assert_eq!(tokens[0], TokenKind::Blob(vec![0xCA, 0xFE]));
        assert_eq!(tokens[1], TokenKind::Blob(vec![0x00, 0xFF]));
    }

    #[test]
    fn test_quoted_identifiers() {
        let tokens = kinds("\"table name\" [column] `tick` \"with\"\"quote\"");
        assert_eq!(tokens[0], TokenKind::QuotedId("table name".to_owned()));
        assert_eq!(tokens[1], TokenKind::QuotedId("column".to_owned()));
        assert_eq!(tokens[2], TokenKind::QuotedId("tick".to_owned()));
        assert_eq!(tokens[3], TokenKind::QuotedId("with\"quote".to_owned()));
    }

    #[test]
    fn test_bind_variables() {
        let tokens = kinds("? ?3 :name @at $dollar");
        assert_eq!(tokens[0], TokenKind::Question);
        assert_eq!(tokens[1], TokenKind::QuestionNum(3));
        assert_eq!(tokens[2], TokenKind::ColonParam("name".to_owned()));
        assert_eq!(tokens[3], TokenKind::AtParam("at".to_owned()));
        assert_eq!(tokens[4], TokenKind::DollarParam("dollar".to_owned()));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = kinds("SELECT from WhErE");
        assert_eq!(tokens[0], TokenKind::KwSelect);
        assert_eq!(tokens[1], TokenKind::KwFrom);
        assert_eq!(tokens[2], TokenKind::KwWhere);
    }

    #[test]
    fn test_two_char_operators_win() {
        let tokens = kinds("<= >= <> != || << >> == < > = |");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::LtGt,
                TokenKind::Ne,
                TokenKind::Concat,
                TokenKind::ShiftLeft,
                TokenKind::ShiftRight,
                TokenKind::EqEq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eq,
                TokenKind::Pipe,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_discarded() {
        let tokens = kinds("SELECT -- comment\n a /* block\nspanning */ FROM b");
        assert_eq!(tokens[0], TokenKind::KwSelect);
        assert_eq!(tokens[1], TokenKind::Id("a".to_owned()));
        assert_eq!(tokens[2], TokenKind::KwFrom);
        assert_eq!(tokens[3], TokenKind::Id("b".to_owned()));
    }

    #[test]
    fn test_block_comment_does_not_nest() {
        // The first */ closes the comment even after an inner /*.
        let tokens = kinds("/* outer /* inner */ SELECT");
        assert_eq!(tokens[0], TokenKind::KwSelect);
    }

    #[test]
    fn test_unterminated_string_error() {
        let errs = errors("'open");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, LexErrorKind::UnterminatedString);
        assert_eq!(errs[0].span.offset, 0);
    }

    #[test]
    fn test_unterminated_block_comment_error() {
        let errs = errors("SELECT /* open");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, LexErrorKind::UnterminatedBlockComment);
    }

    #[test]
    fn test_unexpected_character_continues() {
        let (tokens, errs) = Lexer::tokenize("SELECT ^ 1");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, LexErrorKind::UnexpectedCharacter('^'));
        // Scanning continued past the bad character.
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::KwSelect, TokenKind::Integer(1), TokenKind::Eof]
        );
    }

    #[test]
    fn test_blob_odd_digits_error() {
        let errs = errors("X'CAF'");
        assert_eq!(errs.len(), 1);
        assert!(matches!(errs[0].kind, LexErrorKind::MalformedLiteral(_)));
    }

    #[test]
    fn test_lexemes_reconstruct_source() {
        let src = "SELECT a, 'x''y' FROM t WHERE a >= 10 -- tail";
        let (tokens, errs) = Lexer::tokenize(src);
        assert!(errs.is_empty());
        // Lexemes appear verbatim at their spans; joining them with the
        // discarded gaps reproduces the source.
        let mut rebuilt = String::new();
        let mut cursor = 0usize;
        for tok in &tokens {
            let offset = tok.span.offset as usize;
            rebuilt.push_str(&src[cursor..offset]);
            rebuilt.push_str(&tok.lexeme);
            cursor = offset + tok.lexeme.len();
        }
        rebuilt.push_str(&src[cursor..]);
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn test_spans_cover_tokens() {
        let src = "SELECT id";
        let (tokens, _) = Lexer::tokenize(src);
        assert_eq!(tokens[0].span, Span::new(0, 6));
        assert_eq!(tokens[1].span, Span::new(7, 2));
        assert_eq!(tokens[0].lexeme, "SELECT");
        assert_eq!(tokens[1].lexeme, "id");
    }
}
