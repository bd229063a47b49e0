//! Hand-written recursive-descent parser with Pratt expression parsing.
//!
//! Statements (`SELECT`, `INSERT`, `UPDATE`, `DELETE`, DDL, `CREATE
//! FUNCTION`, `CREATE TRIGGER`) are parsed by dedicated recursive-descent
//! methods in [`stmt`]. Expressions use a Pratt (top-down operator
//! precedence) parser in [`expr`] that handles prefix, infix, and the
//! comparison-layer pseudo-infix forms (`IS NULL`, `BETWEEN`, `IN`,
//! `LIKE`) with the binding powers from [`pratt`].

mod expr;
mod pratt;
mod stmt;

use crate::error::{Error, Result};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Token-cursor parser shared by statement and expression parsing.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
        }
    }

    /// Parses a single statement. Does not require trailing `;` but
    /// consumes one if present.
    pub fn parse_statement(&mut self) -> Result<crate::ast::Statement> {
        let stmt = self.parse_statement_inner()?;
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        Ok(stmt)
    }

    fn advance(&mut self) -> Token {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
        self.previous.clone()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current.kind == kind
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.current.as_keyword() == Some(kw)
    }

    fn match_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<Token> {
        if self.check_keyword(kw) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(format!("{kw:?}")))
        }
    }

    fn expect_token(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(format!("{kind:?}")))
        }
    }

    /// Expects an identifier (bare or quoted) and returns its text.
    fn expect_identifier(&mut self) -> Result<String> {
        match self.current.as_name() {
            Some(name) => {
                let name = name.to_string();
                self.advance();
                Ok(name)
            }
            None => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> Error {
        Error::ParseError {
            span: self.current.span,
            expected: expected.into(),
            found: format!("{:?}", self.current.kind),
        }
    }

    /// Captures the exact source slice spanning `[start, end)` of the
    /// original input, used for trigger `source_text` and aggregate
    /// `args_text`.
    fn source_slice(&self, span: Span) -> &'a str {
        &self.lexer_input()[span.start..span.end]
    }

    fn lexer_input(&self) -> &'a str {
        self.lexer.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    #[test]
    fn parses_simple_select() {
        let mut p = Parser::new("SELECT 1 + 1");
        let stmt = p.parse_statement().unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }

    #[test]
    fn unexpected_token_is_parse_error() {
        let mut p = Parser::new("SELEC 1");
        assert!(p.parse_statement().is_err());
    }
}
