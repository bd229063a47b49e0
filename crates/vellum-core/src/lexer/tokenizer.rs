//! SQL tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// Tokenizes SQL source text.
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    start: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// The full source text this lexer was constructed from.
    #[must_use]
    pub const fn source(&self) -> &'a str {
        self.input
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace, `--` line comments and `/* ... */` block comments.
    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                self.advance();
                self.advance();
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos)
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    /// Scans an identifier or keyword. Leading `@`/`#` are part of the name.
    fn scan_identifier(&mut self) -> Token {
        if matches!(self.peek(), Some('@' | '#')) {
            self.advance();
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '@' || c == '#')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    /// Scans a bracket- or backtick-quoted identifier. Emitted verbatim, no case folding.
    fn scan_quoted_identifier(&mut self, open: char, close: char) -> Token {
        self.advance(); // opening delimiter
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == close => {
                    if open == close && self.peek_next() == Some(close) {
                        value.push(close);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        self.make_token(TokenKind::Identifier(value))
    }

    /// Scans a number: digits, optional `.` fraction, optional `e|E[+-]?digits` exponent.
    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            let save = self.pos;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            } else {
                self.pos = save;
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_float {
            let value = text.parse::<f64>().unwrap_or(0.0);
            self.make_token(TokenKind::Float(value))
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.make_token(TokenKind::Integer(value)),
                Err(_) => self.make_token(TokenKind::Float(text.parse::<f64>().unwrap_or(0.0))),
            }
        }
    }

    /// Scans a single- or double-quoted string literal. A doubled quote is a literal quote.
    fn scan_string(&mut self, quote: char) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    if self.peek_next() == Some(quote) {
                        value.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        break;
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        self.make_token(TokenKind::String(value))
    }

    /// Scans the next token. Unknown bytes are skipped silently.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.skip_trivia();
            self.start = self.pos;

            let Some(c) = self.advance() else {
                return self.make_token(TokenKind::Eof);
            };

            return match c {
                '(' => self.make_token(TokenKind::LeftParen),
                ')' => self.make_token(TokenKind::RightParen),
                ',' => self.make_token(TokenKind::Comma),
                ';' => self.make_token(TokenKind::Semicolon),
                '.' if !self.peek().is_some_and(|n| n.is_ascii_digit()) => {
                    self.make_token(TokenKind::Dot)
                }
                '+' => self.make_token(TokenKind::Plus),
                '-' => self.make_token(TokenKind::Minus),
                '*' => self.make_token(TokenKind::Star),
                '/' => self.make_token(TokenKind::Slash),
                '%' => self.make_token(TokenKind::Percent),
                '^' => self.make_token(TokenKind::Caret),
                '=' => self.make_token(TokenKind::Eq),
                ':' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.make_token(TokenKind::Assign)
                    } else {
                        // Unrecognized bare colon; skip and retry.
                        continue;
                    }
                }
                '<' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.make_token(TokenKind::LtEq)
                    } else if self.peek() == Some('>') {
                        self.advance();
                        self.make_token(TokenKind::NotEq)
                    } else {
                        self.make_token(TokenKind::Lt)
                    }
                }
                '>' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.make_token(TokenKind::GtEq)
                    } else {
                        self.make_token(TokenKind::Gt)
                    }
                }
                '!' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.make_token(TokenKind::NotEq)
                    } else {
                        continue;
                    }
                }
                '\'' => {
                    self.pos = self.start;
                    self.scan_string('\'')
                }
                '"' => {
                    self.pos = self.start;
                    self.scan_quoted_identifier('"', '"')
                }
                '`' => {
                    self.pos = self.start;
                    self.scan_quoted_identifier('`', '`')
                }
                '[' => {
                    self.pos = self.start;
                    self.scan_quoted_identifier('[', ']')
                }
                c if c.is_ascii_digit() || (c == '.' && self.peek().is_some()) => {
                    self.pos = self.start;
                    self.scan_number()
                }
                c if c.is_alphabetic() || c == '_' || c == '@' || c == '#' => {
                    self.pos = self.start;
                    self.scan_identifier()
                }
                _ => continue,
            };
        }
    }

    /// Tokenizes the entire input, returning all tokens including the trailing `Eof`.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(token_kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn line_and_block_comments_are_stripped() {
        assert_eq!(
            token_kinds("SELECT -- comment\nFROM /* block\nspan */ t"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Identifier("t".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            token_kinds("select FROM wHeRe"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn bracket_and_backtick_identifiers_preserve_case() {
        assert_eq!(
            token_kinds("[Order Id] `Weird Name`"),
            vec![
                TokenKind::Identifier("Order Id".into()),
                TokenKind::Identifier("Weird Name".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn at_and_hash_prefixed_identifiers() {
        assert_eq!(
            token_kinds("@param #temp"),
            vec![
                TokenKind::Identifier("@param".into()),
                TokenKind::Identifier("#temp".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_with_fraction_and_exponent() {
        assert_eq!(
            token_kinds("42 3.14 1e10 2.5e-3"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Float(3.14),
                TokenKind::Float(1e10),
                TokenKind::Float(2.5e-3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_with_doubled_quote_escape() {
        assert_eq!(
            token_kinds("'it''s'"),
            vec![TokenKind::String("it's".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn two_char_operators_before_one_char() {
        assert_eq!(
            token_kinds("<> != <= >= := < > = +"),
            vec![
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Assign,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eq,
                TokenKind::Plus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn simple_select_statement() {
        let sql = "SELECT id, name FROM users WHERE active = 1";
        assert_eq!(
            token_kinds(sql),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier("id".into()),
                TokenKind::Comma,
                TokenKind::Identifier("name".into()),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Identifier("users".into()),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Identifier("active".into()),
                TokenKind::Eq,
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unknown_bytes_are_skipped() {
        assert_eq!(
            token_kinds("SELECT \u{1} 1"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
    }
}
