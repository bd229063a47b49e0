//! Pratt expression parsing: literals, columns, function calls, `CASE`,
//! `CAST`, and the comparison-layer pseudo-infix forms.

use super::pratt::{infix_binding_power, prefix_binding_power, token_to_binary_op, token_to_unary_op};
use super::Parser;
use crate::ast::{BinaryOp, Expr, Literal};
use crate::error::{Error, Result};
use crate::lexer::{Keyword, TokenKind};
use crate::value::DataType;

impl<'a> Parser<'a> {
    /// Parses an expression via precedence climbing down to `min_bp`.
    pub(super) fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.check_keyword(Keyword::Is) {
                if infix_binding_power(&TokenKind::Keyword(Keyword::Is)).unwrap().0 < min_bp {
                    break;
                }
                self.advance();
                let negated = self.match_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                lhs = Expr::IsNull {
                    expr: Box::new(lhs),
                    negated,
                };
                continue;
            }

            let negated_lookahead = self.check_keyword(Keyword::Not);
            if negated_lookahead || self.check_keyword(Keyword::Between) || self.check_keyword(Keyword::In) || self.check_keyword(Keyword::Like) {
                if infix_binding_power(&TokenKind::Keyword(Keyword::Between)).unwrap().0 < min_bp {
                    break;
                }
                let negated = self.match_keyword(Keyword::Not);
                if self.match_keyword(Keyword::Between) {
                    let low = self.parse_expr_bp(14)?;
                    self.expect_keyword(Keyword::And)?;
                    let high = self.parse_expr_bp(14)?;
                    lhs = Expr::Between {
                        expr: Box::new(lhs),
                        low: Box::new(low),
                        high: Box::new(high),
                        negated,
                    };
                    continue;
                } else if self.match_keyword(Keyword::In) {
                    self.expect_token(TokenKind::LeftParen)?;
                    let mut list = Vec::new();
                    if !self.check(&TokenKind::RightParen) {
                        loop {
                            list.push(self.parse_expr_bp(0)?);
                            if !self.match_token(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect_token(TokenKind::RightParen)?;
                    lhs = Expr::InList {
                        expr: Box::new(lhs),
                        list,
                        negated,
                    };
                    continue;
                } else if self.match_keyword(Keyword::Like) {
                    let pattern = self.parse_expr_bp(14)?;
                    lhs = Expr::Like {
                        expr: Box::new(lhs),
                        pattern: Box::new(pattern),
                        negated,
                    };
                    continue;
                } else if negated_lookahead {
                    // Bare leading NOT with no BETWEEN/IN/LIKE: negate lhs.
                    lhs = Expr::Unary {
                        op: crate::ast::UnaryOp::Not,
                        expr: Box::new(lhs),
                    };
                    continue;
                }
            }

            let Some((left_bp, right_bp)) = infix_binding_power(&self.current.kind) else {
                break;
            };
            if left_bp < min_bp {
                break;
            }
            let op_token = self.advance();
            let Some(op) = token_to_binary_op(&op_token.kind) else {
                break;
            };
            let rhs = self.parse_expr_bp(right_bp)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        if let Some(op) = token_to_unary_op(&self.current.kind) {
            if matches!(self.current.kind, TokenKind::Minus | TokenKind::Keyword(Keyword::Not)) {
                let bp = prefix_binding_power(&self.current.kind).unwrap_or(0);
                self.advance();
                let expr = self.parse_expr_bp(bp)?;
                return Ok(Expr::Unary {
                    op,
                    expr: Box::new(expr),
                });
            }
        }

        match self.current.kind.clone() {
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr_bp(0)?;
                self.expect_token(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::Integer(i) => {
                self.advance();
                Ok(Expr::Literal(Literal::Int(i)))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expr::Literal(Literal::Float(f)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::Text(s)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case(),
            TokenKind::Keyword(Keyword::Cast | Keyword::Convert) => self.parse_cast(),
            TokenKind::Identifier(name) => self.parse_identifier_or_call(name),
            TokenKind::Keyword(kw @ (Keyword::Count | Keyword::Sum | Keyword::Avg | Keyword::Min | Keyword::Max)) => {
                let name = format!("{kw:?}").to_ascii_uppercase();
                self.advance();
                self.parse_call(name)
            }
            TokenKind::Star => {
                // Bare `*` only makes sense as a COUNT(*) argument; the
                // caller (parse_call) handles it directly, so reaching
                // here means a malformed expression.
                Err(self.unexpected("expression"))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_identifier_or_call(&mut self, name: String) -> Result<Expr> {
        self.advance();
        if self.check(&TokenKind::LeftParen) {
            return self.parse_call(name);
        }
        if self.match_token(&TokenKind::Dot) {
            let field = self.expect_identifier()?;
            return Ok(Expr::Column {
                qualifier: Some(name),
                name: field,
            });
        }
        Ok(Expr::Column {
            qualifier: None,
            name,
        })
    }

    fn parse_call(&mut self, name: String) -> Result<Expr> {
        self.expect_token(TokenKind::LeftParen)?;
        let distinct = self.match_keyword(Keyword::Distinct);
        let args_start = self.current.span.start;

        let mut args = Vec::new();
        if self.check(&TokenKind::Star) {
            self.advance();
            args.push(Expr::Column {
                qualifier: None,
                name: "*".to_string(),
            });
        } else if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expr_bp(0)?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let args_end = self.current.span.start;
        let close = self.expect_token(TokenKind::RightParen)?;
        let args_text = if args.is_empty() {
            String::new()
        } else {
            self.source_slice(crate::lexer::Span::new(args_start, args_end.max(args_start)))
                .trim()
                .to_string()
        };
        let _ = close;
        Ok(Expr::Call {
            name,
            distinct,
            args,
            args_text,
        })
    }

    fn parse_case(&mut self) -> Result<Expr> {
        self.expect_keyword(Keyword::Case)?;
        let operand = if self.check_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expr_bp(0)?))
        };
        let mut branches = Vec::new();
        while self.match_keyword(Keyword::When) {
            let cond = self.parse_expr_bp(0)?;
            self.expect_keyword(Keyword::Then)?;
            let result = self.parse_expr_bp(0)?;
            branches.push((cond, result));
        }
        let else_branch = if self.match_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expr_bp(0)?))
        } else {
            None
        };
        self.expect_keyword(Keyword::End)?;
        Ok(Expr::Case {
            operand,
            branches,
            else_branch,
        })
    }

    fn parse_cast(&mut self) -> Result<Expr> {
        self.advance(); // CAST or CONVERT
        self.expect_token(TokenKind::LeftParen)?;
        let expr = self.parse_expr_bp(0)?;
        self.expect_keyword(Keyword::As)?;
        let target = self.parse_data_type()?;
        self.expect_token(TokenKind::RightParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            target,
        })
    }

    /// Parses a type name, optionally followed by `(precision[, scale])`,
    /// which is accepted and discarded.
    pub(super) fn parse_data_type(&mut self) -> Result<DataType> {
        let Some(kw) = self.current.as_keyword() else {
            return Err(self.unexpected("type name"));
        };
        let data_type = DataType::from_keyword(kw).unwrap_or(DataType::Text);
        self.advance();
        if self.match_token(&TokenKind::LeftParen) {
            loop {
                self.advance();
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect_token(TokenKind::RightParen)?;
        }
        Ok(data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    fn parse(sql: &str) -> Expr {
        let mut p = Parser::new(sql);
        p.parse_expr_bp(0).unwrap()
    }

    #[test]
    fn operator_precedence_multiplication_over_addition() {
        match parse("1 + 2 * 3") {
            Expr::Binary { op: BinaryOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn between_is_parsed() {
        assert!(matches!(parse("x BETWEEN 1 AND 10"), Expr::Between { .. }));
    }

    #[test]
    fn not_between_is_negated() {
        match parse("x NOT BETWEEN 1 AND 10") {
            Expr::Between { negated, .. } => assert!(negated),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn is_null_is_parsed() {
        assert!(matches!(parse("x IS NULL"), Expr::IsNull { negated: false, .. }));
        assert!(matches!(parse("x IS NOT NULL"), Expr::IsNull { negated: true, .. }));
    }

    #[test]
    fn in_list_is_parsed() {
        match parse("x IN (1, 2, 3)") {
            Expr::InList { list, .. } => assert_eq!(list.len(), 3),
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn aggregate_call_captures_args_text() {
        match parse("COUNT(DISTINCT Category)") {
            Expr::Call { name, distinct, args_text, .. } => {
                assert_eq!(name, "COUNT");
                assert!(distinct);
                assert_eq!(args_text, "Category");
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn qualified_column_reference() {
        assert!(matches!(
            parse("t.col"),
            Expr::Column { qualifier: Some(q), name } if q == "t" && name == "col"
        ));
    }

    #[test]
    fn case_searched_form() {
        match parse("CASE WHEN 1 < 2 THEN 'a' ELSE 'b' END") {
            Expr::Case { operand, branches, else_branch } => {
                assert!(operand.is_none());
                assert_eq!(branches.len(), 1);
                assert!(else_branch.is_some());
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn cast_parses_target_type_and_discards_precision() {
        assert!(matches!(
            parse("CAST(x AS VARCHAR(20))"),
            Expr::Cast { target: DataType::Text, .. }
        ));
    }

    #[test]
    fn source_slice_matches_span() {
        let mut p = Parser::new("COUNT(a, b)");
        let _ = p.parse_expr_bp(0).unwrap();
        assert_eq!(p.source_slice(Span::new(0, 5)), "COUNT");
    }
}
