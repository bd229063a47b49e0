//! Statement-level recursive-descent parsing: DQL, DML, DDL, functions,
//! and triggers.

use super::Parser;
use crate::ast::{
    AlterTableStatement, ColumnDef, CreateFunctionStatement, CreateTableStatement,
    CreateTriggerStatement, DeleteStatement, FunctionParam, InsertStatement, Join, JoinKind,
    OrderBy, OrderDirection, SelectItem, SelectStatement, Statement, TableRef, TriggerEvent,
    TriggerStmt, TriggerTiming, UpdateAssignment, UpdateStatement,
};
use crate::error::Result;
use crate::lexer::{Keyword, TokenKind};

impl<'a> Parser<'a> {
    pub(super) fn parse_statement_inner(&mut self) -> Result<Statement> {
        match self.current.as_keyword() {
            Some(Keyword::Select) => Ok(Statement::Select(self.parse_select()?)),
            Some(Keyword::Insert) => Ok(Statement::Insert(self.parse_insert()?)),
            Some(Keyword::Update) => Ok(Statement::Update(self.parse_update()?)),
            Some(Keyword::Delete) => Ok(Statement::Delete(self.parse_delete()?)),
            Some(Keyword::Create) => self.parse_create(),
            Some(Keyword::Alter) => Ok(Statement::AlterTable(self.parse_alter_table()?)),
            Some(Keyword::Drop) => self.parse_drop(),
            _ => Err(self.unexpected("statement")),
        }
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Create)?;
        match self.current.as_keyword() {
            Some(Keyword::Table) => Ok(Statement::CreateTable(self.parse_create_table()?)),
            Some(Keyword::Function) => Ok(Statement::CreateFunction(self.parse_create_function()?)),
            Some(Keyword::Trigger) => Ok(Statement::CreateTrigger(self.parse_create_trigger()?)),
            _ => Err(self.unexpected("TABLE, FUNCTION, or TRIGGER")),
        }
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Drop)?;
        match self.current.as_keyword() {
            Some(Keyword::Table) => {
                self.advance();
                let if_exists = self.match_keyword(Keyword::If) && self.match_keyword(Keyword::Exists);
                let name = self.expect_identifier()?;
                Ok(Statement::DropTable { name, if_exists })
            }
            Some(Keyword::Function) => {
                self.advance();
                let name = self.expect_identifier()?;
                Ok(Statement::DropFunction { name })
            }
            Some(Keyword::Trigger) => {
                self.advance();
                let if_exists = self.match_keyword(Keyword::If) && self.match_keyword(Keyword::Exists);
                let name = self.expect_identifier()?;
                Ok(Statement::DropTrigger { name, if_exists })
            }
            _ => Err(self.unexpected("TABLE, FUNCTION, or TRIGGER")),
        }
    }

    // ---- SELECT ----------------------------------------------------

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;
        let distinct = self.match_keyword(Keyword::Distinct);
        let top = if self.match_keyword(Keyword::Top) {
            Some(self.expect_integer_literal()?)
        } else {
            None
        };

        let mut items = vec![self.parse_select_item()?];
        while self.match_token(&TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }

        let mut from = Vec::new();
        let mut joins = Vec::new();
        if self.match_keyword(Keyword::From) {
            from.push(self.parse_table_ref()?);
            while self.match_token(&TokenKind::Comma) {
                from.push(self.parse_table_ref()?);
            }
            joins = self.parse_joins()?;
        }

        let filter = if self.match_keyword(Keyword::Where) {
            Some(self.parse_expr_bp(0)?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.match_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By)?;
            group_by.push(self.parse_expr_bp(0)?);
            while self.match_token(&TokenKind::Comma) {
                group_by.push(self.parse_expr_bp(0)?);
            }
        }

        let having = if self.match_keyword(Keyword::Having) {
            Some(self.parse_expr_bp(0)?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.match_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            order_by.push(self.parse_order_by_item()?);
            while self.match_token(&TokenKind::Comma) {
                order_by.push(self.parse_order_by_item()?);
            }
        }

        let mut limit = if self.match_keyword(Keyword::Limit) {
            Some(self.expect_integer_literal()?)
        } else {
            None
        };
        let offset = if self.match_keyword(Keyword::Offset) {
            Some(self.expect_integer_literal()?)
        } else {
            None
        };
        if limit.is_none() {
            limit = top;
        }

        Ok(SelectStatement {
            distinct,
            top,
            items,
            from,
            joins,
            filter,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.check(&TokenKind::Star) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }
        if let TokenKind::Identifier(name) = self.current.kind.clone() {
            if matches!(self.peek_kind(1), Some(TokenKind::Dot))
                && matches!(self.peek_kind(2), Some(TokenKind::Star))
            {
                self.advance();
                self.advance();
                self.advance();
                return Ok(SelectItem::QualifiedWildcard(name));
            }
        }
        let expr = self.parse_expr_bp(0)?;
        let alias = if self.match_keyword(Keyword::As) {
            Some(self.expect_identifier()?)
        } else if let TokenKind::Identifier(name) = self.current.kind.clone() {
            self.advance();
            Some(name)
        } else {
            None
        };
        Ok(SelectItem::Expr { expr, alias })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_identifier()?;
        let alias = if self.match_keyword(Keyword::As) {
            Some(self.expect_identifier()?)
        } else if let TokenKind::Identifier(alias) = self.current.kind.clone() {
            self.advance();
            Some(alias)
        } else {
            None
        };
        Ok(TableRef { name, alias })
    }

    fn parse_joins(&mut self) -> Result<Vec<Join>> {
        let mut joins = Vec::new();
        loop {
            let kind = if self.match_keyword(Keyword::Cross) {
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Cross
            } else if self.match_keyword(Keyword::Inner) {
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Inner
            } else if self.match_keyword(Keyword::Left) {
                self.match_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Left
            } else if self.match_keyword(Keyword::Right) {
                self.match_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Right
            } else if self.match_keyword(Keyword::Full) {
                self.match_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join)?;
                JoinKind::Full
            } else if self.match_keyword(Keyword::Join) {
                JoinKind::Inner
            } else {
                break;
            };

            let table = self.parse_table_ref()?;
            let on = if kind != JoinKind::Cross && self.match_keyword(Keyword::On) {
                Some(self.parse_expr_bp(0)?)
            } else {
                None
            };
            joins.push(Join { kind, table, on });
        }
        Ok(joins)
    }

    fn parse_order_by_item(&mut self) -> Result<OrderBy> {
        let expr = self.parse_expr_bp(0)?;
        let direction = if self.match_keyword(Keyword::Desc) {
            OrderDirection::Desc
        } else {
            self.match_keyword(Keyword::Asc);
            OrderDirection::Asc
        };
        Ok(OrderBy { expr, direction })
    }

    // ---- INSERT / UPDATE / DELETE -----------------------------------

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier()?;

        let columns = if self.match_token(&TokenKind::LeftParen) {
            let mut cols = vec![self.expect_identifier()?];
            while self.match_token(&TokenKind::Comma) {
                cols.push(self.expect_identifier()?);
            }
            self.expect_token(TokenKind::RightParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        let mut rows = vec![self.parse_value_tuple()?];
        while self.match_token(&TokenKind::Comma) {
            rows.push(self.parse_value_tuple()?);
        }

        Ok(InsertStatement {
            table,
            columns,
            rows,
        })
    }

    fn parse_value_tuple(&mut self) -> Result<Vec<crate::ast::Expr>> {
        self.expect_token(TokenKind::LeftParen)?;
        let mut values = vec![self.parse_expr_bp(0)?];
        while self.match_token(&TokenKind::Comma) {
            values.push(self.parse_expr_bp(0)?);
        }
        self.expect_token(TokenKind::RightParen)?;
        Ok(values)
    }

    fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.expect_identifier()?;
        self.expect_keyword(Keyword::Set)?;
        let mut assignments = vec![self.parse_assignment()?];
        while self.match_token(&TokenKind::Comma) {
            assignments.push(self.parse_assignment()?);
        }
        let filter = if self.match_keyword(Keyword::Where) {
            Some(self.parse_expr_bp(0)?)
        } else {
            None
        };
        Ok(UpdateStatement {
            table,
            assignments,
            filter,
        })
    }

    fn parse_assignment(&mut self) -> Result<UpdateAssignment> {
        let column = self.expect_identifier()?;
        if !self.match_token(&TokenKind::Eq) {
            self.expect_token(TokenKind::Assign)?;
        }
        let value = self.parse_expr_bp(0)?;
        Ok(UpdateAssignment { column, value })
    }

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.expect_identifier()?;
        let filter = if self.match_keyword(Keyword::Where) {
            Some(self.parse_expr_bp(0)?)
        } else {
            None
        };
        Ok(DeleteStatement { table, filter })
    }

    // ---- DDL ---------------------------------------------------------

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect_keyword(Keyword::Table)?;
        let name = self.expect_identifier()?;
        self.expect_token(TokenKind::LeftParen)?;
        let mut columns = Vec::new();
        loop {
            if self.is_table_constraint_lead() {
                self.skip_table_constraint();
            } else {
                columns.push(self.parse_column_def()?);
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(TokenKind::RightParen)?;
        Ok(CreateTableStatement { name, columns })
    }

    fn is_table_constraint_lead(&self) -> bool {
        matches!(
            self.current.as_keyword(),
            Some(
                Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Foreign
                    | Keyword::Constraint
                    | Keyword::Index
                    | Keyword::Key
                    | Keyword::Check
            )
        )
    }

    /// Skips a table-level constraint clause up to the next top-level
    /// comma or closing paren, tracking paren depth.
    fn skip_table_constraint(&mut self) {
        let mut depth: i32 = 0;
        loop {
            match &self.current.kind {
                TokenKind::LeftParen => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RightParen if depth > 0 => {
                    depth -= 1;
                    self.advance();
                }
                TokenKind::RightParen | TokenKind::Eof => break,
                TokenKind::Comma if depth == 0 => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let data_type = self.parse_data_type()?;
        // Per-column constraints: consume until the next top-level comma
        // or the closing paren of the column list.
        let mut depth: i32 = 0;
        loop {
            match &self.current.kind {
                TokenKind::LeftParen => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::RightParen if depth > 0 => {
                    depth -= 1;
                    self.advance();
                }
                TokenKind::RightParen | TokenKind::Eof => break,
                TokenKind::Comma if depth == 0 => break,
                _ => {
                    self.advance();
                }
            }
        }
        Ok(ColumnDef { name, data_type })
    }

    fn parse_alter_table(&mut self) -> Result<AlterTableStatement> {
        self.expect_keyword(Keyword::Alter)?;
        self.expect_keyword(Keyword::Table)?;
        let table = self.expect_identifier()?;

        if self.match_keyword(Keyword::Rename) {
            return Err(self.unexpected("ADD or DROP (RENAME is not supported)"));
        }
        if self.match_keyword(Keyword::Add) {
            self.match_keyword(Keyword::Column);
            let column = self.parse_column_def()?;
            return Ok(AlterTableStatement::AddColumn { table, column });
        }
        if self.match_keyword(Keyword::Drop) {
            self.match_keyword(Keyword::Column);
            let column = self.expect_identifier()?;
            return Ok(AlterTableStatement::DropColumn { table, column });
        }
        // Other variants (MODIFY COLUMN, ALTER COLUMN, ...) parse as a
        // no-op: consume the rest of the statement and accept it.
        while !self.check(&TokenKind::Semicolon) && !self.check(&TokenKind::Eof) {
            self.advance();
        }
        Ok(AlterTableStatement::NoOp)
    }

    // ---- Functions -----------------------------------------------------

    fn parse_create_function(&mut self) -> Result<CreateFunctionStatement> {
        self.expect_keyword(Keyword::Function)?;
        let name = self.expect_identifier()?;
        self.expect_token(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let pname = self.expect_identifier()?;
                let data_type = self.parse_data_type()?;
                params.push(FunctionParam {
                    name: pname,
                    data_type,
                });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect_token(TokenKind::RightParen)?;
        self.expect_keyword(Keyword::Returns)?;
        let return_type = self.parse_data_type()?;
        self.match_keyword(Keyword::As);
        self.expect_keyword(Keyword::Begin)?;

        let mut body = None;
        loop {
            if self.check_keyword(Keyword::End) {
                break;
            }
            if self.match_keyword(Keyword::Return) {
                let expr = self.parse_expr_bp(0)?;
                self.match_token(&TokenKind::Semicolon);
                if body.is_none() {
                    body = Some(expr);
                }
                continue;
            }
            // Parse and discard any other body statement so the cursor
            // stays in sync with the tokenizer through to END.
            let _ = self.parse_statement_inner();
            self.match_token(&TokenKind::Semicolon);
            if self.check_keyword(Keyword::End) || self.check(&TokenKind::Eof) {
                break;
            }
        }
        self.expect_keyword(Keyword::End)?;

        let body = body.ok_or_else(|| self.unexpected("RETURN"))?;
        Ok(CreateFunctionStatement {
            name,
            params,
            return_type,
            body,
        })
    }

    // ---- Triggers --------------------------------------------------------

    fn parse_create_trigger(&mut self) -> Result<CreateTriggerStatement> {
        let source_start = self.previous_keyword_span_start();
        self.expect_keyword(Keyword::Trigger)?;
        let name = self.expect_identifier()?;
        let timing = if self.match_keyword(Keyword::Before) {
            TriggerTiming::Before
        } else if self.match_keyword(Keyword::After) {
            TriggerTiming::After
        } else {
            return Err(self.unexpected("BEFORE or AFTER"));
        };
        let event = if self.match_keyword(Keyword::Insert) {
            TriggerEvent::Insert
        } else if self.match_keyword(Keyword::Update) {
            TriggerEvent::Update
        } else if self.match_keyword(Keyword::Delete) {
            TriggerEvent::Delete
        } else {
            return Err(self.unexpected("INSERT, UPDATE, or DELETE"));
        };
        self.expect_keyword(Keyword::On)?;
        let table = self.expect_identifier()?;
        if self.match_keyword(Keyword::For) {
            self.match_keyword(Keyword::Each);
            self.expect_keyword(Keyword::Row)?;
        }
        self.match_keyword(Keyword::As);
        self.expect_keyword(Keyword::Begin)?;
        let body = self.parse_trigger_body()?;
        let end_token = self.expect_keyword(Keyword::End)?;
        let source_text = self
            .source_slice(crate::lexer::Span::new(source_start, end_token.span.end))
            .to_string();

        Ok(CreateTriggerStatement {
            name,
            table,
            timing,
            event,
            body,
            source_text,
        })
    }

    fn previous_keyword_span_start(&self) -> usize {
        // `CREATE` was already consumed by parse_create; its span start
        // is what we want for source_text, kept in `previous`.
        self.previous.span.start
    }

    fn parse_trigger_body(&mut self) -> Result<Vec<TriggerStmt>> {
        let mut stmts = Vec::new();
        while !self.check_keyword(Keyword::End) && !self.check(&TokenKind::Eof) {
            stmts.push(self.parse_trigger_stmt()?);
            self.match_token(&TokenKind::Semicolon);
        }
        Ok(stmts)
    }

    fn parse_trigger_stmt(&mut self) -> Result<TriggerStmt> {
        if self.check_keyword(Keyword::If) {
            return self.parse_trigger_if();
        }
        if self.check_keyword(Keyword::Set) {
            return self.parse_trigger_set();
        }
        // Any other statement is embedded DML; re-dispatch into the
        // ordinary statement parser.
        Ok(TriggerStmt::Dml(Box::new(self.parse_statement_inner()?)))
    }

    fn parse_trigger_set(&mut self) -> Result<TriggerStmt> {
        self.expect_keyword(Keyword::Set)?;
        let qualifier = self.expect_identifier()?;
        let is_new = qualifier.eq_ignore_ascii_case("new");
        self.expect_token(TokenKind::Dot)?;
        let column = self.expect_identifier()?;
        if !self.match_token(&TokenKind::Eq) {
            self.expect_token(TokenKind::Assign)?;
        }
        let expr = self.parse_expr_bp(0)?;
        Ok(TriggerStmt::SetNewOld {
            is_new,
            column,
            expr,
        })
    }

    fn parse_trigger_if(&mut self) -> Result<TriggerStmt> {
        self.expect_keyword(Keyword::If)?;
        let mut branches = Vec::new();
        let cond = self.parse_expr_bp(0)?;
        self.expect_keyword(Keyword::Then)?;
        let body = self.parse_trigger_stmt_list_until_branch_end()?;
        branches.push((cond, body));

        loop {
            if self.match_keyword(Keyword::ElseIf) {
                let cond = self.parse_expr_bp(0)?;
                self.expect_keyword(Keyword::Then)?;
                let body = self.parse_trigger_stmt_list_until_branch_end()?;
                branches.push((cond, body));
                continue;
            }
            break;
        }
        let else_body = if self.match_keyword(Keyword::Else) {
            self.parse_trigger_stmt_list_until_branch_end()?
        } else {
            Vec::new()
        };
        self.expect_keyword(Keyword::End)?;
        self.match_keyword(Keyword::If);
        Ok(TriggerStmt::If {
            branches,
            else_body,
        })
    }

    fn parse_trigger_stmt_list_until_branch_end(&mut self) -> Result<Vec<TriggerStmt>> {
        let mut stmts = Vec::new();
        while !self.check_keyword(Keyword::ElseIf)
            && !self.check_keyword(Keyword::Else)
            && !self.check_keyword(Keyword::End)
            && !self.check(&TokenKind::Eof)
        {
            stmts.push(self.parse_trigger_stmt()?);
            self.match_token(&TokenKind::Semicolon);
        }
        Ok(stmts)
    }

    // ---- shared helpers ------------------------------------------------

    fn expect_integer_literal(&mut self) -> Result<u64> {
        match self.current.kind {
            TokenKind::Integer(i) if i >= 0 => {
                self.advance();
                Ok(i as u64)
            }
            _ => Err(self.unexpected("non-negative integer")),
        }
    }

    /// Looks ahead `n` tokens without consuming, by cloning the lexer.
    /// Used only for the `alias.*` disambiguation, which needs two tokens
    /// of lookahead beyond `current`.
    fn peek_kind(&self, n: usize) -> Option<TokenKind> {
        let mut lexer = self.lexer.clone();
        let mut kind = None;
        for _ in 0..n {
            kind = Some(lexer.next_token().kind);
        }
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    #[test]
    fn parses_insert_with_explicit_columns() {
        let mut p = Parser::new("INSERT INTO t (a, b) VALUES (1, 'x')");
        match p.parse_statement().unwrap() {
            Statement::Insert(ins) => {
                assert_eq!(ins.columns.unwrap(), vec!["a", "b"]);
                assert_eq!(ins.rows.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_create_table_with_constraints_discarded() {
        let mut p = Parser::new(
            "CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(50) NOT NULL, PRIMARY KEY (id))",
        );
        match p.parse_statement().unwrap() {
            Statement::CreateTable(stmt) => assert_eq!(stmt.columns.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn alter_table_rename_is_rejected() {
        let mut p = Parser::new("ALTER TABLE t RENAME TO t2");
        assert!(p.parse_statement().is_err());
    }

    #[test]
    fn parses_select_with_group_by_and_having() {
        let mut p = Parser::new(
            "SELECT Category, COUNT(*) FROM Products GROUP BY Category HAVING COUNT(*) > 1 ORDER BY Category ASC",
        );
        match p.parse_statement().unwrap() {
            Statement::Select(sel) => {
                assert_eq!(sel.group_by.len(), 1);
                assert!(sel.having.is_some());
                assert_eq!(sel.order_by.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_trigger_with_if_body() {
        let sql = "CREATE TRIGGER clamp_price BEFORE INSERT ON Products \
                   FOR EACH ROW BEGIN IF NEW.Price < 1.0 THEN SET NEW.Price = 1.0 END IF; END";
        let mut p = Parser::new(sql);
        match p.parse_statement().unwrap() {
            Statement::CreateTrigger(t) => {
                assert_eq!(t.body.len(), 1);
                assert!(t.source_text.starts_with("CREATE TRIGGER"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn top_sets_limit_when_limit_absent() {
        let mut p = Parser::new("SELECT TOP 5 * FROM t");
        match p.parse_statement().unwrap() {
            Statement::Select(sel) => assert_eq!(sel.limit, Some(5)),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
