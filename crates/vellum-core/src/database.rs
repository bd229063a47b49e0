//! The public entry surface: table/function/trigger/add-in registries
//! and the three query entry points.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::ast::{CreateFunctionStatement, CreateTriggerStatement, Statement};
use crate::error::{Error, Result};
use crate::eval::{self, CancelCheck, EvalContext, Row};
use crate::executor;
use crate::parser::Parser;
use crate::table::Table;
use crate::trigger::Trigger;
use crate::value::Value;

/// A host-registered callable exposed as a SQL function name. Add-ins
/// resolve before built-ins and before user functions are not shadowed
/// by them (user functions resolve first; see [`eval::eval_call`]).
pub type AddIn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A `CREATE FUNCTION`-defined SQL function. Only the first `RETURN`
/// expression in the body is ever evaluated.
#[derive(Debug, Clone)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<crate::ast::FunctionParam>,
    pub return_type: crate::value::DataType,
    pub body: crate::ast::Expr,
}

impl UserFunction {
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        let mut row = Row::new();
        for (param, value) in self.params.iter().zip(args.iter()) {
            row.insert(param.name.clone(), value.clone());
        }
        let empty_functions = HashMap::new();
        let empty_add_ins = HashMap::new();
        let ctx = EvalContext::new(&row, &empty_functions, &empty_add_ins);
        eval::eval_expr(&self.body, &ctx)?.coerce(self.return_type)
    }
}

impl From<CreateFunctionStatement> for UserFunction {
    fn from(stmt: CreateFunctionStatement) -> Self {
        Self {
            name: stmt.name,
            params: stmt.params,
            return_type: stmt.return_type,
            body: stmt.body,
        }
    }
}

/// Ambient configuration knobs. Neither field changes observable SQL
/// semantics; both are pure operational guards.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Caps the row count of any single table; `None` means unbounded.
    pub max_rows_per_table: Option<usize>,
    /// Whether trigger-swallowed DML errors are logged via `tracing::warn!`.
    pub log_trigger_errors: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_rows_per_table: None,
            log_trigger_errors: true,
        }
    }
}

/// An in-memory SQL database: the table, function, trigger, and add-in
/// registries plus the three query entry points.
pub struct Database {
    pub(crate) tables: HashMap<String, Table>,
    pub(crate) functions: HashMap<String, UserFunction>,
    pub(crate) triggers: HashMap<String, Trigger>,
    /// Registration order of `triggers`' keys, oldest first. `fire()`
    /// walks this to deliver a stable firing order for triggers that
    /// share a table/timing/event; a `HashMap`'s own iteration order
    /// isn't insertion order.
    pub(crate) trigger_order: Vec<String>,
    pub(crate) add_ins: HashMap<String, AddIn>,
    pub(crate) options: DatabaseOptions,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DatabaseOptions::default())
    }

    #[must_use]
    pub fn with_options(options: DatabaseOptions) -> Self {
        Self {
            tables: HashMap::new(),
            functions: HashMap::new(),
            triggers: HashMap::new(),
            trigger_order: Vec::new(),
            add_ins: HashMap::new(),
            options,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn add_table(&mut self, table: Table) -> Result<()> {
        let key = table.name.to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::duplicate("table", table.name));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&name.to_ascii_lowercase())
    }

    pub fn register_add_in(&mut self, name: impl Into<String>, callback: AddIn) {
        self.add_ins.insert(name.into().to_ascii_lowercase(), callback);
    }

    pub fn unregister_add_in(&mut self, name: &str) -> bool {
        self.add_ins.remove(&name.to_ascii_lowercase()).is_some()
    }

    #[must_use]
    pub fn registered_add_ins(&self) -> Vec<&str> {
        self.add_ins.keys().map(String::as_str).collect()
    }

    /// Executes a DML or DDL statement, returning the number of rows
    /// affected (0 for DDL).
    #[tracing::instrument(skip(self, sql))]
    pub fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        let stmt = Parser::new(sql).parse_statement()?;
        executor::execute_non_query(self, stmt, None)
    }

    /// Executes a `SELECT`, returning column headers and row values.
    #[tracing::instrument(skip(self, sql))]
    pub fn execute_reader(&self, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let stmt = Parser::new(sql).parse_statement()?;
        match stmt {
            Statement::Select(select) => executor::execute_select(self, &select, None),
            _ => Err(Error::ParseError {
                span: crate::lexer::Span::default(),
                expected: "SELECT".into(),
                found: "other statement".into(),
            }),
        }
    }

    /// Executes a `SELECT` like [`Self::execute_reader`], additionally
    /// checking `cancel` between rows of the projection step. Used by
    /// the async façade; the synchronous core never calls this with a
    /// check that can return `true` on its own.
    pub fn execute_reader_cancellable(
        &self,
        sql: &str,
        cancel: Option<&CancelCheck<'_>>,
    ) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let stmt = Parser::new(sql).parse_statement()?;
        match stmt {
            Statement::Select(select) => {
                executor::execute_select_cancellable(self, &select, None, cancel)
            }
            _ => Err(Error::ParseError {
                span: crate::lexer::Span::default(),
                expected: "SELECT".into(),
                found: "other statement".into(),
            }),
        }
    }

    /// Executes `sql`. For `SELECT`, returns the first column of the
    /// first row (or `Null` if empty); for DML, returns the affected
    /// count as a numeric value.
    pub fn execute_scalar(&mut self, sql: &str) -> Result<Value> {
        let stmt = Parser::new(sql).parse_statement()?;
        match stmt {
            Statement::Select(select) => {
                let (_, rows) = executor::execute_select(self, &select, None)?;
                Ok(rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_iter().next())
                    .unwrap_or(Value::Null))
            }
            other => {
                let affected = executor::execute_non_query(self, other, None)?;
                Ok(Value::Int(affected as i64))
            }
        }
    }

    pub(crate) fn register_trigger_from_statement(&mut self, stmt: CreateTriggerStatement) -> Result<()> {
        let key = stmt.name.to_ascii_lowercase();
        if self.triggers.contains_key(&key) {
            return Err(Error::duplicate("trigger", stmt.name));
        }
        self.insert_trigger(key, Trigger::from(stmt));
        Ok(())
    }

    /// Inserts `trigger` under `key`, recording it at the end of the
    /// registration order unless `key` is already registered (a snapshot
    /// overwrite keeps its original registration position).
    pub(crate) fn insert_trigger(&mut self, key: String, trigger: Trigger) {
        if !self.triggers.contains_key(&key) {
            self.trigger_order.push(key.clone());
        }
        self.triggers.insert(key, trigger);
    }

    /// Removes a trigger by key, returning whether one was present.
    pub(crate) fn remove_trigger(&mut self, key: &str) -> bool {
        self.trigger_order.retain(|k| k != key);
        self.triggers.remove(key).is_some()
    }

    pub(crate) fn log_trigger_error(&self, trigger_name: &str, err: &Error) {
        if self.options.log_trigger_errors {
            warn!(trigger = trigger_name, error = %err, "trigger-initiated DML failed; swallowed");
        }
    }
}
