//! # vellum-core
//!
//! An embeddable, in-memory SQL engine: tokenizer, recursive-descent
//! parser with Pratt expression parsing, expression evaluator, `SELECT`
//! pipeline, DML with trigger support, and JSON snapshot persistence.
//!
//! ## Quick start
//!
//! ```rust
//! use vellum_core::Database;
//!
//! let mut db = Database::new();
//! db.execute_non_query("CREATE TABLE users (id INT, name TEXT)").unwrap();
//! db.execute_non_query("INSERT INTO users (id, name) VALUES (1, 'Ada')").unwrap();
//! let (columns, rows) = db.execute_reader("SELECT name FROM users WHERE id = 1").unwrap();
//! assert_eq!(columns, vec!["name".to_string()]);
//! assert_eq!(rows.len(), 1);
//! ```
//!
//! Every table, function, trigger, and add-in name is resolved
//! case-insensitively. There is no network surface, no disk-backed
//! storage, and no query planner beyond the fixed `SELECT` pipeline
//! order described on [`executor::execute_select`].

pub mod ast;
pub mod database;
pub mod error;
pub mod eval;
pub mod executor;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod snapshot;
pub mod table;
pub mod trigger;
pub mod value;

pub use ast::{Expr, Statement};
pub use database::{AddIn, Database, DatabaseOptions, UserFunction};
pub use error::{Error, Result};
pub use eval::{CancelCheck, EvalContext, Row};
pub use executor::execute_select_cancellable;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use table::{Column, Table};
pub use trigger::Trigger;
pub use value::{DataType, Value};
