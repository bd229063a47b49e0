//! Statement execution: dispatches parsed statements to the DDL, DML,
//! and `SELECT` sub-executors.

mod ddl;
mod dml;
mod select;

pub use select::{execute_select, execute_select_cancellable};

use crate::ast::Statement;
use crate::database::Database;
use crate::error::Result;
use crate::eval::Row;

/// Executes any non-`SELECT` statement, returning the number of rows
/// affected (DDL statements report `0`).
///
/// `trigger_row` supplies `NEW`/`OLD` bindings for statements embedded
/// in a trigger body; top-level callers pass `None`.
pub fn execute_non_query(
    db: &mut Database,
    stmt: Statement,
    trigger_row: Option<&Row>,
) -> Result<u64> {
    match stmt {
        Statement::Insert(insert) => dml::insert(db, insert, trigger_row),
        Statement::Update(update) => dml::update(db, update, trigger_row),
        Statement::Delete(delete) => dml::delete(db, delete, trigger_row),
        Statement::CreateTable(stmt) => ddl::create_table(db, stmt),
        Statement::AlterTable(stmt) => ddl::alter_table(db, stmt),
        Statement::DropTable { name, if_exists } => ddl::drop_table(db, &name, if_exists),
        Statement::CreateFunction(stmt) => ddl::create_function(db, stmt),
        Statement::DropFunction { name } => ddl::drop_function(db, &name),
        Statement::CreateTrigger(stmt) => ddl::create_trigger(db, stmt),
        Statement::DropTrigger { name, if_exists } => ddl::drop_trigger(db, &name, if_exists),
        Statement::Select(select) => {
            let (_, rows) = select::execute_select(db, &select, trigger_row)?;
            Ok(rows.len() as u64)
        }
    }
}
