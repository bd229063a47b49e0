//! DDL execution: `CREATE TABLE`, `ALTER TABLE`, `DROP TABLE`,
//! `CREATE FUNCTION`, `DROP FUNCTION`, `CREATE TRIGGER`, `DROP TRIGGER`.

use crate::ast::{AlterTableStatement, CreateFunctionStatement, CreateTableStatement, CreateTriggerStatement};
use crate::database::{Database, UserFunction};
use crate::error::{Error, Result};
use crate::table::{Column, Table};

pub fn create_table(db: &mut Database, stmt: CreateTableStatement) -> Result<u64> {
    let columns = stmt
        .columns
        .into_iter()
        .map(|c| Column::new(c.name, c.data_type))
        .collect();
    db.add_table(Table::new(stmt.name, columns))?;
    Ok(0)
}

pub fn alter_table(db: &mut Database, stmt: AlterTableStatement) -> Result<u64> {
    match stmt {
        AlterTableStatement::AddColumn { table, column } => {
            let t = db
                .tables
                .get_mut(&table.to_ascii_lowercase())
                .ok_or_else(|| Error::not_found("table", table))?;
            t.add_column(Column::new(column.name, column.data_type))?;
        }
        AlterTableStatement::DropColumn { table, column } => {
            let t = db
                .tables
                .get_mut(&table.to_ascii_lowercase())
                .ok_or_else(|| Error::not_found("table", table))?;
            t.drop_column(&column)?;
        }
        AlterTableStatement::NoOp => {}
    }
    Ok(0)
}

pub fn drop_table(db: &mut Database, name: &str, if_exists: bool) -> Result<u64> {
    let key = name.to_ascii_lowercase();
    if db.tables.remove(&key).is_none() && !if_exists {
        return Err(Error::not_found("table", name.to_string()));
    }
    Ok(0)
}

pub fn create_function(db: &mut Database, stmt: CreateFunctionStatement) -> Result<u64> {
    let key = stmt.name.to_ascii_lowercase();
    if db.functions.contains_key(&key) {
        return Err(Error::duplicate("function", stmt.name));
    }
    db.functions.insert(key, UserFunction::from(stmt));
    Ok(0)
}

pub fn drop_function(db: &mut Database, name: &str) -> Result<u64> {
    if db.functions.remove(&name.to_ascii_lowercase()).is_none() {
        return Err(Error::not_found("function", name.to_string()));
    }
    Ok(0)
}

pub fn create_trigger(db: &mut Database, stmt: CreateTriggerStatement) -> Result<u64> {
    db.register_trigger_from_statement(stmt)?;
    Ok(0)
}

pub fn drop_trigger(db: &mut Database, name: &str, if_exists: bool) -> Result<u64> {
    let key = name.to_ascii_lowercase();
    if !db.remove_trigger(&key) && !if_exists {
        return Err(Error::not_found("trigger", name.to_string()));
    }
    Ok(0)
}
