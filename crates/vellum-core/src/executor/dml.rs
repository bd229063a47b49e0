//! DML execution: `INSERT`, `UPDATE`, `DELETE`, each firing `BEFORE`/
//! `AFTER` triggers around the mutation.

use crate::ast::{DeleteStatement, InsertStatement, TriggerEvent, TriggerTiming, UpdateStatement};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::eval::{self, EvalContext, Row};
use crate::table::Table;
use crate::trigger;
use crate::value::Value;

fn row_from_table_values(table: &Table, values: &[Value]) -> Row {
    let mut row = Row::new();
    for (col, value) in table.columns().iter().zip(values.iter()) {
        row.insert(col.name.clone(), value.clone());
    }
    row
}

pub fn insert(db: &mut Database, stmt: InsertStatement, trigger_row: Option<&Row>) -> Result<u64> {
    let table_key = stmt.table.to_ascii_lowercase();
    let column_count = db
        .tables
        .get(&table_key)
        .ok_or_else(|| Error::not_found("table", stmt.table.clone()))?
        .columns()
        .len();
    let column_names: Vec<String> = db.tables[&table_key]
        .columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();

    let mut inserted = 0u64;
    for row_exprs in stmt.rows {
        let base_row = trigger_row.cloned().unwrap_or_default();
        let eval_ctx = EvalContext::new(&base_row, &db.functions, &db.add_ins);
        let evaluated: Vec<Value> = row_exprs
            .iter()
            .map(|e| eval::eval_expr(e, &eval_ctx))
            .collect::<Result<_>>()?;

        let mut new_values = vec![Value::Null; column_count];
        match &stmt.columns {
            Some(names) => {
                if names.len() != evaluated.len() {
                    return Err(Error::ParseError {
                        span: crate::lexer::Span::default(),
                        expected: format!("{} values", names.len()),
                        found: format!("{} values", evaluated.len()),
                    });
                }
                for (name, value) in names.iter().zip(evaluated) {
                    let idx = column_names
                        .iter()
                        .position(|c| c.eq_ignore_ascii_case(name))
                        .ok_or_else(|| Error::not_found("column", name.clone()))?;
                    new_values[idx] = value;
                }
            }
            None => {
                if evaluated.len() != column_count {
                    return Err(Error::ParseError {
                        span: crate::lexer::Span::default(),
                        expected: format!("{column_count} values"),
                        found: format!("{} values", evaluated.len()),
                    });
                }
                new_values = evaluated;
            }
        }

        if let Some(max) = db.options().max_rows_per_table {
            if db.tables[&table_key].row_count() >= max {
                continue;
            }
        }

        let table = &db.tables[&table_key];
        let mut ctx = trigger::seed_row_context(table.columns(), Some(&new_values), None);
        trigger::fire(db, &stmt.table, TriggerTiming::Before, TriggerEvent::Insert, &mut ctx)?;

        let table = &db.tables[&table_key];
        let final_values: Vec<Value> = table
            .columns()
            .iter()
            .map(|c| ctx.get(&c.name).cloned().unwrap_or(Value::Null))
            .collect();

        let table = db.tables.get_mut(&table_key).expect("table exists");
        table.insert_row(final_values)?;
        inserted += 1;

        let table = &db.tables[&table_key];
        let inserted_row = table.get_row(table.row_count() - 1).unwrap();
        let mut after_ctx = trigger::seed_row_context(table.columns(), Some(&inserted_row), None);
        trigger::fire(db, &stmt.table, TriggerTiming::After, TriggerEvent::Insert, &mut after_ctx)?;
    }

    Ok(inserted)
}

pub fn update(db: &mut Database, stmt: UpdateStatement, trigger_row: Option<&Row>) -> Result<u64> {
    let table_key = stmt.table.to_ascii_lowercase();
    if !db.tables.contains_key(&table_key) {
        return Err(Error::not_found("table", stmt.table.clone()));
    }

    let row_count = db.tables[&table_key].row_count();
    let mut affected = 0u64;

    for idx in 0..row_count {
        let table = &db.tables[&table_key];
        let old_values = table.get_row(idx).unwrap();
        let mut base_row = row_from_table_values(table, &old_values);
        if let Some(t) = trigger_row {
            base_row.merge_from(t);
        }

        if let Some(filter) = &stmt.filter {
            let ctx = EvalContext::new(&base_row, &db.functions, &db.add_ins);
            if !eval::eval_expr(filter, &ctx)?.is_truthy() {
                continue;
            }
        }

        let mut new_values = old_values.clone();
        {
            let ctx = EvalContext::new(&base_row, &db.functions, &db.add_ins);
            for assignment in &stmt.assignments {
                let idx_col = table
                    .column_index(&assignment.column)
                    .ok_or_else(|| Error::not_found("column", assignment.column.clone()))?;
                new_values[idx_col] = eval::eval_expr(&assignment.value, &ctx)?;
            }
        }

        let mut ctx = trigger::seed_row_context(table.columns(), Some(&new_values), Some(&old_values));
        trigger::fire(db, &stmt.table, TriggerTiming::Before, TriggerEvent::Update, &mut ctx)?;

        let table = &db.tables[&table_key];
        let final_values: Vec<Value> = table
            .columns()
            .iter()
            .map(|c| ctx.get(&c.name).cloned().unwrap_or(Value::Null))
            .collect();

        let table = db.tables.get_mut(&table_key).expect("table exists");
        table.set_row(idx, final_values)?;
        affected += 1;

        let table = &db.tables[&table_key];
        let written = table.get_row(idx).unwrap();
        let mut after_ctx = trigger::seed_row_context(table.columns(), Some(&written), Some(&old_values));
        trigger::fire(db, &stmt.table, TriggerTiming::After, TriggerEvent::Update, &mut after_ctx)?;
    }

    Ok(affected)
}

pub fn delete(db: &mut Database, stmt: DeleteStatement, trigger_row: Option<&Row>) -> Result<u64> {
    let table_key = stmt.table.to_ascii_lowercase();
    if !db.tables.contains_key(&table_key) {
        return Err(Error::not_found("table", stmt.table.clone()));
    }

    let mut affected = 0u64;
    let mut idx = db.tables[&table_key].row_count();
    while idx > 0 {
        idx -= 1;
        let table = &db.tables[&table_key];
        let old_values = table.get_row(idx).unwrap();
        let mut base_row = row_from_table_values(table, &old_values);
        if let Some(t) = trigger_row {
            base_row.merge_from(t);
        }

        if let Some(filter) = &stmt.filter {
            let ctx = EvalContext::new(&base_row, &db.functions, &db.add_ins);
            if !eval::eval_expr(filter, &ctx)?.is_truthy() {
                continue;
            }
        }

        let table = &db.tables[&table_key];
        let mut ctx = trigger::seed_row_context(table.columns(), None, Some(&old_values));
        trigger::fire(db, &stmt.table, TriggerTiming::Before, TriggerEvent::Delete, &mut ctx)?;

        let table = db.tables.get_mut(&table_key).expect("table exists");
        table.remove_row(idx);
        affected += 1;

        let table = &db.tables[&table_key];
        let mut after_ctx = trigger::seed_row_context(table.columns(), None, Some(&old_values));
        trigger::fire(db, &stmt.table, TriggerTiming::After, TriggerEvent::Delete, &mut after_ctx)?;
    }

    Ok(affected)
}
