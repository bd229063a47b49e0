//! Trigger runtime: interprets a parsed trigger body against a mutable
//! `NEW`/`OLD` row context for each affected row.

use crate::ast::{CreateTriggerStatement, TriggerEvent, TriggerStmt, TriggerTiming};
use crate::database::Database;
use crate::error::Result;
use crate::eval::{self, EvalContext, Row};
use crate::executor;

#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    pub body: Vec<TriggerStmt>,
    pub source_text: String,
}

impl From<CreateTriggerStatement> for Trigger {
    fn from(stmt: CreateTriggerStatement) -> Self {
        Self {
            name: stmt.name,
            table: stmt.table,
            timing: stmt.timing,
            event: stmt.event,
            body: stmt.body,
            source_text: stmt.source_text,
        }
    }
}

/// Fires every trigger matching `table`/`timing`/`event`, in
/// registration order, against `ctx` (which already carries `NEW.col`,
/// `OLD.col`, and bare-`col` bindings for the affected row).
///
/// Errors raised by trigger-initiated embedded DML are swallowed so the
/// outer statement is unaffected; they are optionally logged.
pub fn fire(
    db: &mut Database,
    table: &str,
    timing: TriggerTiming,
    event: TriggerEvent,
    ctx: &mut Row,
) -> Result<()> {
    let matching: Vec<Trigger> = db
        .trigger_order
        .iter()
        .filter_map(|key| db.triggers.get(key))
        .filter(|t| t.table.eq_ignore_ascii_case(table) && t.timing == timing && t.event == event)
        .cloned()
        .collect();

    for trigger in matching {
        run_body(db, &trigger, &trigger.body, ctx);
    }
    Ok(())
}

fn run_body(db: &mut Database, trigger: &Trigger, body: &[TriggerStmt], ctx: &mut Row) {
    for stmt in body {
        match stmt {
            TriggerStmt::SetNewOld {
                is_new,
                column,
                expr,
            } => {
                let value = {
                    let eval_ctx = EvalContext::new(ctx, &db.functions, &db.add_ins);
                    match eval::eval_expr(expr, &eval_ctx) {
                        Ok(v) => v,
                        Err(err) => {
                            db.log_trigger_error(&trigger.name, &err);
                            continue;
                        }
                    }
                };
                let key = if *is_new {
                    format!("new.{column}")
                } else {
                    format!("old.{column}")
                };
                ctx.insert(key, value.clone());
                if *is_new {
                    ctx.insert(column.clone(), value);
                }
            }
            TriggerStmt::If {
                branches,
                else_body,
            } => {
                let mut ran = false;
                for (cond, branch_body) in branches {
                    let truthy = {
                        let eval_ctx = EvalContext::new(ctx, &db.functions, &db.add_ins);
                        match eval::eval_expr(cond, &eval_ctx) {
                            Ok(v) => v.is_truthy(),
                            Err(err) => {
                                db.log_trigger_error(&trigger.name, &err);
                                false
                            }
                        }
                    };
                    if truthy {
                        run_body(db, trigger, branch_body, ctx);
                        ran = true;
                        break;
                    }
                }
                if !ran {
                    run_body(db, trigger, else_body, ctx);
                }
            }
            TriggerStmt::Dml(inner) => {
                let result = executor::execute_non_query(db, (**inner).clone(), Some(ctx));
                if let Err(err) = result {
                    db.log_trigger_error(&trigger.name, &err);
                }
            }
        }
    }
}

/// Builds the preseeded trigger context for a row: `NEW.col`/`OLD.col`
/// for every declared table column, plus bare-`col` aliases for `NEW`.
#[must_use]
pub fn seed_row_context(
    columns: &[crate::table::Column],
    new_values: Option<&[crate::value::Value]>,
    old_values: Option<&[crate::value::Value]>,
) -> Row {
    let mut row = Row::new();
    for (idx, col) in columns.iter().enumerate() {
        if let Some(values) = new_values {
            row.insert(format!("new.{}", col.name), values[idx].clone());
            row.insert(col.name.clone(), values[idx].clone());
        }
        if let Some(values) = old_values {
            row.insert(format!("old.{}", col.name), values[idx].clone());
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Expr, Literal};
    use crate::table::Column;
    use crate::value::{DataType, Value};

    #[test]
    fn seed_context_carries_new_and_old_and_bare_alias() {
        let cols = vec![Column::new("price".into(), DataType::Float)];
        let row = seed_row_context(&cols, Some(&[Value::Float(5.0)]), Some(&[Value::Float(1.0)]));
        assert!(matches!(row.get("new.price"), Some(Value::Float(f)) if *f == 5.0));
        assert!(matches!(row.get("old.price"), Some(Value::Float(f)) if *f == 1.0));
        assert!(matches!(row.get("price"), Some(Value::Float(f)) if *f == 5.0));
    }

    #[test]
    fn set_new_updates_bare_alias() {
        let mut db = Database::new();
        let trigger = Trigger {
            name: "t".into(),
            table: "x".into(),
            timing: TriggerTiming::Before,
            event: TriggerEvent::Insert,
            body: vec![],
            source_text: String::new(),
        };
        let mut ctx = seed_row_context(
            &[Column::new("price".into(), DataType::Float)],
            Some(&[Value::Float(0.5)]),
            None,
        );
        let body = vec![TriggerStmt::SetNewOld {
            is_new: true,
            column: "price".into(),
            expr: Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Literal(Literal::Float(1.0))),
                rhs: Box::new(Expr::Literal(Literal::Float(0.0))),
            },
        }];
        run_body(&mut db, &trigger, &body, &mut ctx);
        assert!(matches!(ctx.get("price"), Some(Value::Float(f)) if *f == 1.0));
        assert!(matches!(ctx.get("new.price"), Some(Value::Float(f)) if *f == 1.0));
    }
}
