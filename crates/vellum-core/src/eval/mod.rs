//! Expression evaluator: walks an [`crate::ast::Expr`] tree against an
//! [`EvalContext`], implementing three-valued-logic-lite boolean
//! coercion, `LIKE`/`IN`/`BETWEEN`/`IS NULL`, `CASE`, `CAST`, and
//! function dispatch.

mod context;

pub use context::{CancelCheck, EvalContext, Row};

use std::cmp::Ordering;

use crate::ast::{BinaryOp, Expr, Literal, UnaryOp};
use crate::error::{Error, Result};
use crate::value::{NumericOp, Value};

/// Evaluates an expression against `ctx`.
pub fn eval_expr(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(lit) => Ok(lit.clone().into_value()),
        Expr::Column { qualifier, name } => Ok(ctx
            .row
            .get_qualified(qualifier.as_deref(), name)
            .cloned()
            .unwrap_or(Value::Null)),
        Expr::Unary { op, expr } => eval_unary(*op, expr, ctx),
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, ctx),
        Expr::IsNull { expr, negated } => {
            let is_null = eval_expr(expr, ctx)?.is_null();
            Ok(Value::Bool(is_null != *negated))
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let v = eval_expr(expr, ctx)?;
            let lo = eval_expr(low, ctx)?;
            let hi = eval_expr(high, ctx)?;
            let in_range = Value::compare_total(&v, &lo) != Ordering::Less
                && Value::compare_total(&v, &hi) != Ordering::Greater;
            Ok(Value::Bool(in_range != *negated))
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let v = eval_expr(expr, ctx)?;
            let mut found = false;
            for item in list {
                if Value::values_equal(&v, &eval_expr(item, ctx)?) {
                    found = true;
                    break;
                }
            }
            Ok(Value::Bool(found != *negated))
        }
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let v = eval_expr(expr, ctx)?.to_display_string();
            let pattern = eval_expr(pattern, ctx)?.to_display_string();
            let matched = like_matches(&v, &pattern);
            Ok(Value::Bool(matched != *negated))
        }
        Expr::Case {
            operand,
            branches,
            else_branch,
        } => eval_case(operand.as_deref(), branches, else_branch.as_deref(), ctx),
        Expr::Cast { expr, target } => eval_expr(expr, ctx)?.coerce(*target),
        Expr::Call { .. } => eval_call(expr, ctx),
    }
}

fn eval_unary(op: UnaryOp, expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    let v = eval_expr(expr, ctx)?;
    Ok(match op {
        UnaryOp::Neg => {
            if v.is_null() {
                Value::Null
            } else if let Some(i) = v.as_i64() {
                if matches!(v, Value::Float(_)) {
                    Value::Float(-v.as_f64().unwrap_or(0.0))
                } else {
                    Value::Int(-i)
                }
            } else {
                Value::Null
            }
        }
        UnaryOp::Not => Value::Bool(!v.is_truthy()),
    })
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    if op == BinaryOp::And {
        let l = eval_expr(lhs, ctx)?;
        if !l.is_truthy() {
            return Ok(Value::Bool(false));
        }
        return Ok(Value::Bool(eval_expr(rhs, ctx)?.is_truthy()));
    }
    if op == BinaryOp::Or {
        let l = eval_expr(lhs, ctx)?;
        if l.is_truthy() {
            return Ok(Value::Bool(true));
        }
        return Ok(Value::Bool(eval_expr(rhs, ctx)?.is_truthy()));
    }

    let l = eval_expr(lhs, ctx)?;
    let r = eval_expr(rhs, ctx)?;
    Ok(match op {
        BinaryOp::Add => Value::add_or_concat(&l, &r),
        BinaryOp::Sub => Value::numeric_binary(&l, &r, NumericOp::Sub).unwrap_or(Value::Null),
        BinaryOp::Mul => Value::numeric_binary(&l, &r, NumericOp::Mul).unwrap_or(Value::Null),
        BinaryOp::Div => {
            return Value::numeric_binary(&l, &r, NumericOp::Div).ok_or(Error::DivideByZero)
        }
        BinaryOp::Mod => {
            return Value::numeric_binary(&l, &r, NumericOp::Mod).ok_or(Error::DivideByZero)
        }
        BinaryOp::Eq => Value::Bool(Value::values_equal(&l, &r)),
        BinaryOp::NotEq => Value::Bool(!Value::values_equal(&l, &r)),
        BinaryOp::Lt => Value::Bool(Value::compare_total(&l, &r) == Ordering::Less),
        BinaryOp::LtEq => Value::Bool(Value::compare_total(&l, &r) != Ordering::Greater),
        BinaryOp::Gt => Value::Bool(Value::compare_total(&l, &r) == Ordering::Greater),
        BinaryOp::GtEq => Value::Bool(Value::compare_total(&l, &r) != Ordering::Less),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above with short-circuiting"),
    })
}

fn eval_case(
    operand: Option<&Expr>,
    branches: &[(Expr, Expr)],
    else_branch: Option<&Expr>,
    ctx: &EvalContext<'_>,
) -> Result<Value> {
    let operand_value = match operand {
        Some(e) => Some(eval_expr(e, ctx)?),
        None => None,
    };
    for (cond, result) in branches {
        let matched = match &operand_value {
            Some(op_val) => Value::values_equal(op_val, &eval_expr(cond, ctx)?),
            None => eval_expr(cond, ctx)?.is_truthy(),
        };
        if matched {
            return eval_expr(result, ctx);
        }
    }
    match else_branch {
        Some(e) => eval_expr(e, ctx),
        None => Ok(Value::Null),
    }
}

fn eval_call(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Value> {
    let Expr::Call {
        name, distinct, args, ..
    } = expr
    else {
        unreachable!()
    };

    if let Some(key) = expr.aggregate_key() {
        if let Some(aggregates) = ctx.aggregates {
            if let Some(v) = aggregates.get(&key) {
                return Ok(v.clone());
            }
        }
        // Grouped rows also carry their precomputed aggregates directly
        // under the canonical key, so HAVING/ORDER BY/SELECT can resolve
        // them without a separate aggregates map.
        if let Some(v) = ctx.row.get(&key) {
            return Ok(v.clone());
        }
    }

    let evaluated: Vec<Value> = args
        .iter()
        .map(|a| eval_expr(a, ctx))
        .collect::<Result<_>>()?;

    if let Some(user_fn) = ctx.functions.get(&name.to_ascii_lowercase()) {
        return user_fn.invoke(&evaluated);
    }
    if let Some(add_in) = ctx.add_ins.get(&name.to_ascii_lowercase()) {
        return Ok(add_in(&evaluated));
    }
    if crate::ast::is_aggregate_name(name) {
        // No precomputed value available: row-level (ungrouped) context.
        // Per-row contributions are a placeholder; the executor supplies
        // the real precomputed value for grouped evaluation.
        let _ = distinct;
        return Ok(Value::Null);
    }
    Ok(crate::functions::dispatch(name, &evaluated).unwrap_or(Value::Null))
}

/// Compiles a SQL `LIKE` pattern to an anchored, case-insensitive match:
/// `%` -> `.*`, `_` -> `.`, everything else escaped.
#[must_use]
pub fn like_pattern_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}

fn like_matches(text: &str, pattern: &str) -> bool {
    let regex_src = like_pattern_to_regex(pattern);
    regex::RegexBuilder::new(&regex_src)
        .case_insensitive(true)
        .build()
        .is_ok_and(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn empty_ctx() -> (HashMap<String, crate::database::UserFunction>, HashMap<String, crate::database::AddIn>) {
        (HashMap::new(), HashMap::new())
    }

    #[test]
    fn like_pattern_translates_wildcards() {
        assert!(like_matches("Drill", "Dr__l"));
        assert!(!like_matches("Drilll", "Dr__l"));
        assert!(like_matches("anything", "%"));
    }

    #[test]
    fn and_short_circuits_without_evaluating_rhs() {
        let row = Row::new();
        let (funcs, add_ins) = empty_ctx();
        let ctx = EvalContext::new(&row, &funcs, &add_ins);
        let expr = Expr::Binary {
            op: BinaryOp::And,
            lhs: Box::new(Expr::Literal(Literal::Bool(false))),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Div,
                lhs: Box::new(Expr::Literal(Literal::Int(1))),
                rhs: Box::new(Expr::Literal(Literal::Int(0))),
            }),
        };
        assert!(matches!(eval_expr(&expr, &ctx), Ok(Value::Bool(false))));
    }

    #[test]
    fn division_by_zero_raises_error() {
        let row = Row::new();
        let (funcs, add_ins) = empty_ctx();
        let ctx = EvalContext::new(&row, &funcs, &add_ins);
        let expr = Expr::Binary {
            op: BinaryOp::Div,
            lhs: Box::new(Expr::Literal(Literal::Int(1))),
            rhs: Box::new(Expr::Literal(Literal::Int(0))),
        };
        assert!(matches!(eval_expr(&expr, &ctx), Err(Error::DivideByZero)));
    }

    #[test]
    fn unknown_function_evaluates_to_null() {
        let row = Row::new();
        let (funcs, add_ins) = empty_ctx();
        let ctx = EvalContext::new(&row, &funcs, &add_ins);
        let expr = Expr::Call {
            name: "NOPE".into(),
            distinct: false,
            args: vec![],
            args_text: String::new(),
        };
        assert!(matches!(eval_expr(&expr, &ctx), Ok(Value::Null)));
    }
}
