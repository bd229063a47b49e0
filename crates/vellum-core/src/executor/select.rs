//! The SELECT pipeline: FROM/JOIN -> WHERE -> GROUP BY/aggregation ->
//! HAVING -> ORDER BY -> OFFSET/LIMIT/TOP -> DISTINCT -> projection.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ast::{Expr, Join, JoinKind, OrderDirection, SelectItem, SelectStatement, TableRef};
use crate::database::Database;
use crate::error::{Error, Result};
use crate::eval::{self, CancelCheck, EvalContext, Row};
use crate::table::Table;
use crate::value::Value;

pub fn execute_select(
    db: &Database,
    select: &SelectStatement,
    trigger_row: Option<&Row>,
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    execute_select_cancellable(db, select, trigger_row, None)
}

/// Runs the full pipeline like [`execute_select`], additionally checking
/// `cancel` between each row of the final projection step (and, since
/// grouping already materializes every row eagerly, before it begins).
/// A cancellation observed at any checkpoint raises `Error::Cancelled`;
/// the synchronous core itself never supplies a check that returns
/// `true` — this hook exists for the async façade.
pub fn execute_select_cancellable(
    db: &Database,
    select: &SelectStatement,
    trigger_row: Option<&Row>,
    cancel: Option<&CancelCheck<'_>>,
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut rows = build_source_rows(db, select, trigger_row)?;

    if let Some(filter) = &select.filter {
        rows = filter_rows(db, rows, filter)?;
    }

    let is_grouped = !select.group_by.is_empty()
        || select
            .items
            .iter()
            .any(|item| matches!(item, SelectItem::Expr { expr, .. } if contains_aggregate(expr)));

    let mut grouped_rows = if is_grouped {
        group_and_aggregate(db, &rows, select)?
    } else {
        rows.clone()
    };

    if let Some(having) = &select.having {
        grouped_rows = filter_rows(db, grouped_rows, having)?;
    }

    if !select.order_by.is_empty() {
        sort_rows(db, &mut grouped_rows, select)?;
    }

    let offset = select.offset.unwrap_or(0) as usize;
    let limited: Vec<Row> = grouped_rows.into_iter().skip(offset).collect();
    let limited = match select.limit {
        Some(n) => limited.into_iter().take(n as usize).collect(),
        None => limited,
    };

    if let Some(check) = cancel {
        if check() {
            return Err(Error::Cancelled);
        }
    }

    let (headers, projected) = project(db, &limited, select, cancel)?;

    let projected = if select.distinct {
        dedup_rows(projected)
    } else {
        projected
    };

    Ok((headers, projected))
}

fn empty_eval_ctx<'a>(db: &'a Database, row: &'a Row) -> EvalContext<'a> {
    EvalContext::new(row, &db.functions, &db.add_ins)
}

fn build_source_rows(
    db: &Database,
    select: &SelectStatement,
    trigger_row: Option<&Row>,
) -> Result<Vec<Row>> {
    if select.from.is_empty() {
        let mut row = Row::new();
        if let Some(t) = trigger_row {
            row.merge_from(t);
        }
        return Ok(vec![row]);
    }

    let mut rows = load_table_rows(db, &select.from[0])?;
    for extra in &select.from[1..] {
        let extra_rows = load_table_rows(db, extra)?;
        rows = cross_join(&rows, &extra_rows);
    }
    for join in &select.joins {
        rows = apply_join(db, rows, join)?;
    }
    Ok(rows)
}

fn load_table_rows(db: &Database, table_ref: &TableRef) -> Result<Vec<Row>> {
    let table = db
        .table(&table_ref.name)
        .ok_or_else(|| Error::not_found("table", table_ref.name.clone()))?;
    let alias = table_ref.alias.as_deref().unwrap_or(&table_ref.name);
    Ok(table
        .rows()
        .iter()
        .map(|values| row_from_values(table, alias, values))
        .collect())
}

fn row_from_values(table: &Table, alias: &str, values: &[Value]) -> Row {
    let mut row = Row::new();
    for (col, value) in table.columns().iter().zip(values.iter()) {
        row.insert(col.name.clone(), value.clone());
        row.insert(format!("{alias}.{}", col.name), value.clone());
    }
    row
}

/// Merges `addition` into `base`; on key conflict `base` wins, matching
/// "bare wins for the first source".
fn merge_priority(base: &Row, addition: &Row) -> Row {
    let mut out = addition.clone();
    out.merge_from(base);
    out
}

fn cross_join(left: &[Row], right: &[Row]) -> Vec<Row> {
    let mut out = Vec::with_capacity(left.len() * right.len().max(1));
    for l in left {
        for r in right {
            out.push(merge_priority(l, r));
        }
    }
    out
}

fn null_row_like(sample: &Row) -> Row {
    let mut row = Row::new();
    for key in sample.keys() {
        row.insert(key, Value::Null);
    }
    row
}

fn apply_join(db: &Database, left: Vec<Row>, join: &Join) -> Result<Vec<Row>> {
    let right_rows = load_table_rows(db, &join.table)?;
    let right_null = right_rows.first().map(null_row_like);
    let left_null = left.first().map(null_row_like);

    match join.kind {
        JoinKind::Cross => Ok(cross_join(&left, &right_rows)),
        JoinKind::Inner => {
            let mut out = Vec::new();
            for l in &left {
                for r in &right_rows {
                    let merged = merge_priority(l, r);
                    if join_matches(db, join, &merged)? {
                        out.push(merged);
                    }
                }
            }
            Ok(out)
        }
        JoinKind::Left => {
            let mut out = Vec::new();
            for l in &left {
                let mut matched = false;
                for r in &right_rows {
                    let merged = merge_priority(l, r);
                    if join_matches(db, join, &merged)? {
                        out.push(merged);
                        matched = true;
                    }
                }
                if !matched {
                    let padded = right_null
                        .as_ref()
                        .map_or_else(|| l.clone(), |rn| merge_priority(l, rn));
                    out.push(padded);
                }
            }
            Ok(out)
        }
        JoinKind::Right => {
            let mut out = Vec::new();
            for r in &right_rows {
                let mut matched = false;
                for l in &left {
                    let merged = merge_priority(l, r);
                    if join_matches(db, join, &merged)? {
                        out.push(merged);
                        matched = true;
                    }
                }
                if !matched {
                    let padded = left_null
                        .as_ref()
                        .map_or_else(|| r.clone(), |ln| merge_priority(ln, r));
                    out.push(padded);
                }
            }
            Ok(out)
        }
        JoinKind::Full => {
            let mut out = Vec::new();
            let mut right_matched = vec![false; right_rows.len()];
            for l in &left {
                let mut matched = false;
                for (idx, r) in right_rows.iter().enumerate() {
                    let merged = merge_priority(l, r);
                    if join_matches(db, join, &merged)? {
                        out.push(merged);
                        matched = true;
                        right_matched[idx] = true;
                    }
                }
                if !matched {
                    let padded = right_null
                        .as_ref()
                        .map_or_else(|| l.clone(), |rn| merge_priority(l, rn));
                    out.push(padded);
                }
            }
            for (idx, r) in right_rows.iter().enumerate() {
                if !right_matched[idx] {
                    let padded = left_null
                        .as_ref()
                        .map_or_else(|| r.clone(), |ln| merge_priority(ln, r));
                    out.push(padded);
                }
            }
            Ok(out)
        }
    }
}

fn join_matches(db: &Database, join: &Join, merged: &Row) -> Result<bool> {
    match &join.on {
        Some(cond) => Ok(eval::eval_expr(cond, &empty_eval_ctx(db, merged))?.is_truthy()),
        None => Ok(true),
    }
}

fn filter_rows(db: &Database, rows: Vec<Row>, predicate: &Expr) -> Result<Vec<Row>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if eval::eval_expr(predicate, &empty_eval_ctx(db, &row))?.is_truthy() {
            out.push(row);
        }
    }
    Ok(out)
}

/// Recursively checks whether `expr` contains a top-level-reachable
/// aggregate call anywhere in its tree (not just at the root).
fn contains_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::Call { name, args, .. } => {
            crate::ast::is_aggregate_name(name) || args.iter().any(contains_aggregate)
        }
        Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => contains_aggregate(expr),
        Expr::Binary { lhs, rhs, .. } => contains_aggregate(lhs) || contains_aggregate(rhs),
        Expr::IsNull { expr, .. } => contains_aggregate(expr),
        Expr::Between { expr, low, high, .. } => {
            contains_aggregate(expr) || contains_aggregate(low) || contains_aggregate(high)
        }
        Expr::InList { expr, list, .. } => {
            contains_aggregate(expr) || list.iter().any(contains_aggregate)
        }
        Expr::Like { expr, pattern, .. } => contains_aggregate(expr) || contains_aggregate(pattern),
        Expr::Case {
            operand,
            branches,
            else_branch,
        } => {
            operand.as_deref().is_some_and(contains_aggregate)
                || branches
                    .iter()
                    .any(|(c, r)| contains_aggregate(c) || contains_aggregate(r))
                || else_branch.as_deref().is_some_and(contains_aggregate)
        }
        Expr::Literal(_) | Expr::Column { .. } => false,
    }
}

fn collect_aggregate_calls<'e>(expr: &'e Expr, out: &mut HashMap<String, &'e Expr>) {
    match expr {
        Expr::Call { name, args, .. } => {
            if crate::ast::is_aggregate_name(name) {
                if let Some(key) = expr.aggregate_key() {
                    out.entry(key).or_insert(expr);
                }
            }
            for a in args {
                collect_aggregate_calls(a, out);
            }
        }
        Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => collect_aggregate_calls(expr, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_aggregate_calls(lhs, out);
            collect_aggregate_calls(rhs, out);
        }
        Expr::IsNull { expr, .. } => collect_aggregate_calls(expr, out),
        Expr::Between { expr, low, high, .. } => {
            collect_aggregate_calls(expr, out);
            collect_aggregate_calls(low, out);
            collect_aggregate_calls(high, out);
        }
        Expr::InList { expr, list, .. } => {
            collect_aggregate_calls(expr, out);
            for item in list {
                collect_aggregate_calls(item, out);
            }
        }
        Expr::Like { expr, pattern, .. } => {
            collect_aggregate_calls(expr, out);
            collect_aggregate_calls(pattern, out);
        }
        Expr::Case {
            operand,
            branches,
            else_branch,
        } => {
            if let Some(o) = operand {
                collect_aggregate_calls(o, out);
            }
            for (c, r) in branches {
                collect_aggregate_calls(c, out);
                collect_aggregate_calls(r, out);
            }
            if let Some(e) = else_branch {
                collect_aggregate_calls(e, out);
            }
        }
        Expr::Literal(_) | Expr::Column { .. } => {}
    }
}

fn group_and_aggregate(db: &Database, rows: &[Row], select: &SelectStatement) -> Result<Vec<Row>> {
    let mut groups: Vec<(String, Vec<&Row>)> = Vec::new();
    for row in rows {
        let key = group_key(db, row, &select.group_by)?;
        if let Some(existing) = groups.iter_mut().find(|(k, _)| *k == key) {
            existing.1.push(row);
        } else {
            groups.push((key, vec![row]));
        }
    }
    if groups.is_empty() && select.group_by.is_empty() {
        groups.push((String::new(), Vec::new()));
    }

    let mut agg_exprs: HashMap<String, &Expr> = HashMap::new();
    for item in &select.items {
        if let SelectItem::Expr { expr, .. } = item {
            collect_aggregate_calls(expr, &mut agg_exprs);
        }
    }
    if let Some(h) = &select.having {
        collect_aggregate_calls(h, &mut agg_exprs);
    }
    for ob in &select.order_by {
        collect_aggregate_calls(&ob.expr, &mut agg_exprs);
    }

    let mut out = Vec::with_capacity(groups.len());
    for (_, group_rows) in groups {
        let mut result_row = group_rows.first().map_or_else(Row::new, |r| (*r).clone());
        let mut agg_values: HashMap<String, Value> = HashMap::new();
        for (key, call_expr) in &agg_exprs {
            let value = compute_aggregate(db, call_expr, &group_rows)?;
            agg_values.insert(key.clone(), value);
        }
        for (key, value) in agg_values {
            result_row.insert(key, value);
        }
        out.push(result_row);
    }
    Ok(out)
}

fn group_key(db: &Database, row: &Row, group_by: &[Expr]) -> Result<String> {
    if group_by.is_empty() {
        return Ok(String::new());
    }
    let mut parts = Vec::with_capacity(group_by.len());
    for expr in group_by {
        parts.push(eval::eval_expr(expr, &empty_eval_ctx(db, row))?.to_display_string());
    }
    Ok(parts.join("\u{1}"))
}

fn compute_aggregate(db: &Database, call: &Expr, group_rows: &[&Row]) -> Result<Value> {
    let Expr::Call { name, distinct, args, .. } = call else {
        unreachable!()
    };
    let upper = name.to_ascii_uppercase();
    let is_star = matches!(args.first(), Some(Expr::Column { name, .. }) if name == "*");

    if upper == "COUNT" && is_star {
        return Ok(Value::Int(group_rows.len() as i64));
    }

    let arg = args.first().ok_or_else(|| Error::ParseError {
        span: crate::lexer::Span::default(),
        expected: "aggregate argument".into(),
        found: "none".into(),
    })?;

    let mut values = Vec::with_capacity(group_rows.len());
    for row in group_rows {
        let v = eval::eval_expr(arg, &empty_eval_ctx(db, row))?;
        if !v.is_null() {
            values.push(v);
        }
    }
    if *distinct {
        let mut seen = std::collections::HashSet::new();
        values.retain(|v| seen.insert(v.to_display_string().to_ascii_lowercase()));
    }

    Ok(match upper.as_str() {
        "COUNT" => Value::Int(values.len() as i64),
        "SUM" => {
            let sum: f64 = values.iter().filter_map(Value::as_f64).sum();
            Value::Float(sum)
        }
        "AVG" => {
            if values.is_empty() {
                Value::Int(0)
            } else {
                let sum: f64 = values.iter().filter_map(Value::as_f64).sum();
                Value::Float(sum / values.len() as f64)
            }
        }
        "MIN" => values
            .into_iter()
            .min_by(Value::compare_total)
            .unwrap_or(Value::Null),
        "MAX" => values
            .into_iter()
            .max_by(Value::compare_total)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    })
}

fn sort_rows(db: &Database, rows: &mut [Row], select: &SelectStatement) -> Result<()> {
    let mut keyed: Vec<(Vec<Value>, usize)> = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let ctx = empty_eval_ctx(db, row);
        let mut key = Vec::with_capacity(select.order_by.len());
        for ob in &select.order_by {
            key.push(eval::eval_expr(&ob.expr, &ctx)?);
        }
        keyed.push((key, idx));
    }
    keyed.sort_by(|a, b| {
        for (idx, ob) in select.order_by.iter().enumerate() {
            let ord = Value::compare_total(&a.0[idx], &b.0[idx]);
            let ord = if ob.direction == OrderDirection::Desc {
                ord.reverse()
            } else {
                ord
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    let reordered: Vec<Row> = keyed.into_iter().map(|(_, idx)| rows[idx].clone()).collect();
    rows.clone_from_slice(&reordered);
    Ok(())
}

fn project(
    db: &Database,
    rows: &[Row],
    select: &SelectStatement,
    cancel: Option<&CancelCheck<'_>>,
) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let mut headers = Vec::new();
    let mut resolved_items: Vec<ResolvedItem> = Vec::new();

    for item in &select.items {
        match item {
            SelectItem::Wildcard => {
                for name in wildcard_columns(db, select, None)? {
                    headers.push(name.clone());
                    resolved_items.push(ResolvedItem::Column(name));
                }
            }
            SelectItem::QualifiedWildcard(alias) => {
                for name in wildcard_columns(db, select, Some(alias))? {
                    headers.push(name.clone());
                    resolved_items.push(ResolvedItem::Column(name));
                }
            }
            SelectItem::Expr { expr, alias } => {
                let header = alias.clone().unwrap_or_else(|| display_name(expr));
                headers.push(header);
                resolved_items.push(ResolvedItem::Expr(expr.clone()));
            }
        }
    }

    let mut out_rows = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(check) = cancel {
            if check() {
                return Err(Error::Cancelled);
            }
        }
        let ctx = empty_eval_ctx(db, row);
        let mut out_row = Vec::with_capacity(resolved_items.len());
        for item in &resolved_items {
            let value = match item {
                ResolvedItem::Column(name) => row.get(name).cloned().unwrap_or(Value::Null),
                ResolvedItem::Expr(expr) => eval::eval_expr(expr, &ctx)?,
            };
            out_row.push(value);
        }
        out_rows.push(out_row);
    }
    Ok((headers, out_rows))
}

enum ResolvedItem {
    Column(String),
    Expr(Expr),
}

fn wildcard_columns(db: &Database, select: &SelectStatement, alias: Option<&str>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for table_ref in &select.from {
        if let Some(want) = alias {
            let this_alias = table_ref.alias.as_deref().unwrap_or(&table_ref.name);
            if !this_alias.eq_ignore_ascii_case(want) {
                continue;
            }
        }
        let table = db
            .table(&table_ref.name)
            .ok_or_else(|| Error::not_found("table", table_ref.name.clone()))?;
        names.extend(table.columns().iter().map(|c| c.name.clone()));
    }
    Ok(names)
}

fn display_name(expr: &Expr) -> String {
    match expr {
        Expr::Column { name, .. } => name.clone(),
        Expr::Call { name, args_text, .. } if crate::ast::is_aggregate_name(name) => {
            format!("{}({})", name.to_ascii_uppercase(), args_text)
        }
        _ => "expr".to_string(),
    }
}

fn dedup_rows(rows: Vec<Vec<Value>>) -> Vec<Vec<Value>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key: String = row
            .iter()
            .map(Value::to_display_string)
            .collect::<Vec<_>>()
            .join("\u{1}");
        if seen.insert(key) {
            out.push(row);
        }
    }
    out
}
