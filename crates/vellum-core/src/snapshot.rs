//! JSON snapshot persistence: serializes tables and trigger source text
//! to the wire format described for hosts, and reloads or merges it
//! back into a [`Database`].
//!
//! User-defined functions and add-ins are never persisted; triggers are
//! reconstructed by re-parsing their stored `CREATE TRIGGER` text.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Error, Result};
use crate::parser::Parser;
use crate::table::{Column, Table};
use crate::value::{DataType, Value};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotColumn {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotTable {
    name: String,
    columns: Vec<SnapshotColumn>,
    rows: Vec<Vec<Json>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotTrigger {
    name: String,
    sql: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct SnapshotDocument {
    tables: Vec<SnapshotTable>,
    triggers: Vec<SnapshotTrigger>,
}

fn snapshot_type_name(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Int => "Int64",
        DataType::Float => "Double",
        DataType::Bool => "Boolean",
        DataType::Timestamp => "DateTime",
        DataType::Uuid => "Guid",
        DataType::Text | DataType::Any => "String",
    }
}

fn data_type_from_snapshot_name(name: &str) -> DataType {
    match name {
        "Int64" => DataType::Int,
        "Double" => DataType::Float,
        "Boolean" => DataType::Bool,
        "DateTime" => DataType::Timestamp,
        "Guid" => DataType::Uuid,
        _ => DataType::Text,
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Timestamp(ts) => Json::String(ts.to_rfc3339()),
        Value::Uuid(u) => Json::String(u.to_string()),
    }
}

fn json_to_value(json: &Json, column_type: DataType) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if column_type == DataType::Bool {
                return Value::Bool(n.as_i64().is_some_and(|i| i != 0));
            }
            if let Some(i) = n.as_i64() {
                if matches!(column_type, DataType::Float) {
                    Value::Float(i as f64)
                } else {
                    Value::Int(i)
                }
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => parse_string_cell(s, column_type),
        Json::Array(_) | Json::Object(_) => Value::Null,
    }
}

fn parse_string_cell(s: &str, column_type: DataType) -> Value {
    match column_type {
        DataType::Timestamp => crate::value::parse_timestamp(s).map_or_else(
            || Value::Text(s.to_string()),
            Value::Timestamp,
        ),
        DataType::Uuid => s
            .parse::<Uuid>()
            .map_or_else(|_| Value::Text(s.to_string()), Value::Uuid),
        DataType::Int => s
            .parse::<i64>()
            .map_or_else(|_| Value::Text(s.to_string()), Value::Int),
        DataType::Float => s
            .parse::<f64>()
            .map_or_else(|_| Value::Text(s.to_string()), Value::Float),
        DataType::Bool => match s.to_ascii_lowercase().as_str() {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            _ => Value::Text(s.to_string()),
        },
        DataType::Text | DataType::Any => Value::Text(s.to_string()),
    }
}

fn table_to_snapshot(table: &Table) -> SnapshotTable {
    SnapshotTable {
        name: table.name.clone(),
        columns: table
            .columns()
            .iter()
            .map(|c| SnapshotColumn {
                name: c.name.clone(),
                type_name: snapshot_type_name(c.data_type).to_string(),
            })
            .collect(),
        rows: table
            .rows()
            .iter()
            .map(|row| row.iter().map(value_to_json).collect())
            .collect(),
    }
}

fn snapshot_to_table(snapshot: SnapshotTable) -> Table {
    let columns: Vec<Column> = snapshot
        .columns
        .iter()
        .map(|c| Column::new(c.name.clone(), data_type_from_snapshot_name(&c.type_name)))
        .collect();
    let mut table = Table::new(snapshot.name, columns.clone());
    for row in snapshot.rows {
        let values: Vec<Value> = row
            .iter()
            .zip(columns.iter())
            .map(|(cell, col)| json_to_value(cell, col.data_type))
            .collect();
        let _ = table.insert_row(values);
    }
    table
}

/// Serializes every table and trigger to the JSON snapshot format.
pub fn to_snapshot(db: &Database, pretty: bool) -> Result<String> {
    let doc = SnapshotDocument {
        tables: db.tables.values().map(table_to_snapshot).collect(),
        triggers: db
            .trigger_order
            .iter()
            .filter_map(|key| db.triggers.get(key))
            .map(|t| SnapshotTrigger {
                name: t.name.clone(),
                sql: t.source_text.clone(),
            })
            .collect(),
    };
    if pretty {
        Ok(serde_json::to_string_pretty(&doc)?)
    } else {
        Ok(serde_json::to_string(&doc)?)
    }
}

/// Builds a fresh [`Database`] from a snapshot document.
pub fn from_snapshot(text: &str) -> Result<Database> {
    let doc: SnapshotDocument = serde_json::from_str(text)?;
    let mut db = Database::new();
    for table in doc.tables {
        db.add_table(snapshot_to_table(table))?;
    }
    for trigger in doc.triggers {
        let stmt = Parser::new(&trigger.sql).parse_statement()?;
        if let crate::ast::Statement::CreateTrigger(create) = stmt {
            db.register_trigger_from_statement(create)?;
        } else {
            return Err(Error::ParseError {
                span: crate::lexer::Span::default(),
                expected: "CREATE TRIGGER".into(),
                found: "other statement".into(),
            });
        }
    }
    Ok(db)
}

/// Writes the snapshot to `path`.
pub fn save_snapshot(db: &Database, path: impl AsRef<Path>, pretty: bool) -> Result<()> {
    let text = to_snapshot(db, pretty)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// Reads and parses a snapshot file into a fresh [`Database`].
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Database> {
    let text = std::fs::read_to_string(path)?;
    from_snapshot(&text)
}

/// Merges a snapshot's tables and triggers into `db`. Each incoming
/// table or trigger is inserted only if its name is absent, unless
/// `overwrite` is true.
pub fn merge_snapshot(db: &mut Database, text: &str, overwrite: bool) -> Result<()> {
    let doc: SnapshotDocument = serde_json::from_str(text)?;
    for table in doc.tables {
        let key = table.name.to_ascii_lowercase();
        if overwrite || !db.tables.contains_key(&key) {
            db.tables.insert(key, snapshot_to_table(table));
        }
    }
    for trigger in doc.triggers {
        let key = trigger.name.to_ascii_lowercase();
        if overwrite || !db.triggers.contains_key(&key) {
            let stmt = Parser::new(&trigger.sql).parse_statement()?;
            if let crate::ast::Statement::CreateTrigger(create) = stmt {
                db.insert_trigger(key, crate::trigger::Trigger::from(create));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn round_trips_table_rows_and_types() {
        let mut db = Database::new();
        db.add_table(Table::new(
            "t",
            vec![
                Column::new("id".into(), DataType::Int),
                Column::new("name".into(), DataType::Text),
            ],
        ))
        .unwrap();
        db.execute_non_query("INSERT INTO t (id, name) VALUES (1, 'Ada')")
            .unwrap();

        let text = to_snapshot(&db, false).unwrap();
        let restored = from_snapshot(&text).unwrap();
        let table = restored.table("t").unwrap();
        assert_eq!(table.row_count(), 1);
        assert!(matches!(table.get_row(0).unwrap()[0], Value::Int(1)));
    }

    #[test]
    fn merge_keeps_existing_table_unless_overwrite() {
        let mut db = Database::new();
        db.add_table(Table::new("t", vec![Column::new("id".into(), DataType::Int)]))
            .unwrap();
        db.execute_non_query("INSERT INTO t (id) VALUES (1)").unwrap();

        let other = {
            let mut d = Database::new();
            d.add_table(Table::new("t", vec![Column::new("id".into(), DataType::Int)]))
                .unwrap();
            d.execute_non_query("INSERT INTO t (id) VALUES (2)").unwrap();
            to_snapshot(&d, false).unwrap()
        };

        merge_snapshot(&mut db, &other, false).unwrap();
        assert!(matches!(db.table("t").unwrap().get_row(0).unwrap()[0], Value::Int(1)));

        merge_snapshot(&mut db, &other, true).unwrap();
        assert!(matches!(db.table("t").unwrap().get_row(0).unwrap()[0], Value::Int(2)));
    }
}
