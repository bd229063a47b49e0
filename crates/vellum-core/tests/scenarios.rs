//! End-to-end scenarios exercising the full tokenizer -> parser ->
//! evaluator -> executor pipeline through the public `Database` API.

use std::sync::Arc;

use vellum_core::{Database, Value};

fn products_db() -> Database {
    let mut db = Database::new();
    db.execute_non_query(
        "CREATE TABLE Products (Id INT, Name VARCHAR, Category VARCHAR, Price FLOAT, Stock INT)",
    )
    .unwrap();
    for row in [
        "(1,'Hammer','Tools',12.99,200)",
        "(2,'Wrench','Tools',19.99,85)",
        "(3,'Drill','Tools',149.99,32)",
        "(4,'Paint','Supplies',8.49,500)",
        "(5,'Paintbrush','Supplies',3.99,1200)",
    ] {
        db.execute_non_query(&format!("INSERT INTO Products VALUES {row}"))
            .unwrap();
    }
    db
}

#[test]
fn group_by_category_counts_rows() {
    let db = products_db();
    let (headers, rows) = db
        .execute_reader("SELECT Category, COUNT(*) FROM Products GROUP BY Category ORDER BY Category ASC")
        .unwrap();
    assert_eq!(headers[0], "Category");
    assert_eq!(rows.len(), 2);

    let as_pairs: Vec<(String, i64)> = rows
        .iter()
        .map(|r| {
            let name = r[0].to_display_string();
            let count = r[1].as_i64().unwrap();
            (name, count)
        })
        .collect();
    assert_eq!(
        as_pairs,
        vec![("Supplies".to_string(), 2), ("Tools".to_string(), 3)]
    );
}

#[test]
fn like_pattern_matches_single_row() {
    let db = products_db();
    let (_, rows) = db
        .execute_reader("SELECT Name FROM Products WHERE Name LIKE 'Dr__l'")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0].to_display_string(), "Drill");
}

#[test]
fn before_insert_trigger_clamps_price() {
    let mut db = products_db();
    db.execute_non_query(
        "CREATE TRIGGER clamp_price BEFORE INSERT ON Products \
         BEGIN IF NEW.Price < 1.0 THEN SET NEW.Price = 1.0 END IF END",
    )
    .unwrap();

    db.execute_non_query("INSERT INTO Products VALUES (6,'Freebie','Samples',0.0,10)")
        .unwrap();

    let (_, rows) = db
        .execute_reader("SELECT Price FROM Products WHERE Id = 6")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0].as_f64().unwrap(), 1.0);
}

#[test]
fn case_expression_picks_matching_branch() {
    let mut db = Database::new();
    let value = db
        .execute_scalar(
            "SELECT CASE WHEN 12.99 < 10 THEN 'Budget' WHEN 12.99 < 50 THEN 'Mid' ELSE 'Premium' END",
        )
        .unwrap();
    assert_eq!(value.to_display_string(), "Mid");
}

#[test]
fn add_in_resolves_before_dispatch_error_fallback() {
    let mut db = Database::new();
    db.register_add_in(
        "Double",
        Arc::new(|args: &[Value]| Value::Float(args[0].as_f64().unwrap_or(0.0) * 2.0)),
    );
    let value = db.execute_scalar("SELECT Double(21)").unwrap();
    assert_eq!(value.as_f64().unwrap(), 42.0);
}

#[test]
fn drop_table_if_exists_is_idempotent() {
    let mut db = Database::new();
    db.execute_non_query("DROP TABLE IF EXISTS Nope").unwrap();
    let err = db.execute_non_query("DROP TABLE Nope").unwrap_err();
    assert!(matches!(err, vellum_core::Error::NotFound { .. }));
}
