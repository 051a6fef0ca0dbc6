//! SQL Query Tests
//!
//! End-to-end tests for:
//! - Projection, aliases and nested column references
//! - WHERE filtering with loose comparisons
//! - GROUP BY with aggregate functions
//! - LIMIT / OFFSET in both syntaxes
//! - Passthrough of non-SELECT text and parse errors

use rowql::{execute_query, EngineError};
use serde_json::{json, Value};

fn run(rows: &[Value], query: &str) -> Vec<Value> {
    execute_query(rows, query).unwrap_or_else(|e| panic!("Query failed: {}: {}", query, e))
}

fn numbered_rows() -> Vec<Value> {
    (0..10).map(|i| json!({"i": i})).collect()
}

fn sales() -> Vec<Value> {
    vec![
        json!({"product": "Widget", "category": "A", "amount": 100, "quantity": 5}),
        json!({"product": "Gadget", "category": "A", "amount": 200, "quantity": 3}),
        json!({"product": "Widget", "category": "A", "amount": 150, "quantity": 7}),
        json!({"product": "Gizmo", "category": "B", "amount": 75, "quantity": 10}),
        json!({"product": "Gadget", "category": "B", "amount": "250", "quantity": 2}),
        json!({"product": "Widget", "category": "B", "amount": 50, "quantity": 20}),
    ]
}

#[test]
fn test_limit_offset_syntax() {
    let rows = numbered_rows();

    let result = run(&rows, "SELECT * FROM data LIMIT 3 OFFSET 2");
    assert_eq!(result, rows[2..5].to_vec());

    let result = run(&rows, "SELECT * FROM data LIMIT 2,3");
    assert_eq!(result, rows[2..5].to_vec());

    let result = run(&rows, "SELECT * FROM data LIMIT 4");
    assert_eq!(result, rows[0..4].to_vec());
}

#[test]
fn test_offset_past_end_is_empty() {
    let result = run(&numbered_rows(), "SELECT * FROM data LIMIT 3 OFFSET 20");
    assert!(result.is_empty());
}

#[test]
fn test_where_then_limit() {
    let result = run(&numbered_rows(), "SELECT i FROM data WHERE i >= 5 LIMIT 2");
    assert_eq!(result, vec![json!({"i": 5}), json!({"i": 6})]);
}

#[test]
fn test_where_string_equality() {
    let result = run(&sales(), "SELECT product, amount FROM data WHERE category = 'B'");
    assert_eq!(result.len(), 3);
    assert_eq!(result[0], json!({"product": "Gizmo", "amount": 75}));
}

#[test]
fn test_where_numeric_coerces_strings() {
    let result = run(&sales(), "SELECT product FROM data WHERE amount > 180");
    assert_eq!(result, vec![json!({"product": "Gadget"}), json!({"product": "Gadget"})]);
}

#[test]
fn test_where_negative_literal() {
    let rows = vec![json!({"t": -5}), json!({"t": 3})];
    let result = run(&rows, "SELECT * FROM data WHERE t < -1");
    assert_eq!(result, vec![json!({"t": -5})]);
}

#[test]
fn test_group_by_sum_and_count() {
    let result = run(
        &sales(),
        "SELECT category, SUM(amount) AS total, COUNT(*) AS n FROM data GROUP BY category",
    );
    assert_eq!(
        result,
        vec![
            json!({"category": "A", "total": 450, "n": 3}),
            json!({"category": "B", "total": 375, "n": 3}),
        ]
    );
}

#[test]
fn test_group_by_multiple_columns_sorted() {
    let result = run(
        &sales(),
        "SELECT category, product, MAX(quantity) FROM data GROUP BY category, product",
    );
    let keys: Vec<(String, String)> = result
        .iter()
        .map(|r| {
            (
                r["category"].as_str().unwrap().to_string(),
                r["product"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            ("A".to_string(), "Gadget".to_string()),
            ("A".to_string(), "Widget".to_string()),
            ("B".to_string(), "Gadget".to_string()),
            ("B".to_string(), "Gizmo".to_string()),
            ("B".to_string(), "Widget".to_string()),
        ]
    );
    assert_eq!(result[1]["MAX(quantity)"], json!(7));
}

#[test]
fn test_whole_table_aggregate() {
    let result = run(&sales(), "SELECT COUNT(*), AVG(quantity) AS avg_qty FROM data");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0]["COUNT(*)"], json!(6));
    let avg = result[0]["avg_qty"].as_f64().unwrap();
    assert!((avg - 47.0 / 6.0).abs() < 1e-12);
}

#[test]
fn test_nested_column_reference() {
    let rows = vec![
        json!({"user": {"name": "Alice", "langs": ["rust", "go"]}}),
        json!({"user": {"name": "Bob", "langs": ["python"]}}),
    ];
    let result = run(&rows, "SELECT user.name AS name, user.langs[0] AS first FROM data WHERE user.name = 'Bob'");
    assert_eq!(result, vec![json!({"name": "Bob", "first": "python"})]);
}

#[test]
fn test_quoted_identifier_and_comment() {
    let rows = vec![json!({"unit price": 4, "name": "pen"})];
    let result = run(&rows, "SELECT `unit price` AS price -- the price\nFROM data");
    assert_eq!(result, vec![json!({"price": 4})]);
}

#[test]
fn test_passthrough_returns_input() {
    let rows = sales();
    assert_eq!(run(&rows, "describe the data please"), rows);
    assert_eq!(run(&rows, ""), rows);
}

#[test]
fn test_parse_errors() {
    let rows = sales();
    for query in [
        "SELECT FROM data",
        "SELECT * FROM",
        "SELECT * FROM data WHERE amount >",
        "SELECT * FROM data WHERE amount > 1 AND quantity < 3",
        "SELECT * FROM data ORDER BY amount",
        "SELECT * FROM data LIMIT x",
    ] {
        let err = execute_query(&rows, query).unwrap_err();
        assert!(
            matches!(err, EngineError::ParseError(_)),
            "expected parse error for {}: {:?}",
            query,
            err
        );
    }
}

#[test]
fn test_empty_input_gives_empty_result() {
    assert!(run(&[], "SELECT COUNT(*) FROM data").is_empty());
}

#[test]
fn test_where_scientific_literals() {
    let rows = vec![json!({"x": 0.25}), json!({"x": "2e3"}), json!({"x": 900})];
    let result = run(&rows, "SELECT x FROM data WHERE x > 1e3");
    assert_eq!(result, vec![json!({"x": "2e3"})]);

    let result = run(&rows, "SELECT x FROM data WHERE x < .5");
    assert_eq!(result, vec![json!({"x": 0.25})]);
}

#[test]
fn test_malformed_query_on_empty_input() {
    let err = execute_query(&[], "SELECT * FROM").unwrap_err();
    assert!(matches!(err, EngineError::ParseError(_)));
}
