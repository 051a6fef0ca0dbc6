//! Row flattening.
//!
//! Nested objects and arrays are expanded into path-notation keys
//! (`address.city`, `tags[0]`, `tags[0].name`) next to the original top-level
//! entries. Flattening an already flat dataset is a no-op.

use serde_json::{Map, Value};

use crate::value::{Dataset, Row};

/// Flatten every row of a dataset. Non-object rows pass through unchanged.
pub fn flatten(dataset: &[Value]) -> Dataset {
    dataset
        .iter()
        .map(|row| match row {
            Value::Object(obj) => Value::Object(flatten_row(obj)),
            other => other.clone(),
        })
        .collect()
}

/// Flatten a single row.
pub fn flatten_row(row: &Row) -> Row {
    let mut flat = row.clone();

    for (key, value) in row {
        match value {
            Value::Object(obj) => walk_object(obj, key, &mut flat),
            Value::Array(items) => walk_array(items, key, &mut flat),
            _ => {}
        }
    }

    flat
}

fn walk_object(obj: &Map<String, Value>, prefix: &str, out: &mut Row) {
    for (key, value) in obj {
        let path = format!("{}.{}", prefix, key);
        match value {
            Value::Object(nested) => walk_object(nested, &path, out),
            Value::Array(items) => walk_array(items, &path, out),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

fn walk_array(items: &[Value], prefix: &str, out: &mut Row) {
    for (idx, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", prefix, idx);
        // Elements are stored whole, then expanded if they have structure.
        out.insert(path.clone(), item.clone());
        match item {
            Value::Object(nested) => walk_object(nested, &path, out),
            Value::Array(inner) => walk_array(inner, &path, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_object() {
        let data = vec![json!({"id": 1, "address": {"city": "NYC", "geo": {"lat": 40.7}}})];
        let flat = flatten(&data);
        let row = flat[0].as_object().unwrap();

        assert_eq!(row["id"], json!(1));
        assert_eq!(row["address"], json!({"city": "NYC", "geo": {"lat": 40.7}}));
        assert_eq!(row["address.city"], json!("NYC"));
        assert_eq!(row["address.geo.lat"], json!(40.7));
        assert!(!row.contains_key("address.geo"));
    }

    #[test]
    fn test_flatten_arrays() {
        let data = vec![json!({"tags": ["a", "b"], "items": [{"name": "x", "qty": 2}]})];
        let flat = flatten(&data);
        let row = flat[0].as_object().unwrap();

        assert_eq!(row["tags[0]"], json!("a"));
        assert_eq!(row["tags[1]"], json!("b"));
        assert_eq!(row["items[0]"], json!({"name": "x", "qty": 2}));
        assert_eq!(row["items[0].name"], json!("x"));
        assert_eq!(row["items[0].qty"], json!(2));
    }

    #[test]
    fn test_flatten_passes_non_objects_through() {
        let data = vec![json!(5), json!("text"), json!(null)];
        assert_eq!(flatten(&data), data);
    }

    #[test]
    fn test_flatten_does_not_pad_missing_keys() {
        let data = vec![json!({"a": 1, "b": {"c": 2}}), json!({"a": 3})];
        let flat = flatten(&data);
        assert!(flat[0].get("b.c").is_some());
        assert!(flat[1].get("b.c").is_none());
        assert_eq!(flat[1], json!({"a": 3}));
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let data = vec![
            json!({"a": {"b": [1, {"c": [true, null]}]}, "d": "x"}),
            json!({"list": [[1, 2], [3]], "empty": {}}),
            json!(42),
        ];
        let once = flatten(&data);
        let twice = flatten(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_flatten_is_lossless_for_leaves() {
        let data = vec![json!({"a": {"b": [10, {"c": "deep"}]}, "n": null})];
        let flat = flatten(&data);
        let row = flat[0].as_object().unwrap();
        assert_eq!(row["a.b[0]"], json!(10));
        assert_eq!(row["a.b[1].c"], json!("deep"));
        assert_eq!(row["n"], json!(null));
    }
}
