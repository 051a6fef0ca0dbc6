//! Value model shared by every engine component.
//!
//! Rows are `serde_json` objects (insertion ordered), so the tagged union
//! Null/Bool/Number/String/Array/Object comes straight from `serde_json::Value`.
//! This module adds the coercion rules the engine relies on:
//! - to_display_string: string coercion used for group keys and text comparison
//! - coerce_number: `Number()`-style coercion used by WHERE predicates
//! - numeric_value: strict numeric extraction used by aggregation and statistics
//! - loose_equals: equality used by `=`/`!=` and join matching
//! - locale_compare: ordering used for group keys

use std::cmp::Ordering;

use serde_json::{Map, Value};

/// One record: column name to value, in insertion order.
pub type Row = Map<String, Value>;

/// An ordered collection of rows from one logical source.
pub type Dataset = Vec<Value>;

/// Build a JSON number from an f64.
///
/// Integral values become integer numbers so results compare equal to
/// `json!(4)` style literals. Non-finite values become `Null`.
#[inline]
pub fn number_value(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Render a value the way a dynamically typed host would stringify it.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_f64(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn format_f64(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Parse a decimal numeric literal. Rejects the `inf`/`nan` spellings Rust
/// accepts but a query author would not write.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let valid = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !valid {
        return None;
    }
    text.parse::<f64>().ok()
}

/// `Number()`-style coercion. Returns NaN when the value has no numeric reading.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            if s.trim().is_empty() {
                0.0
            } else {
                parse_number(s).unwrap_or(f64::NAN)
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => coerce_number(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Numeric reading of a value for aggregation and statistics.
///
/// Only numbers and numeric strings qualify; everything else (including
/// null, booleans and empty strings) is excluded rather than coerced.
#[inline]
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number(s).filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Type tag used by the info summary.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Loose equality: numbers compare numerically against numeric strings and
/// booleans; null only equals null.
pub fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), Value::Number(_))
        | (Value::Number(_), Value::Bool(_))
        | (Value::Bool(_), Value::String(_))
        | (Value::String(_), Value::Bool(_)) => {
            let a = coerce_number(left);
            let b = coerce_number(right);
            !a.is_nan() && a == b
        }
        _ => left == right,
    }
}

/// Locale-aware string ordering.
///
/// Letters compare case-insensitively first; on a tie, lowercase sorts
/// before uppercase at the first differing position.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    if primary != Ordering::Equal {
        return primary;
    }

    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            return match (ca.is_lowercase(), cb.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => ca.cmp(&cb),
            };
        }
    }

    a.len().cmp(&b.len())
}

/// Look up a column in a row.
///
/// The literal key wins (flattened rows store `a.b[0]` verbatim); otherwise the
/// name is walked as a dot/bracket path through nested objects and arrays.
pub fn get_column<'a>(row: &'a Row, name: &str) -> Option<&'a Value> {
    if let Some(value) = row.get(name) {
        return Some(value);
    }
    if !name.contains('.') && !name.contains('[') {
        return None;
    }

    let mut segments = path_segments(name)?.into_iter();
    let first = match segments.next()? {
        PathSegment::Key(key) => row.get(&key)?,
        PathSegment::Index(_) => return None,
    };

    let mut current = first;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(obj)) => obj.get(&key)?,
            (PathSegment::Index(idx), Value::Array(arr)) => arr.get(idx)?,
            _ => return None,
        };
    }
    Some(current)
}

#[derive(Debug, PartialEq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

fn path_segments(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        }
        while let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']')?;
            let idx = stripped[..close].parse::<usize>().ok()?;
            segments.push(PathSegment::Index(idx));
            rest = &stripped[close + 1..];
        }
        if !rest.is_empty() {
            return None;
        }
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_value_prefers_integers() {
        assert_eq!(number_value(4.0), json!(4));
        assert_eq!(number_value(-2.0), json!(-2));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(to_display_string(&json!(null)), "null");
        assert_eq!(to_display_string(&json!(true)), "true");
        assert_eq!(to_display_string(&json!(3)), "3");
        assert_eq!(to_display_string(&json!(3.0)), "3");
        assert_eq!(to_display_string(&json!(0.5)), "0.5");
        assert_eq!(to_display_string(&json!("abc")), "abc");
        assert_eq!(to_display_string(&json!([1, null, "x"])), "1,,x");
        assert_eq!(to_display_string(&json!({"a": 1})), "[object Object]");
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(null)), 0.0);
        assert_eq!(coerce_number(&json!(true)), 1.0);
        assert_eq!(coerce_number(&json!("")), 0.0);
        assert_eq!(coerce_number(&json!(" 12.5 ")), 12.5);
        assert!(coerce_number(&json!("abc")).is_nan());
        assert!(coerce_number(&json!("inf")).is_nan());
        assert_eq!(coerce_number(&json!([7])), 7.0);
        assert!(coerce_number(&json!({"a": 1})).is_nan());
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value(&json!(3)), Some(3.0));
        assert_eq!(numeric_value(&json!("4.5")), Some(4.5));
        assert_eq!(numeric_value(&json!("")), None);
        assert_eq!(numeric_value(&json!(null)), None);
        assert_eq!(numeric_value(&json!(true)), None);
        assert_eq!(numeric_value(&json!("n/a")), None);
    }

    #[test]
    fn test_loose_equals() {
        assert!(loose_equals(&json!(1), &json!(1.0)));
        assert!(loose_equals(&json!(1), &json!("1")));
        assert!(loose_equals(&json!("a"), &json!("a")));
        assert!(!loose_equals(&json!(1), &json!("abc")));
        assert!(!loose_equals(&json!(null), &json!(0)));
        assert!(loose_equals(&json!(null), &json!(null)));
        assert!(loose_equals(&json!(true), &json!(1)));
    }

    #[test]
    fn test_locale_compare() {
        assert_eq!(locale_compare("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_compare("a", "A"), Ordering::Less);
        assert_eq!(locale_compare("b", "a"), Ordering::Greater);
        assert_eq!(locale_compare("10", "2"), Ordering::Less);
        assert_eq!(locale_compare("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_get_column_literal_and_path() {
        let row = json!({
            "name": "Alice",
            "address": {"city": "NYC"},
            "tags": [{"label": "x"}, {"label": "y"}],
            "flat.key": 1
        });
        let row = row.as_object().unwrap();
        assert_eq!(get_column(row, "name"), Some(&json!("Alice")));
        assert_eq!(get_column(row, "address.city"), Some(&json!("NYC")));
        assert_eq!(get_column(row, "tags[1].label"), Some(&json!("y")));
        assert_eq!(get_column(row, "flat.key"), Some(&json!(1)));
        assert_eq!(get_column(row, "address.zip"), None);
        assert_eq!(get_column(row, "missing"), None);
    }
}
