//! Evaluation helpers for the query executor.
//!
//! - evaluate_predicate: fail-open WHERE evaluation
//! - try_evaluate_predicate: the strict evaluation it wraps
//! - compare_literal: a single `value <op> literal` comparison
//! - strip_qualifier: split a `table.column` reference

use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::sql::{CompareOp, Literal, Predicate};
use crate::value::{coerce_number, get_column, loose_equals, to_display_string};

/// Evaluate a WHERE predicate against a row.
///
/// Fail-open: if the predicate cannot be evaluated for this row (for example
/// the row is not an object) the row passes. Malformed ad-hoc data should not
/// make rows silently disappear from results.
pub fn evaluate_predicate(row: &Value, predicate: &Predicate) -> bool {
    match try_evaluate_predicate(row, predicate) {
        Ok(keep) => keep,
        Err(err) => {
            tracing::debug!(error = %err, column = %predicate.column, "predicate failed; keeping row");
            true
        }
    }
}

/// Evaluate a WHERE predicate, reporting rows it cannot be applied to.
pub fn try_evaluate_predicate(row: &Value, predicate: &Predicate) -> EngineResult<bool> {
    let obj = row
        .as_object()
        .ok_or_else(|| EngineError::MissingColumn(predicate.column.clone()))?;

    let value = get_column(obj, &predicate.column);
    Ok(compare_literal(value, predicate.op, &predicate.value))
}

/// Compare a (possibly absent) row value against a literal.
///
/// Ordering operators coerce both sides to numbers; anything without a
/// numeric reading compares false. `=`/`!=` use loose equality, and a numeric
/// literal never equals a non-numeric value.
pub fn compare_literal(value: Option<&Value>, op: CompareOp, literal: &Literal) -> bool {
    match op {
        CompareOp::Eq => literal_equals(value, literal),
        CompareOp::NotEq => !literal_equals(value, literal),
        CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq => {
            let left = value.map(coerce_number).unwrap_or(f64::NAN);
            let right = match literal {
                Literal::Number(n) => *n,
                Literal::String(s) => coerce_number(&Value::String(s.clone())),
            };
            if left.is_nan() || right.is_nan() {
                return false;
            }
            match op {
                CompareOp::Lt => left < right,
                CompareOp::LtEq => left <= right,
                CompareOp::Gt => left > right,
                _ => left >= right,
            }
        }
    }
}

fn literal_equals(value: Option<&Value>, literal: &Literal) -> bool {
    let Some(value) = value else {
        return false;
    };

    match (value, literal) {
        (Value::Null, _) => false,
        (Value::Array(_) | Value::Object(_), Literal::Number(_)) => false,
        (_, Literal::Number(n)) => {
            let left = coerce_number(value);
            !left.is_nan() && left == *n
        }
        (Value::Array(_), Literal::String(s)) => to_display_string(value) == *s,
        (_, Literal::String(s)) => loose_equals(value, &Value::String(s.clone())),
    }
}

/// If `reference` is `table.column` for the given table (with or without its
/// file extension, ignoring case), return the column part.
pub fn strip_qualifier<'r>(reference: &'r str, table: &str) -> Option<&'r str> {
    let stem = match table.rfind('.') {
        Some(pos) if pos > 0 => &table[..pos],
        _ => table,
    };

    [table, stem].into_iter().find_map(|candidate| {
        let head = reference.get(..candidate.len())?;
        let rest = reference.get(candidate.len()..)?;
        if head.eq_ignore_ascii_case(candidate) {
            rest.strip_prefix('.').filter(|col| !col.is_empty())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pred(column: &str, op: CompareOp, value: Literal) -> Predicate {
        Predicate {
            column: column.to_string(),
            op,
            value,
        }
    }

    #[test]
    fn test_numeric_comparisons_coerce() {
        let row = json!({"age": "30", "score": 7.5});
        assert!(evaluate_predicate(&row, &pred("age", CompareOp::Gt, Literal::Number(18.0))));
        assert!(evaluate_predicate(&row, &pred("score", CompareOp::LtEq, Literal::Number(7.5))));
        assert!(!evaluate_predicate(&row, &pred("score", CompareOp::Lt, Literal::Number(7.5))));
        assert!(evaluate_predicate(&row, &pred("age", CompareOp::GtEq, Literal::String("30".to_string()))));
    }

    #[test]
    fn test_non_numeric_never_orders() {
        let row = json!({"name": "Alice"});
        assert!(!evaluate_predicate(&row, &pred("name", CompareOp::Gt, Literal::Number(0.0))));
        assert!(!evaluate_predicate(&row, &pred("name", CompareOp::Lt, Literal::Number(0.0))));
        assert!(!evaluate_predicate(&row, &pred("missing", CompareOp::Gt, Literal::Number(0.0))));
    }

    #[test]
    fn test_equality_is_loose() {
        let row = json!({"id": 1, "code": "007", "name": "Bob", "flag": null});
        assert!(evaluate_predicate(&row, &pred("id", CompareOp::Eq, Literal::String("1".to_string()))));
        assert!(evaluate_predicate(&row, &pred("code", CompareOp::Eq, Literal::Number(7.0))));
        assert!(evaluate_predicate(&row, &pred("name", CompareOp::Eq, Literal::String("Bob".to_string()))));
        assert!(!evaluate_predicate(&row, &pred("name", CompareOp::Eq, Literal::Number(0.0))));
        assert!(!evaluate_predicate(&row, &pred("flag", CompareOp::Eq, Literal::Number(0.0))));
        assert!(evaluate_predicate(&row, &pred("name", CompareOp::NotEq, Literal::String("Al".to_string()))));
        assert!(evaluate_predicate(&row, &pred("missing", CompareOp::NotEq, Literal::String("x".to_string()))));
    }

    #[test]
    fn test_nested_column_lookup() {
        let row = json!({"address": {"city": "Paris"}});
        assert!(evaluate_predicate(
            &row,
            &pred("address.city", CompareOp::Eq, Literal::String("Paris".to_string()))
        ));
    }

    #[test]
    fn test_fail_open_on_non_object_rows() {
        let p = pred("age", CompareOp::Gt, Literal::Number(100.0));
        assert!(try_evaluate_predicate(&json!(null), &p).is_err());
        assert!(evaluate_predicate(&json!(null), &p));
        assert!(evaluate_predicate(&json!("text"), &p));
    }

    #[test]
    fn test_strip_qualifier() {
        assert_eq!(strip_qualifier("users.id", "users"), Some("id"));
        assert_eq!(strip_qualifier("USERS.id", "users"), Some("id"));
        assert_eq!(strip_qualifier("sales.total", "sales.csv"), Some("total"));
        assert_eq!(strip_qualifier("sales.csv.total", "sales.csv"), Some("total"));
        assert_eq!(strip_qualifier("orders.id", "users"), None);
        assert_eq!(strip_qualifier("id", "users"), None);
        assert_eq!(strip_qualifier("users.", "users"), None);
    }
}
