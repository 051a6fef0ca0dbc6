//! Grouped aggregation.
//!
//! Rows are bucketed by a `GroupKey` (the `|`-joined display strings of the
//! grouping columns) and a numeric column is reduced per bucket. Groups are
//! always emitted in ascending locale order of their key; chart axes built
//! from the output depend on that order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::value::{get_column, locale_compare, number_value, numeric_value, to_display_string, Dataset, Row};

/// Aggregate operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggOp {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggOp {
    /// Reduce a set of numeric values. An empty set reduces to 0.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            AggOp::Sum => values.iter().sum(),
            AggOp::Avg => values.iter().sum::<f64>() / values.len() as f64,
            AggOp::Count => values.len() as f64,
            AggOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            AggOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// SQL spelling of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            AggOp::Sum => "SUM",
            AggOp::Avg => "AVG",
            AggOp::Count => "COUNT",
            AggOp::Min => "MIN",
            AggOp::Max => "MAX",
        }
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for AggOp {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggOp::Sum),
            "AVG" | "AVERAGE" | "MEAN" => Ok(AggOp::Avg),
            "COUNT" => Ok(AggOp::Count),
            "MIN" => Ok(AggOp::Min),
            "MAX" => Ok(AggOp::Max),
            other => Err(EngineError::ParseError(format!(
                "Unknown aggregate function: {}",
                other
            ))),
        }
    }
}

/// Identity of an aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(String);

impl GroupKey {
    /// Build the key for a row from one or more grouping columns.
    pub fn for_row(row: &Row, columns: &[String]) -> Self {
        let parts: Vec<String> = columns
            .iter()
            .map(|col| to_display_string(get_column(row, col).unwrap_or(&Value::Null)))
            .collect();
        GroupKey(parts.join("|"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        locale_compare(&self.0, &other.0)
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Rows sharing one group key, in input order.
#[derive(Debug)]
pub struct Group<'a> {
    pub key: GroupKey,
    pub rows: Vec<&'a Row>,
}

impl Group<'_> {
    /// Value of a column in the first row of the group.
    pub fn first_value(&self, column: &str) -> Value {
        self.rows
            .first()
            .and_then(|row| get_column(row, column))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Numeric readings of a column across the group; non-numeric values are skipped.
    pub fn numeric_values(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| get_column(row, column))
            .filter_map(numeric_value)
            .collect()
    }
}

/// Partition rows by the given columns, sorted ascending by group key.
pub fn group_rows<'a, I>(rows: I, columns: &[String]) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut buckets: HashMap<GroupKey, Vec<&'a Row>> = HashMap::new();
    for row in rows {
        buckets
            .entry(GroupKey::for_row(row, columns))
            .or_default()
            .push(row);
    }

    let mut groups: Vec<Group<'a>> = buckets
        .into_iter()
        .map(|(key, rows)| Group { key, rows })
        .collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

/// Group `rows` by `group_by` and reduce `value_col` with `op`.
///
/// Each output row carries the grouping column, a `value` field and, when a
/// value column is named, the same result again under that column's name.
/// With no value column only `Count` is meaningful and counts rows.
pub fn aggregate(
    rows: &[Value],
    group_by: &str,
    value_col: Option<&str>,
    op: AggOp,
) -> EngineResult<Dataset> {
    if rows.is_empty() {
        return Err(EngineError::EmptyDataset);
    }

    // Rows without the grouping column fall into a null group.
    let objects: Vec<&Row> = rows.iter().filter_map(Value::as_object).collect();

    let value_col = value_col.filter(|c| !c.is_empty());
    let columns = [group_by.to_string()];
    let groups = group_rows(objects, &columns);

    tracing::debug!(
        group_by,
        value_col = value_col.unwrap_or("-"),
        op = %op,
        groups = groups.len(),
        "aggregating"
    );

    let results = groups
        .iter()
        .map(|group| {
            let result = match value_col {
                None if op == AggOp::Count => group.rows.len() as f64,
                None => 0.0,
                Some(col) => op.reduce(&group.numeric_values(col)),
            };

            let mut out = Row::new();
            out.insert(group_by.to_string(), group.first_value(group_by));
            out.insert("value".to_string(), number_value(result));
            if let Some(col) = value_col {
                out.insert(col.to_string(), number_value(result));
            }
            Value::Object(out)
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Value> {
        vec![
            json!({"g": "a", "v": 1}),
            json!({"g": "a", "v": 3}),
            json!({"g": "b", "v": 5}),
        ]
    }

    #[test]
    fn test_sum_by_group() {
        let result = aggregate(&sample(), "g", Some("v"), AggOp::Sum).unwrap();
        assert_eq!(
            result,
            vec![
                json!({"g": "a", "value": 4, "v": 4}),
                json!({"g": "b", "value": 5, "v": 5}),
            ]
        );
    }

    #[test]
    fn test_count_without_value_column() {
        let result = aggregate(&sample(), "g", None, AggOp::Count).unwrap();
        assert_eq!(
            result,
            vec![json!({"g": "a", "value": 2}), json!({"g": "b", "value": 1})]
        );
    }

    #[test]
    fn test_avg_min_max() {
        let avg = aggregate(&sample(), "g", Some("v"), AggOp::Avg).unwrap();
        assert_eq!(avg[0]["value"], json!(2));

        let min = aggregate(&sample(), "g", Some("v"), AggOp::Min).unwrap();
        assert_eq!(min[0]["value"], json!(1));

        let max = aggregate(&sample(), "g", Some("v"), AggOp::Max).unwrap();
        assert_eq!(max[0]["value"], json!(3));
    }

    #[test]
    fn test_non_numeric_values_are_excluded() {
        let rows = vec![
            json!({"g": "x", "v": "10"}),
            json!({"g": "x", "v": "n/a"}),
            json!({"g": "x", "v": null}),
            json!({"g": "y", "v": "oops"}),
        ];
        let result = aggregate(&rows, "g", Some("v"), AggOp::Sum).unwrap();
        assert_eq!(result[0]["value"], json!(10));
        // Empty numeric set reduces to zero.
        assert_eq!(result[1]["value"], json!(0));
    }

    #[test]
    fn test_groups_sorted_by_locale() {
        let rows = vec![
            json!({"g": "beta", "v": 1}),
            json!({"g": "Alpha", "v": 1}),
            json!({"g": "alpha", "v": 1}),
            json!({"g": "Gamma", "v": 1}),
        ];
        let result = aggregate(&rows, "g", None, AggOp::Count).unwrap();
        let keys: Vec<&str> = result.iter().map(|r| r["g"].as_str().unwrap()).collect();
        assert_eq!(keys, vec!["alpha", "Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn test_numeric_group_keys_keep_original_value() {
        let rows = vec![json!({"year": 2021, "v": 1}), json!({"year": 2020, "v": 2})];
        let result = aggregate(&rows, "year", Some("v"), AggOp::Sum).unwrap();
        assert_eq!(result[0]["year"], json!(2020));
        assert_eq!(result[1]["year"], json!(2021));
    }

    #[test]
    fn test_empty_dataset() {
        assert_eq!(
            aggregate(&[], "g", None, AggOp::Count),
            Err(EngineError::EmptyDataset)
        );
    }

    #[test]
    fn test_missing_group_column_forms_null_group() {
        assert_eq!(
            aggregate(&sample(), "nope", Some("v"), AggOp::Sum).unwrap(),
            vec![json!({"nope": null, "value": 9, "v": 9})]
        );

        let mut rows = sample();
        rows.push(json!({"v": 10}));
        let result = aggregate(&rows, "g", None, AggOp::Count).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result.iter().any(|r| r["g"].is_null() && r["value"] == json!(1)));
    }

    #[test]
    fn test_agg_op_from_str() {
        assert_eq!("sum".parse::<AggOp>().unwrap(), AggOp::Sum);
        assert_eq!("AVG".parse::<AggOp>().unwrap(), AggOp::Avg);
        assert!("median".parse::<AggOp>().is_err());
    }

    #[test]
    fn test_multi_column_group_key() {
        let row = json!({"a": "x", "b": 2});
        let key = GroupKey::for_row(row.as_object().unwrap(), &["a".to_string(), "b".to_string()]);
        assert_eq!(key.as_str(), "x|2");
    }
}
