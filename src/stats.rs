//! Column statistics: `describe` (numeric summaries and categorical
//! profiles) and `info` (type tags, null counts, samples).

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::flatten::flatten;
use crate::value::{numeric_value, to_display_string, type_name, Dataset, Row};

/// Summary of one column produced by `describe`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    #[serde(flatten)]
    pub summary: ColumnSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnSummary {
    Numeric {
        count: usize,
        mean: f64,
        std: f64,
        min: f64,
        q1: f64,
        median: f64,
        q3: f64,
        max: f64,
    },
    Categorical {
        count: usize,
        unique: usize,
        examples: Vec<Value>,
    },
}

/// Profile of one column produced by `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub column: String,
    /// `null`, a single type name, or a `|`-joined union of type names
    #[serde(rename = "type")]
    pub type_tag: String,
    pub non_null_count: usize,
    /// Longest string length; absent when the column holds no strings
    pub max_length: Option<usize>,
    pub samples: Vec<Value>,
}

/// Object rows of the dataset, flattened first when nested access is on.
fn prepare_rows(rows: &[Value], config: &EngineConfig) -> EngineResult<Dataset> {
    if rows.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    Ok(if config.nested_access {
        flatten(rows)
    } else {
        rows.to_vec()
    })
}

/// Union of keys across all object rows, in first-seen order.
fn column_names(rows: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for row in rows.iter().filter_map(Value::as_object) {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.clone());
            }
        }
    }
    names
}

fn non_null_values<'a>(rows: &'a [Value], column: &str) -> Vec<&'a Value> {
    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row: &Row| row.get(column))
        .filter(|v| !v.is_null())
        .collect()
}

/// Linear-interpolated quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn numeric_summary(values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    // Sample standard deviation; a single value has no spread.
    let std = if count > 1 {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };

    ColumnSummary::Numeric {
        count,
        mean,
        std,
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    }
}

fn categorical_summary(values: &[&Value], max_examples: usize) -> ColumnSummary {
    let mut distinct = HashSet::new();
    let mut examples = Vec::new();

    for value in values {
        let text = to_display_string(value);
        if distinct.insert(text.clone()) && examples.len() < max_examples {
            examples.push(match value {
                Value::Array(_) | Value::Object(_) => (*value).clone(),
                _ => Value::String(text),
            });
        }
    }

    ColumnSummary::Categorical {
        count: values.len(),
        unique: distinct.len(),
        examples,
    }
}

/// Summarize every column.
///
/// A column is numeric when it has at least one non-null value and every
/// non-null value has a numeric reading; otherwise it is categorical.
pub fn describe(rows: &[Value], config: &EngineConfig) -> EngineResult<Vec<ColumnStats>> {
    let rows = prepare_rows(rows, config)?;
    let columns = column_names(&rows);
    tracing::debug!(rows = rows.len(), columns = columns.len(), "describing dataset");

    let stats = columns
        .into_iter()
        .map(|column| {
            let values = non_null_values(&rows, &column);
            let numbers: Vec<f64> = values.iter().filter_map(|v| numeric_value(v)).collect();

            let summary = if !values.is_empty() && numbers.len() == values.len() {
                numeric_summary(&numbers)
            } else {
                categorical_summary(&values, config.max_example_values)
            };
            ColumnStats { column, summary }
        })
        .collect();

    Ok(stats)
}

/// Profile every column: type tag, non-null count, longest string and a
/// few sample values.
pub fn info(rows: &[Value], config: &EngineConfig) -> EngineResult<Vec<ColumnInfo>> {
    let rows = prepare_rows(rows, config)?;
    let columns = column_names(&rows);
    tracing::debug!(rows = rows.len(), columns = columns.len(), "profiling dataset");

    let infos = columns
        .into_iter()
        .map(|column| {
            let values = non_null_values(&rows, &column);

            let mut types: Vec<&'static str> = Vec::new();
            for value in &values {
                let name = type_name(value);
                if !types.contains(&name) {
                    types.push(name);
                }
            }
            let type_tag = if types.is_empty() {
                "null".to_string()
            } else {
                types.join("|")
            };

            let max_length = values
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.chars().count())
                .max();

            let samples = values
                .iter()
                .take(config.max_sample_values)
                .map(|v| (*v).clone())
                .collect();

            ColumnInfo {
                column,
                type_tag,
                non_null_count: values.len(),
                max_length,
                samples,
            }
        })
        .collect();

    Ok(infos)
}
