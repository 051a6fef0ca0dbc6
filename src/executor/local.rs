//! Local executor for SQL queries.
//!
//! Executes parsed SELECT statements over in-memory rows. Clauses run in a
//! fixed order: table resolution, JOIN, WHERE, GROUP BY (or whole-table
//! aggregation), projection, LIMIT.

use serde_json::Value;

use crate::aggregate::{group_rows, AggOp};
use crate::error::{EngineError, EngineResult};
use crate::sql::{
    parse, AggregateArg, JoinClause, JoinType, LimitClause, SelectColumn, SelectStatement,
    Statement,
};
use crate::value::{get_column, loose_equals, number_value, numeric_value, Dataset, Row};

use super::helpers::*;
use super::{TableResolver, DEFAULT_TABLES};

/// Which side of a join a column reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Local executor for SQL queries.
///
/// Executes queries against a default dataset plus any tables the resolver
/// can supply.
pub struct QueryExecutor<'r, R: TableResolver + ?Sized> {
    resolver: &'r R,
    default_tables: Vec<String>,
}

impl<'r, R: TableResolver + ?Sized> QueryExecutor<'r, R> {
    /// Create a new executor with the given resolver.
    pub fn new(resolver: &'r R) -> Self {
        Self {
            resolver,
            default_tables: DEFAULT_TABLES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a new executor with custom names for the default dataset.
    pub fn with_default_tables(resolver: &'r R, default_tables: Vec<String>) -> Self {
        Self {
            resolver,
            default_tables,
        }
    }

    /// Execute a query string against `data`.
    ///
    /// Text that is not a SELECT returns `data` unchanged. Malformed text is
    /// an error even when `data` is empty; a valid query on empty data
    /// returns no rows.
    pub fn execute(&self, query: &str, data: &[Value]) -> EngineResult<Dataset> {
        let statement = parse(query)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        self.execute_statement(&statement, data)
    }

    /// Execute a parsed statement against `data`.
    pub fn execute_statement(&self, statement: &Statement, data: &[Value]) -> EngineResult<Dataset> {
        match statement {
            Statement::Passthrough => Ok(data.to_vec()),
            Statement::Select(select) => self.execute_select(select, data),
        }
    }

    fn execute_select(&self, stmt: &SelectStatement, data: &[Value]) -> EngineResult<Dataset> {
        let mut rows = match &stmt.join {
            Some(join) => self.execute_join(&stmt.from, join, data)?,
            None => self.resolve_from(&stmt.from, data),
        };

        if let Some(predicate) = &stmt.where_clause {
            rows.retain(|row| evaluate_predicate(row, predicate));
        }

        let mut results = if !stmt.group_by.is_empty() {
            apply_group_by(&rows, &stmt.group_by, &stmt.columns)
        } else if stmt.has_aggregates() {
            apply_aggregate_all(&rows, &stmt.columns)
        } else {
            apply_projection(rows, &stmt.columns)
        };

        if let Some(limit) = &stmt.limit {
            results = apply_limit(results, limit);
        }

        tracing::debug!(rows = results.len(), table = %stmt.from, "query executed");
        Ok(results)
    }

    fn is_default_table(&self, name: &str) -> bool {
        self.default_tables
            .iter()
            .any(|table| table.eq_ignore_ascii_case(name))
    }

    /// FROM without a join: unknown tables fall back to the default dataset.
    fn resolve_from(&self, name: &str, data: &[Value]) -> Dataset {
        if self.is_default_table(name) {
            return data.to_vec();
        }
        match self.resolver.resolve(name) {
            Some(rows) => rows,
            None => {
                tracing::debug!(table = name, "unknown table; using default dataset");
                data.to_vec()
            }
        }
    }

    /// Tables taking part in a join must exist.
    fn resolve_table(&self, name: &str, data: &[Value]) -> EngineResult<Dataset> {
        if self.is_default_table(name) {
            return Ok(data.to_vec());
        }
        self.resolver
            .resolve(name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))
    }

    fn execute_join(&self, from: &str, join: &JoinClause, data: &[Value]) -> EngineResult<Dataset> {
        let left = self.resolve_table(from, data)?;
        let right = self.resolve_table(&join.table, data)?;
        let (left_key, right_key) = join_keys(from, &join.table, join);

        let left_rows: Vec<&Row> = left.iter().filter_map(Value::as_object).collect();
        let right_rows: Vec<&Row> = right.iter().filter_map(Value::as_object).collect();
        let left_columns = column_set(&left_rows);
        let right_columns = column_set(&right_rows);

        let merger = JoinMerger {
            left_table: from,
            right_table: &join.table,
            left_columns: &left_columns,
            right_columns: &right_columns,
        };

        let keys_equal = |l: &Row, r: &Row| -> bool {
            match (get_column(l, left_key), get_column(r, right_key)) {
                (Some(a), Some(b)) => !a.is_null() && !b.is_null() && loose_equals(a, b),
                _ => false,
            }
        };

        let mut results = Vec::new();
        match join.join_type {
            JoinType::Inner | JoinType::Left => {
                for &l in &left_rows {
                    let mut matched = false;
                    for &r in right_rows.iter().filter(|&&r| keys_equal(l, r)) {
                        matched = true;
                        results.push(Value::Object(merger.merge(Some(l), Some(r))));
                    }
                    if !matched && join.join_type == JoinType::Left {
                        results.push(Value::Object(merger.merge(Some(l), None)));
                    }
                }
            }
            JoinType::Right => {
                for &r in &right_rows {
                    let mut matched = false;
                    for &l in left_rows.iter().filter(|&&l| keys_equal(l, r)) {
                        matched = true;
                        results.push(Value::Object(merger.merge(Some(l), Some(r))));
                    }
                    if !matched {
                        results.push(Value::Object(merger.merge(None, Some(r))));
                    }
                }
            }
        }

        tracing::debug!(
            left = left_rows.len(),
            right = right_rows.len(),
            joined = results.len(),
            join_type = ?join.join_type,
            "join executed"
        );
        Ok(results)
    }
}

/// Work out which ON operand reads which table. Qualified operands go to the
/// table they name; unqualified ones are taken positionally.
fn join_keys<'j>(left_table: &str, right_table: &str, join: &'j JoinClause) -> (&'j str, &'j str) {
    let classify = |operand: &'j str, default: Side| -> (Side, &'j str) {
        if let Some(col) = strip_qualifier(operand, left_table) {
            (Side::Left, col)
        } else if let Some(col) = strip_qualifier(operand, right_table) {
            (Side::Right, col)
        } else {
            (default, operand)
        }
    };

    let first = classify(join.left_column.as_str(), Side::Left);
    let second = classify(join.right_column.as_str(), Side::Right);

    match (first, second) {
        ((Side::Right, r), (Side::Left, l)) => (l, r),
        ((_, l), (_, r)) => (l, r),
    }
}

/// Union of keys across rows, in first-seen order.
fn column_set(rows: &[&Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

struct JoinMerger<'a> {
    left_table: &'a str,
    right_table: &'a str,
    left_columns: &'a [String],
    right_columns: &'a [String],
}

impl JoinMerger<'_> {
    /// Every column appears as `table.column`; the bare name is also set,
    /// with the left side winning collisions. A missing side contributes
    /// nulls for its columns.
    fn merge(&self, left: Option<&Row>, right: Option<&Row>) -> Row {
        let mut out = Row::new();
        write_side(&mut out, self.left_table, self.left_columns, left);
        write_side(&mut out, self.right_table, self.right_columns, right);
        out
    }
}

fn write_side(out: &mut Row, table: &str, columns: &[String], row: Option<&Row>) {
    let mut put = |col: &str, value: &Value| {
        out.insert(format!("{}.{}", table, col), value.clone());
        out.entry(col.to_string()).or_insert_with(|| value.clone());
    };

    match row {
        Some(row) => row.iter().for_each(|(col, value)| put(col.as_str(), value)),
        None => columns.iter().for_each(|col| put(col.as_str(), &Value::Null)),
    }
}

fn apply_group_by(rows: &[Value], group_by: &[String], columns: &[SelectColumn]) -> Dataset {
    let objects: Vec<&Row> = rows.iter().filter_map(Value::as_object).collect();
    let groups = group_rows(objects, group_by);

    groups
        .iter()
        .map(|group| {
            let mut out = Row::new();
            for col in group_by {
                out.insert(col.clone(), group.first_value(col));
            }
            project_group(&mut out, &group.rows, columns);
            Value::Object(out)
        })
        .collect()
}

/// Aggregates with no GROUP BY collapse the whole table into one row.
fn apply_aggregate_all(rows: &[Value], columns: &[SelectColumn]) -> Dataset {
    let objects: Vec<&Row> = rows.iter().filter_map(Value::as_object).collect();
    if objects.is_empty() {
        return Vec::new();
    }

    let mut out = Row::new();
    project_group(&mut out, &objects, columns);
    vec![Value::Object(out)]
}

fn project_group(out: &mut Row, rows: &[&Row], columns: &[SelectColumn]) {
    for item in columns {
        match item {
            SelectColumn::Star => {}
            SelectColumn::Column { name, .. } => {
                let value = rows
                    .first()
                    .and_then(|row| get_column(row, name))
                    .cloned()
                    .unwrap_or(Value::Null);
                out.insert(item.output_name(), value);
            }
            SelectColumn::Aggregate {
                function, argument, ..
            } => {
                out.insert(item.output_name(), compute_aggregate(*function, argument, rows));
            }
        }
    }
}

fn compute_aggregate(function: AggOp, argument: &AggregateArg, rows: &[&Row]) -> Value {
    let result = match (function, argument) {
        (AggOp::Count, AggregateArg::Star) => rows.len() as f64,
        (AggOp::Count, AggregateArg::Column(col)) => rows
            .iter()
            .filter(|row| get_column(row, col).is_some_and(|v| !v.is_null()))
            .count() as f64,
        (_, AggregateArg::Star) => 0.0,
        (op, AggregateArg::Column(col)) => {
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| get_column(row, col))
                .filter_map(numeric_value)
                .collect();
            op.reduce(&values)
        }
    };
    number_value(result)
}

fn apply_projection(rows: Dataset, columns: &[SelectColumn]) -> Dataset {
    if columns.iter().all(|c| matches!(c, SelectColumn::Star)) {
        return rows;
    }

    rows.iter()
        .filter_map(Value::as_object)
        .map(|row| {
            let mut out = Row::new();
            for item in columns {
                match item {
                    SelectColumn::Star => {
                        for (key, value) in row {
                            out.insert(key.clone(), value.clone());
                        }
                    }
                    SelectColumn::Column { name, .. } => {
                        if let Some(value) = get_column(row, name) {
                            out.insert(item.output_name(), value.clone());
                        }
                    }
                    SelectColumn::Aggregate { .. } => {}
                }
            }
            Value::Object(out)
        })
        .collect()
}

fn apply_limit(rows: Dataset, limit: &LimitClause) -> Dataset {
    rows.into_iter()
        .skip(limit.offset)
        .take(limit.count)
        .collect()
}
