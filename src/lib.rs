//! rowql - Embedded analytical query and statistics engine.
//!
//! This crate runs a small SQL subset, grouped aggregation, multi-source
//! combination, column statistics and curve fitting over in-memory rows.
//! Rows are JSON objects; loading and serializing files is left to the caller
//! (the `rowql` binary does it for JSON and CSV).
//!
//! # Main Components
//!
//! - **Flattener**: Expands nested objects and arrays into dot/bracket keys
//! - **SQL**: Lexer and parser for `SELECT ... FROM ... [JOIN] [WHERE] [GROUP BY] [LIMIT]`
//! - **Executor**: Runs parsed statements, resolving tables through `TableResolver`
//! - **Aggregate / Combine / Stats / Regression**: the analytical operators
//!
//! # Example
//!
//! ```rust
//! use rowql::execute_query;
//! use serde_json::json;
//!
//! let rows = vec![
//!     json!({"city": "Paris", "sales": 10}),
//!     json!({"city": "Lyon", "sales": 4}),
//!     json!({"city": "Paris", "sales": 6}),
//! ];
//!
//! let result = execute_query(&rows, "SELECT city, SUM(sales) AS total FROM data GROUP BY city").unwrap();
//! assert_eq!(
//!     result,
//!     vec![json!({"city": "Lyon", "total": 4}), json!({"city": "Paris", "total": 16})]
//! );
//! ```

pub mod aggregate;
pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod flatten;
pub mod regression;
pub mod sql;
pub mod stats;
pub mod value;

// Re-export main types for convenience
pub use aggregate::{AggOp, GroupKey};
pub use combine::{CombineMode, NamedDataset, NamedDatasets, SOURCE_FILE_COLUMN, SOURCE_PATH_COLUMN};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use executor::{NoTables, QueryExecutor, SourceTables, TableResolver};
pub use regression::{RegressionKind, RegressionModel};
pub use sql::{parse, Statement};
pub use stats::{ColumnInfo, ColumnStats, ColumnSummary};
pub use value::{Dataset, Row};

use serde_json::Value;

/// Flatten every row of a dataset.
pub fn flatten(rows: &[Value]) -> Dataset {
    flatten::flatten(rows)
}

/// Group `rows` by `group_by` and reduce `value_col` with `op`.
pub fn aggregate(
    rows: &[Value],
    group_by: &str,
    value_col: Option<&str>,
    op: AggOp,
) -> EngineResult<Dataset> {
    Engine::default().aggregate(rows, group_by, value_col, op)
}

/// Run a query against a single dataset.
pub fn execute_query(rows: &[Value], query: &str) -> EngineResult<Dataset> {
    Engine::default().execute_query(rows, query)
}

/// Run a query that may JOIN across named sources.
pub fn execute_multi_source_query(
    sources: &[NamedDataset],
    default_rows: &[Value],
    query: &str,
) -> EngineResult<Dataset> {
    Engine::default().execute_multi_source_query(sources, default_rows, query)
}

/// Combine named sources by union, intersection or key join.
pub fn combine(
    sources: &[NamedDataset],
    mode: CombineMode,
    join_keys: Option<&[String]>,
) -> EngineResult<Dataset> {
    Engine::default().combine(sources, mode, join_keys)
}

/// Per-column summary statistics.
pub fn describe(rows: &[Value]) -> EngineResult<Vec<ColumnStats>> {
    Engine::default().describe(rows)
}

/// Per-column type and sample information.
pub fn info(rows: &[Value]) -> EngineResult<Vec<ColumnInfo>> {
    Engine::default().info(rows)
}

/// Fit a regression curve and sample it across the observed x range.
pub fn fit(points: &[(f64, f64)], kind: RegressionKind) -> Vec<(f64, f64)> {
    Engine::default().fit(points, kind)
}

/// Fit a regression model.
pub fn fit_model(points: &[(f64, f64)], kind: RegressionKind) -> EngineResult<RegressionModel> {
    Engine::default().fit_model(points, kind)
}
