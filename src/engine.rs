//! Configured entry point to the engine.
//!
//! `Engine` bundles an `EngineConfig` with the pure operations of the crate.
//! Each call takes its inputs by reference and returns fresh results; no
//! state is kept between calls.

use serde_json::Value;

use crate::aggregate::{self, AggOp};
use crate::combine::{self, CombineMode, NamedDataset};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::executor::{NoTables, QueryExecutor, SourceTables, TableResolver};
use crate::flatten;
use crate::regression::{self, RegressionKind, RegressionModel};
use crate::stats::{self, ColumnInfo, ColumnStats};
use crate::value::Dataset;

/// Query and statistics engine.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with custom settings.
    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Expand nested objects and arrays into dot/bracket keys.
    pub fn flatten(&self, rows: &[Value]) -> Dataset {
        flatten::flatten(rows)
    }

    /// Group by one column and reduce another.
    pub fn aggregate(
        &self,
        rows: &[Value],
        group_by: &str,
        value_col: Option<&str>,
        op: AggOp,
    ) -> EngineResult<Dataset> {
        aggregate::aggregate(rows, group_by, value_col, op)
    }

    /// Run a query against a single dataset.
    pub fn execute_query(&self, rows: &[Value], query: &str) -> EngineResult<Dataset> {
        self.execute_with(&NoTables, rows, query)
    }

    /// Run a query where `data`/`combined` name `default_rows` and any other
    /// table name is looked up among `sources`.
    pub fn execute_multi_source_query(
        &self,
        sources: &[NamedDataset],
        default_rows: &[Value],
        query: &str,
    ) -> EngineResult<Dataset> {
        self.execute_with(&SourceTables(sources), default_rows, query)
    }

    /// Run a query with a caller-supplied table resolver.
    pub fn execute_with<R: TableResolver + ?Sized>(
        &self,
        resolver: &R,
        rows: &[Value],
        query: &str,
    ) -> EngineResult<Dataset> {
        QueryExecutor::with_default_tables(resolver, self.config.default_tables.clone())
            .execute(query, rows)
    }

    pub fn combine(
        &self,
        sources: &[NamedDataset],
        mode: CombineMode,
        join_keys: Option<&[String]>,
    ) -> EngineResult<Dataset> {
        combine::combine(sources, mode, join_keys)
    }

    pub fn describe(&self, rows: &[Value]) -> EngineResult<Vec<ColumnStats>> {
        stats::describe(rows, &self.config)
    }

    pub fn info(&self, rows: &[Value]) -> EngineResult<Vec<ColumnInfo>> {
        stats::info(rows, &self.config)
    }

    /// Fit a curve and sample it across the observed x range.
    pub fn fit(&self, points: &[(f64, f64)], kind: RegressionKind) -> Vec<(f64, f64)> {
        regression::fit_with_samples(points, kind, self.config.curve_samples)
    }

    /// Fit a model without sampling it.
    pub fn fit_model(&self, points: &[(f64, f64)], kind: RegressionKind) -> EngineResult<RegressionModel> {
        regression::fit_model(points, kind)
    }
}
