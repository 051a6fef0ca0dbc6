//! Executor module for SQL queries.
//!
//! Runs parsed statements against an in-memory default dataset, resolving
//! other table names through any type implementing `TableResolver`.

mod helpers;
mod local;

pub use helpers::*;
pub use local::QueryExecutor;

use crate::combine::{find_source, NamedDataset};
use crate::value::Dataset;

/// Table names that always refer to the dataset passed to the executor.
pub const DEFAULT_TABLES: &[&str] = &["data", "combined"];

/// Trait for anything that can supply a table by name.
///
/// Implement this trait to let JOIN and FROM clauses reach datasets other
/// than the one being queried.
pub trait TableResolver {
    /// Look up a table by the name used in the query.
    ///
    /// # Returns
    /// The table's rows if known, None otherwise
    fn resolve(&self, name: &str) -> Option<Dataset>;
}

/// Resolver that knows no tables. Only the default dataset is reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl TableResolver for NoTables {
    fn resolve(&self, _name: &str) -> Option<Dataset> {
        None
    }
}

/// Resolver over a list of named sources, matched by file name with or
/// without extension.
#[derive(Debug, Clone, Copy)]
pub struct SourceTables<'a>(pub &'a [NamedDataset]);

impl TableResolver for SourceTables<'_> {
    fn resolve(&self, name: &str) -> Option<Dataset> {
        find_source(self.0, name).map(|source| source.rows.clone())
    }
}

impl<F> TableResolver for F
where
    F: Fn(&str) -> Option<Dataset>,
{
    fn resolve(&self, name: &str) -> Option<Dataset> {
        self(name)
    }
}
