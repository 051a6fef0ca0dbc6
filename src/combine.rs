//! Multi-source combination: union, intersection and key join across named
//! datasets, plus the table lookup used to resolve SQL table references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::value::{get_column, loose_equals, Dataset, Row};

/// Provenance column holding the source's file name
pub const SOURCE_FILE_COLUMN: &str = "_sourceFile";
/// Provenance column holding the source's path
pub const SOURCE_PATH_COLUMN: &str = "_sourceFilePath";

/// A dataset tagged with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedDataset {
    /// File name, possibly with extension (e.g. `sales.csv`)
    pub name: String,
    /// Full path of the source, when known
    pub path: Option<String>,
    pub rows: Dataset,
}

impl NamedDataset {
    pub fn new(name: impl Into<String>, rows: Dataset) -> Self {
        Self {
            name: name.into(),
            path: None,
            rows,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Name with the extension stripped; this is what SQL refers to.
    pub fn table_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) if pos > 0 => &self.name[..pos],
            _ => &self.name,
        }
    }

    /// Path reported in provenance columns (falls back to the name).
    pub fn source_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    /// Whether a bare table reference names this source, with or without
    /// extension, ignoring case.
    pub fn matches(&self, reference: &str) -> bool {
        self.name.eq_ignore_ascii_case(reference) || self.table_name().eq_ignore_ascii_case(reference)
    }
}

/// Ordered collection of named sources.
pub type NamedDatasets = Vec<NamedDataset>;

/// Find the first source matching a table reference.
pub fn find_source<'a>(sources: &'a [NamedDataset], reference: &str) -> Option<&'a NamedDataset> {
    sources.iter().find(|source| source.matches(reference))
}

/// How sources are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    Union,
    Intersection,
    Join,
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CombineMode::Union => "union",
            CombineMode::Intersection => "intersection",
            CombineMode::Join => "join",
        };
        f.write_str(name)
    }
}

impl FromStr for CombineMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "union" => Ok(CombineMode::Union),
            "intersection" | "intersect" => Ok(CombineMode::Intersection),
            "join" => Ok(CombineMode::Join),
            other => Err(EngineError::ParseError(format!(
                "Unknown combine mode: {}",
                other
            ))),
        }
    }
}

/// Combine several sources into one dataset.
pub fn combine(
    sources: &[NamedDataset],
    mode: CombineMode,
    join_keys: Option<&[String]>,
) -> EngineResult<Dataset> {
    tracing::debug!(sources = sources.len(), mode = %mode, "combining sources");

    match mode {
        CombineMode::Union => Ok(union(sources)),
        CombineMode::Intersection => Ok(intersection(sources)),
        CombineMode::Join => {
            let keys = join_keys.unwrap_or_default();
            if keys.is_empty() {
                return Err(EngineError::JoinKey);
            }
            Ok(join_on_keys(sources, keys))
        }
    }
}

fn with_provenance(row: &Value, source: &NamedDataset) -> Row {
    let mut out = match row {
        Value::Object(obj) => obj.clone(),
        other => {
            let mut wrapped = Row::new();
            wrapped.insert("value".to_string(), other.clone());
            wrapped
        }
    };
    out.insert(SOURCE_FILE_COLUMN.to_string(), Value::String(source.name.clone()));
    out.insert(
        SOURCE_PATH_COLUMN.to_string(),
        Value::String(source.source_path().to_string()),
    );
    out
}

fn union(sources: &[NamedDataset]) -> Dataset {
    sources
        .iter()
        .flat_map(|source| {
            source
                .rows
                .iter()
                .map(move |row| Value::Object(with_provenance(row, source)))
        })
        .collect()
}

/// Columns present in the first row of every source, in the first source's order.
fn common_columns(sources: &[NamedDataset]) -> Vec<String> {
    let first_keys = |source: &NamedDataset| -> Vec<String> {
        source
            .rows
            .first()
            .and_then(Value::as_object)
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default()
    };

    let Some((head, rest)) = sources.split_first() else {
        return Vec::new();
    };

    let others: Vec<Vec<String>> = rest.iter().map(first_keys).collect();
    first_keys(head)
        .into_iter()
        .filter(|col| others.iter().all(|keys| keys.contains(col)))
        .collect()
}

fn intersection(sources: &[NamedDataset]) -> Dataset {
    let common = common_columns(sources);
    tracing::debug!(columns = ?common, "common columns");

    let mut results = Vec::new();
    for source in sources {
        for row in &source.rows {
            let mut out = Row::new();
            if let Value::Object(obj) = row {
                for col in &common {
                    if let Some(value) = obj.get(col) {
                        out.insert(col.clone(), value.clone());
                    }
                }
            }
            out.insert(SOURCE_FILE_COLUMN.to_string(), Value::String(source.name.clone()));
            out.insert(
                SOURCE_PATH_COLUMN.to_string(),
                Value::String(source.source_path().to_string()),
            );
            results.push(Value::Object(out));
        }
    }
    results
}

fn keys_match(left: &Row, right: &Row, keys: &[String]) -> bool {
    keys.iter().all(|key| match (get_column(left, key), get_column(right, key)) {
        (Some(a), Some(b)) => !a.is_null() && loose_equals(a, b),
        _ => false,
    })
}

/// Left-join every further source onto the first one. For each base row the
/// first matching row of a source is merged in; colliding columns from the
/// incoming source are renamed `col_<source>`.
fn join_on_keys(sources: &[NamedDataset], keys: &[String]) -> Dataset {
    let Some((base, others)) = sources.split_first() else {
        return Vec::new();
    };

    // Non-object base rows are carried through unchanged.
    let mut results: Dataset = base.rows.clone();

    for source in others {
        let candidates: Vec<&Row> = source.rows.iter().filter_map(Value::as_object).collect();
        let mut matched = 0usize;

        for row in results.iter_mut().filter_map(Value::as_object_mut) {
            let Some(found) = candidates.iter().find(|cand| keys_match(row, cand, keys)) else {
                continue;
            };
            matched += 1;

            for (col, value) in found.iter() {
                if keys.contains(col) {
                    continue;
                }
                if row.contains_key(col) {
                    row.insert(format!("{}_{}", col, source.table_name()), value.clone());
                } else {
                    row.insert(col.clone(), value.clone());
                }
            }
        }

        tracing::debug!(source = %source.name, matched, "joined source");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sources() -> NamedDatasets {
        vec![
            NamedDataset::new("users.csv", vec![json!({"id": 1, "name": "Alice"}), json!({"id": 2, "name": "Bob"})])
                .with_path("/data/users.csv"),
            NamedDataset::new("orders.json", vec![json!({"id": 1, "total": 30, "name": "first"})]),
        ]
    }

    #[test]
    fn test_table_name_and_matching() {
        let ds = NamedDataset::new("Sales.2023.csv", vec![]);
        assert_eq!(ds.table_name(), "Sales.2023");
        assert!(ds.matches("sales.2023"));
        assert!(ds.matches("SALES.2023.CSV"));
        assert!(!ds.matches("sales"));

        let srcs = sources();
        assert_eq!(find_source(&srcs, "ORDERS").unwrap().name, "orders.json");
        assert!(find_source(&srcs, "missing").is_none());
    }

    #[test]
    fn test_union_adds_provenance() {
        let a = NamedDataset::new("a.csv", vec![json!({"x": 1})]);
        let b = NamedDataset::new("b.csv", vec![json!({"x": 2})]);
        let result = combine(&[a, b], CombineMode::Union, None).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0][SOURCE_FILE_COLUMN], json!("a.csv"));
        assert_eq!(result[1][SOURCE_FILE_COLUMN], json!("b.csv"));
        assert_eq!(result[0][SOURCE_PATH_COLUMN], json!("a.csv"));
    }

    #[test]
    fn test_union_uses_path_when_known() {
        let result = combine(&sources(), CombineMode::Union, None).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(result[0][SOURCE_PATH_COLUMN], json!("/data/users.csv"));
    }

    #[test]
    fn test_intersection_projects_common_columns() {
        let result = combine(&sources(), CombineMode::Intersection, None).unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(
            result[2],
            json!({
                "id": 1,
                "name": "first",
                "_sourceFile": "orders.json",
                "_sourceFilePath": "orders.json"
            })
        );
        assert!(result[2].get("total").is_none());
    }

    #[test]
    fn test_join_merges_first_match_and_renames_collisions() {
        let keys = vec!["id".to_string()];
        let result = combine(&sources(), CombineMode::Join, Some(keys.as_slice())).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(
            result[0],
            json!({"id": 1, "name": "Alice", "total": 30, "name_orders": "first"})
        );
        // Unmatched base rows survive untouched.
        assert_eq!(result[1], json!({"id": 2, "name": "Bob"}));
    }

    #[test]
    fn test_join_keeps_non_object_base_rows() {
        let base = NamedDataset::new("base.csv", vec![json!({"id": 1}), json!("loose"), json!([1, 2])]);
        let other = NamedDataset::new("other.csv", vec![json!({"id": 1, "extra": true})]);
        let keys = vec!["id".to_string()];
        let result = combine(&[base, other], CombineMode::Join, Some(keys.as_slice())).unwrap();

        assert_eq!(
            result,
            vec![json!({"id": 1, "extra": true}), json!("loose"), json!([1, 2])]
        );
    }

    #[test]
    fn test_join_requires_keys() {
        assert_eq!(
            combine(&sources(), CombineMode::Join, None),
            Err(EngineError::JoinKey)
        );
        assert_eq!(
            combine(&sources(), CombineMode::Join, Some(&[][..])),
            Err(EngineError::JoinKey)
        );
    }

    #[test]
    fn test_combine_mode_from_str() {
        assert_eq!("UNION".parse::<CombineMode>().unwrap(), CombineMode::Union);
        assert_eq!("intersect".parse::<CombineMode>().unwrap(), CombineMode::Intersection);
        assert!("merge".parse::<CombineMode>().is_err());
    }
}
