//! Loading datasets from files.
//!
//! Supported formats, chosen by extension:
//!
//! - `.json`  - an array of objects (a single object is one row)
//! - `.jsonl` / `.ndjson` - one JSON value per line
//! - `.csv` / `.tsv` - header row plus records; cells that read as numbers or
//!   booleans are typed, empty cells become null

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use rowql::value::{number_value, parse_number};
use rowql::{Dataset, NamedDataset, Row};
use serde_json::Value;

/// Load a file into a dataset.
pub fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "csv" => load_delimited(path, b',')?,
        "tsv" => load_delimited(path, b'\t')?,
        "jsonl" | "ndjson" => load_json_lines(path)?,
        _ => load_json(path)?,
    };

    tracing::info!(path = %path.display(), rows = rows.len(), "loaded dataset");
    Ok(rows)
}

/// Load a file as a named source for JOINs and combination.
pub fn load_named(path: &Path) -> anyhow::Result<NamedDataset> {
    let rows = load_dataset(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(NamedDataset::new(name, rows).with_path(path.display().to_string()))
}

fn load_json(path: &Path) -> anyhow::Result<Dataset> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(row) => Ok(vec![Value::Object(row)]),
        _ => anyhow::bail!(
            "Expected an array of objects in {}",
            path.display()
        ),
    }
}

fn load_json_lines(path: &Path) -> anyhow::Result<Dataset> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut rows = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {} of {}", index + 1, path.display()))?;
        rows.push(value);
    }
    Ok(rows)
}

fn load_delimited(path: &Path, delimiter: u8) -> anyhow::Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.with_context(|| format!("Invalid record in {}", path.display()))?;
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), cell_value(cell));
        }
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Type a CSV cell.
fn cell_value(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    match parse_number(trimmed) {
        Some(n) if n.is_finite() => number_value(n),
        _ => Value::String(cell.to_string()),
    }
}
