//! Command-line front end.
//!
//! Every command reads its inputs from files, runs one engine operation and
//! prints the result as JSON on stdout.

pub mod input;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rowql::value::{get_column, numeric_value};
use rowql::{AggOp, CombineMode, Engine, EngineConfig, RegressionKind};
use serde::Serialize;
use serde_json::{json, Value};

use self::input::{load_dataset, load_named};

#[derive(Parser, Debug)]
#[command(name = "rowql")]
#[command(about = "Query, aggregate and summarize tabular data files", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./rowql.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a SQL query against a file
    Query {
        /// Dataset the query runs against (`FROM data`)
        file: PathBuf,

        /// Query text
        query: String,

        /// Additional files reachable by name in FROM/JOIN (e.g. --source users.csv)
        #[arg(long = "source")]
        sources: Vec<PathBuf>,
    },

    /// Group rows by a column and reduce another
    Aggregate {
        file: PathBuf,

        /// Column to group by
        #[arg(long)]
        group_by: String,

        /// Column to reduce (omit to count rows)
        #[arg(long)]
        value: Option<String>,

        /// sum, avg, count, min or max
        #[arg(long, default_value = "count")]
        op: AggOp,
    },

    /// Combine several files
    Combine {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// union, intersection or join
        #[arg(long, default_value = "union")]
        mode: CombineMode,

        /// Join key column (repeatable)
        #[arg(long = "key")]
        keys: Vec<String>,
    },

    /// Summary statistics per column
    Describe { file: PathBuf },

    /// Type, null count and samples per column
    Info { file: PathBuf },

    /// Expand nested objects and arrays into dot/bracket columns
    Flatten { file: PathBuf },

    /// Fit a regression curve to two numeric columns
    Fit {
        file: PathBuf,

        /// Column for x values
        #[arg(long)]
        x: String,

        /// Column for y values
        #[arg(long)]
        y: String,

        /// linear, polynomial[:N], exponential, power or logarithmic
        #[arg(long, default_value = "linear")]
        kind: RegressionKind,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    match &cli.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            EngineConfig::load(path)
        }
        None => EngineConfig::load_from_dir(&std::env::current_dir()?),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}

/// Numeric `(x, y)` pairs from two columns; rows lacking either are skipped.
fn extract_points(rows: &[Value], x: &str, y: &str) -> Vec<(f64, f64)> {
    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row| {
            let x = get_column(row, x).and_then(numeric_value)?;
            let y = get_column(row, y).and_then(numeric_value)?;
            Some((x, y))
        })
        .collect()
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let engine = Engine::with_config(config);
    let pretty = cli.pretty;

    match cli.command {
        Command::Query {
            file,
            query,
            sources,
        } => {
            let main = load_named(&file)?;
            let mut named = vec![main.clone()];
            for path in &sources {
                named.push(load_named(path)?);
            }
            let result = engine.execute_multi_source_query(&named, &main.rows, &query)?;
            tracing::info!(rows = result.len(), "query complete");
            print_json(&result, pretty)
        }
        Command::Aggregate {
            file,
            group_by,
            value,
            op,
        } => {
            let rows = load_dataset(&file)?;
            let result = engine.aggregate(&rows, &group_by, value.as_deref(), op)?;
            print_json(&result, pretty)
        }
        Command::Combine { files, mode, keys } => {
            let sources = files
                .iter()
                .map(|path| load_named(path))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let keys = (!keys.is_empty()).then_some(keys.as_slice());
            let result = engine.combine(&sources, mode, keys)?;
            print_json(&result, pretty)
        }
        Command::Describe { file } => {
            let rows = load_dataset(&file)?;
            print_json(&engine.describe(&rows)?, pretty)
        }
        Command::Info { file } => {
            let rows = load_dataset(&file)?;
            print_json(&engine.info(&rows)?, pretty)
        }
        Command::Flatten { file } => {
            let rows = load_dataset(&file)?;
            print_json(&engine.flatten(&rows), pretty)
        }
        Command::Fit { file, x, y, kind } => {
            let rows = load_dataset(&file)?;
            let points = extract_points(&rows, &x, &y);
            if points.len() < 2 {
                anyhow::bail!("Need at least two rows with numeric '{}' and '{}'", x, y);
            }
            let model = engine.fit_model(&points, kind)?;
            if model.kind != kind {
                tracing::warn!(requested = %kind, fitted = %model.kind, "fell back to a linear fit");
            }
            let curve = engine.fit(&points, kind);
            let output = json!({
                "kind": model.kind.to_string(),
                "equation": model.equation(),
                "coefficients": model.coefficients,
                "r_squared": model.r_squared,
                "curve": curve,
            });
            print_json(&output, pretty)
        }
    }
}
