//! Error types for rowql.
//!
//! Every engine entry point returns an `EngineResult`. Messages are short and
//! human-readable; no internal state leaks through `Display`.

use thiserror::Error;

/// Engine error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("No data to process")]
    EmptyDataset,

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Join requires at least one key column")]
    JoinKey,

    #[error("Singular system: {0}")]
    SingularSystem(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl serde::Serialize for EngineError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
