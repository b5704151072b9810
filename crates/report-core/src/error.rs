use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the membership report tools.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or produced.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The CSV export was structurally invalid.
    #[error("Failed to parse CSV: {0}")]
    Csv(String),

    /// A field inside an otherwise well-formed report could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Credentials were missing or rejected by the membership system.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The report endpoint could not be reached or answered with a failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The report contained no records, so there is no first day to seed
    /// the cumulative series from.
    #[error("No records to aggregate")]
    NoRecords,

    /// An error originating from the terminal / TUI layer.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;
