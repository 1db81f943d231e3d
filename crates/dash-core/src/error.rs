use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the ticket dashboard pipeline.
///
/// Cell-level problems never show up here: malformed dates, numbers and
/// labels degrade to null inside the cleaner. Only whole-request failures
/// are surfaced to the caller.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV document is structurally broken (bad quoting, invalid UTF-8).
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// The CSV document has no header row.
    #[error("CSV input has no header row")]
    MissingHeader,

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date given on the command line did not match `YYYY-MM-DD`.
    #[error("Invalid date: {0}")]
    DateParse(String),

    /// A granularity string is not one of `daily`, `weekly`, `monthly`.
    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    /// The ticket API answered with a non-success status.
    #[error("Ticket API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The ticket API could not be reached at all.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
