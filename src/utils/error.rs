//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs.

use thiserror::Error;

/// Errors detected while validating report options, before any file I/O
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Sort key '{0}' can only be used with -b option")]
    BranchOnlyKey(String),

    #[error("Invalid cpu list '{0}' (expected items like 1 or 0-3)")]
    InvalidCpuList(String),

    #[error("Invalid id list '{0}' (expected comma-separated integers)")]
    InvalidIdList(String),

    #[error("Invalid percent limit {0} (must be in 0..=100)")]
    InvalidPercentLimit(f64),
}

/// Errors that can occur while reading the trace file
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Failed to open trace file: {0}")]
    OpenFailed(#[from] std::io::Error),

    #[error("Malformed trace file: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),

    #[error("Trace was taken in off-cpu mode but has no '{0}' event")]
    MissingSchedSwitchEvent(String),

    #[error("Event '{0}' was not recorded with branch stack sampling")]
    MissingBranchStack(String),

    #[error("Sample record references unknown event attribute {0}")]
    BadAttrId(usize),
}

/// Errors that can occur while writing the report
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write report: {0}")]
    WriteFailed(#[from] std::io::Error),
}

/// Top-level error for a report run
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Output(#[from] OutputError),
}
