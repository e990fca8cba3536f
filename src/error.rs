// ⚠️ Library errors - only for conditions that stop a whole sweep
// Per-field validation problems are reported as statuses, never as errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    /// A cell the loader cannot coerce to a scalar
    #[error("Unsupported value in row {row}, column '{column}': {kind}")]
    UnsupportedValue {
        row: usize,
        column: String,
        kind: String,
    },

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CleanerError>;
