//! Error types for acuerdos
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, bad config, unknown task)
//! - 3: Data unavailable (store unreachable, missing table)
//! - 4: Operation failed (append failed, I/O)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the acuerdos CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const DATA_UNAVAILABLE: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for acuerdos operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown task: {topic} / {zone} / {description}")]
    UnknownTask {
        topic: String,
        zone: String,
        description: String,
    },

    // Store reads (exit code 3)
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Malformed row {row} in {table}: {reason}")]
    MalformedRow {
        table: String,
        row: usize,
        reason: String,
    },

    // Operation failures (exit code 4)
    #[error("Write to {table} failed: {reason}")]
    WriteFailed { table: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_) | Error::InvalidArgument(_) | Error::UnknownTask { .. } => {
                exit_codes::USER_ERROR
            }

            Error::DataUnavailable(_) | Error::MalformedRow { .. } => {
                exit_codes::DATA_UNAVAILABLE
            }

            Error::WriteFailed { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Whether a view can degrade to an empty dataset instead of failing.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Error::DataUnavailable(_) | Error::MalformedRow { .. })
    }

    /// Coarse category matching the exit code.
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            exit_codes::USER_ERROR => "user_error",
            exit_codes::DATA_UNAVAILABLE => "data_unavailable",
            _ => "operation_failed",
        }
    }

    /// Structured details for the JSON error envelope, when the variant carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::UnknownTask {
                topic,
                zone,
                description,
            } => Some(serde_json::json!({
                "topic": topic,
                "zone": zone,
                "description": description,
            })),
            Error::WriteFailed { table, .. } => Some(serde_json::json!({ "table": table })),
            Error::DataUnavailable(table) => Some(serde_json::json!({ "table": table })),
            _ => None,
        }
    }
}

/// Result type alias for acuerdos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error body of the `--json` envelope
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub message: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            message: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
