//! Error types and exit codes for ticketeval
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure
//! - 2: Usage error (bad flags/args, invalid run configuration)
//! - 3: Data/misconfiguration error (unknown dataset, prompt or run, unreadable rules)
//!
//! Per-sample failures never surface here; they are recorded on the sample's
//! [`Record`](crate::record::Record) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the ticketeval CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data/misconfiguration error (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Run-level errors. Raised before any sample is processed, or while
/// reading/writing run artifacts.
#[derive(Error, Debug)]
pub enum EvalError {
    // Usage errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    // Data/misconfiguration errors (exit code 3)
    #[error("{context} not found: {value}")]
    NotFound { context: String, value: String },

    #[error("{context} already exists: {value}")]
    AlreadyExists { context: String, value: String },

    #[error("invalid dataset {path:?} at line {line}: {reason}")]
    InvalidDataset {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid responses file {path:?} at line {line}: {reason}")]
    InvalidResponses {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("invalid rules file {path:?}: {reason}")]
    InvalidRules { path: PathBuf, reason: String },

    #[error("misconfigured: {0}")]
    Misconfigured(String),

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to {operation}: {reason}")]
    FailedOperation { operation: String, reason: String },

    #[error("failed to {operation} {target}: {reason}")]
    FailedOperationWithTarget {
        operation: String,
        target: String,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

impl EvalError {
    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        EvalError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that was not found
    pub fn not_found(context: &str, value: impl std::fmt::Display) -> Self {
        EvalError::NotFound {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that already exists
    pub fn already_exists(context: &str, value: impl std::fmt::Display) -> Self {
        EvalError::AlreadyExists {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for a failed IO operation with context
    pub fn io_operation(
        operation: &str,
        path: impl std::fmt::Display,
        error: impl std::fmt::Display,
    ) -> Self {
        EvalError::FailedOperationWithTarget {
            operation: operation.to_string(),
            target: path.to_string(),
            reason: error.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            EvalError::UnknownFormat(_)
            | EvalError::UsageError(_)
            | EvalError::InvalidValue { .. } => ExitCode::Usage,

            EvalError::NotFound { .. }
            | EvalError::AlreadyExists { .. }
            | EvalError::InvalidDataset { .. }
            | EvalError::InvalidResponses { .. }
            | EvalError::InvalidRules { .. }
            | EvalError::Misconfigured(_) => ExitCode::Data,

            EvalError::Io(_)
            | EvalError::Json(_)
            | EvalError::Toml(_)
            | EvalError::FailedOperation { .. }
            | EvalError::FailedOperationWithTarget { .. }
            | EvalError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            EvalError::UnknownFormat(_) => "unknown_format",
            EvalError::UsageError(_) => "usage_error",
            EvalError::InvalidValue { .. } => "invalid_value",
            EvalError::NotFound { .. } => "not_found",
            EvalError::AlreadyExists { .. } => "already_exists",
            EvalError::InvalidDataset { .. } => "invalid_dataset",
            EvalError::InvalidResponses { .. } => "invalid_responses",
            EvalError::InvalidRules { .. } => "invalid_rules",
            EvalError::Misconfigured(_) => "misconfigured",
            EvalError::Io(_) => "io_error",
            EvalError::Json(_) => "json_error",
            EvalError::Toml(_) => "toml_error",
            EvalError::FailedOperation { .. } => "failed_operation",
            EvalError::FailedOperationWithTarget { .. } => "failed_operation_with_target",
            EvalError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.exit_code() as i32,
                "type": self.error_type(),
                "message": self.to_string(),
            }
        })
    }
}

/// Result type alias for ticketeval operations
pub type Result<T> = std::result::Result<T, EvalError>;
