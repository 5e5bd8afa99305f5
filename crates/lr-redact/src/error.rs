//! Error types for the redaction engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur while configuring or running a redaction pass.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// The designated input could not be opened.
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// A line sampled during format detection is not a self-contained record.
    ///
    /// Never fatal: detection falls back to freeform.
    #[error("malformed structured record: {0}")]
    MalformedUnit(String),

    /// A pattern failed to compile or has the wrong shape for its mask mode.
    #[error("pattern {name}: {message}")]
    Pattern { name: String, message: String },

    /// Configuration rejected before any I/O began.
    #[error("invalid configuration for {field}: {message}")]
    InvalidConfiguration { field: String, message: String },

    /// The output stream could not be written or flushed.
    #[error("write failed: {0}")]
    WriteFailure(#[source] std::io::Error),

    /// The input stream failed mid-read.
    #[error("read failed: {0}")]
    ReadFailure(#[source] std::io::Error),

    /// I/O error during config file operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RedactionError {
    /// Shorthand for an [`RedactionError::InvalidConfiguration`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        RedactionError::InvalidConfiguration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable error code for structured error reporting.
    pub fn code(&self) -> &'static str {
        match self {
            RedactionError::InputNotFound { .. } => "input_not_found",
            RedactionError::MalformedUnit(_) => "malformed_unit",
            RedactionError::Pattern { .. } => "pattern_error",
            RedactionError::InvalidConfiguration { .. } => "invalid_configuration",
            RedactionError::WriteFailure(_) => "write_failure",
            RedactionError::ReadFailure(_) => "read_failure",
            RedactionError::Io(_) => "io_error",
            RedactionError::Json(_) => "json_error",
        }
    }

    /// Whether the error aborts a run that is already streaming.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RedactionError::MalformedUnit(_))
    }
}
