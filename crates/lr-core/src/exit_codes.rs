//! Process exit codes.
//!
//! Scripts branch on these, so the numbers never change once released.
//! `0` and `6` describe how a run ended, `10..=19` are problems the caller
//! can fix, and `20..` are failures inside the tool or its I/O.

use lr_redact::RedactionError;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The run completed, whether or not anything was masked.
    Clean = 0,
    /// SIGINT or SIGTERM arrived; output holds every completed batch.
    Interrupted = 6,
    ArgsError = 10,
    /// Config missing, malformed or semantically invalid.
    ConfigError = 11,
    InputNotFound = 12,
    PermissionError = 13,
    /// A bug. Carries no more detail than the error message.
    InternalError = 20,
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    pub fn is_user_error(self) -> bool {
        matches!(self.as_i32(), 10..=19)
    }

    pub fn is_internal_error(self) -> bool {
        self.as_i32() >= 20
    }

    /// Stable name used in JSON error records.
    pub fn code_name(&self) -> &'static str {
        use ExitCode::*;
        match self {
            Clean => "OK_CLEAN",
            Interrupted => "ERR_INTERRUPTED",
            ArgsError => "ERR_ARGS",
            ConfigError => "ERR_CONFIG",
            InputNotFound => "ERR_INPUT_NOT_FOUND",
            PermissionError => "ERR_PERMISSION",
            InternalError => "ERR_INTERNAL",
            IoError => "ERR_IO",
        }
    }

    pub fn from_redaction_error(err: &RedactionError) -> Self {
        match err {
            RedactionError::InputNotFound { .. } => ExitCode::InputNotFound,
            RedactionError::InvalidConfiguration { .. }
            | RedactionError::Pattern { .. }
            | RedactionError::Json(_) => ExitCode::ConfigError,
            RedactionError::WriteFailure(e)
            | RedactionError::ReadFailure(e)
            | RedactionError::Io(e) => Self::from_io_error(e),
            RedactionError::MalformedUnit(_) => ExitCode::InternalError,
        }
    }

    /// Permission and missing-file problems get their own codes.
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ExitCode::PermissionError,
            io::ErrorKind::NotFound => ExitCode::InputNotFound,
            _ => ExitCode::IoError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
