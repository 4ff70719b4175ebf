//! Error types for the CLI.

use core_types::RuntimeError;
use std::fmt;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failure inside the runtime engine
    Runtime(RuntimeError),

    /// File I/O error
    Io(std::io::Error),

    /// The module file is in a format this driver cannot load
    UnsupportedFormat(String),

    /// The entry-point argument is not Class.Method shaped
    BadEntryPoint(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Runtime(e) => write!(f, "runtime error: {e}"),
            CliError::Io(e) => write!(f, "file error: {e}"),
            CliError::UnsupportedFormat(s) => write!(f, "unsupported module format: {s}"),
            CliError::BadEntryPoint(s) => write!(f, "invalid entry point: {s}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RuntimeError> for CliError {
    fn from(err: RuntimeError) -> Self {
        CliError::Runtime(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
