use std::{num::ParseIntError, sync::PoisonError};

use bincode::ErrorKind;
use thiserror::Error;

/// Custom Result type for chocdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for chocdb
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// First token of a command is not a known command kind
    #[error("invalid command {0:?}")]
    InvalidCommand(String),
    /// Option token unknown, or not valid for the command kind
    #[error("unrecognized option {0:?}")]
    UnrecognizedOption(String),
    /// SQL parsing error
    #[error("parse error {0}")]
    Parse(String),
    /// Internal error (planning, execution, storage, serialization, etc.)
    #[error("internal error {0}")]
    Internal(String),
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error::Parse(value.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(value: std::num::ParseFloatError) -> Self {
        Error::Parse(value.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(value: PoisonError<T>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<Box<ErrorKind>> for Error {
    fn from(value: Box<ErrorKind>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::Internal(value.to_string())
    }
}
