//! Error types for expression parsing.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid unit: '{0}'")]
    InvalidUnit(char),

    #[error("Invalid magnitude: {0}")]
    InvalidMagnitude(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;
