//! Error types for shape encoding and decoding.

use std::fmt;

/// Errors that can occur while encoding, decoding or applying shape data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Input buffer does not have the length a fixed-size record requires.
    InvalidLength {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A value lies outside the range the operation accepts.
    OutOfRange { context: &'static str, value: i64 },
    /// A parameter list ended before a required value.
    MissingParameter { name: &'static str },
    /// A parameter list value had the wrong type.
    TypeMismatch {
        name: &'static str,
        expected: &'static str,
    },
    /// Invalid data format or structure.
    InvalidFormat {
        context: &'static str,
        detail: String,
    },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "invalid {context} length: expected {expected} bytes, got {actual}"
                )
            }
            Self::OutOfRange { context, value } => {
                write!(f, "{context} out of range: {value}")
            }
            Self::MissingParameter { name } => {
                write!(f, "missing parameter {name}")
            }
            Self::TypeMismatch { name, expected } => {
                write!(f, "parameter {name} must be {expected}")
            }
            Self::InvalidFormat { context, detail } => {
                write!(f, "invalid format in {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

/// Result type for shape operations.
pub type ShapeResult<T> = Result<T, ShapeError>;
