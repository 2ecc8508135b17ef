//! Error types for the regionscene crate.

use std::fmt;

use primshape::ShapeError;

/// Result type for regionscene operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in scene operations.
///
/// Permission denials are not errors; the `can_*` checks return `false`.
#[derive(Debug)]
pub enum Error {
    /// Shape or parameter list decoding failed.
    Shape(ShapeError),
    /// A primitive parameter list named a code with no handler.
    InvalidParameterType {
        /// The offending code.
        code: i32,
    },
    /// A primitive parameter list ended before a required value.
    MissingParameter {
        /// The value that was expected.
        name: &'static str,
    },
    /// A primitive parameter had a value the part rejects.
    InvalidParameterValue {
        /// The parameter being applied.
        context: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
    /// Object XML could not be read or written.
    Xml {
        /// The element or document being processed.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// Region configuration could not be loaded.
    Config {
        /// The configuration source.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// Terraforming setup or dispatch failed.
    Terraform {
        /// Description of the failure.
        detail: String,
    },
    /// A localization was requested that the part does not have.
    UnknownLocalization {
        /// The requested culture.
        culture: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Shape(e) => write!(f, "shape error: {e}"),
            Error::InvalidParameterType { code } => {
                write!(f, "invalid parameter type {code}")
            }
            Error::MissingParameter { name } => write!(f, "no parameter for {name}"),
            Error::InvalidParameterValue { context, detail } => {
                write!(f, "invalid value for {context}: {detail}")
            }
            Error::Xml { context, message } => {
                write!(f, "failed to process {context} xml: {message}")
            }
            Error::Config { context, message } => {
                write!(f, "invalid configuration in {context}: {message}")
            }
            Error::Terraform { detail } => write!(f, "terraforming failed: {detail}"),
            Error::UnknownLocalization { culture } => {
                write!(f, "no localization for culture {culture}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        match e {
            // Parameter list exhaustion reads the same whichever crate hit it.
            ShapeError::MissingParameter { name } => Error::MissingParameter { name },
            other => Error::Shape(other),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml {
            context: "document",
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config {
            context: "json",
            message: e.to_string(),
        }
    }
}
