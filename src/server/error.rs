//! Error types for routing and serving.

use thiserror::Error;

use crate::parser::Error as ParserError;

/// Errors that can occur during route registration, dispatch, or server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A route pattern's capture expression is not a valid regular expression.
    #[error("Invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A route pattern compiles but cannot be mapped to parameter names.
    #[error("Malformed route pattern {pattern:?}: {reason}")]
    MalformedPattern { pattern: String, reason: String },

    /// Internal server error.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// XML serialization/deserialization error.
    #[error("XML error: {0}")]
    XmlError(String),
}
