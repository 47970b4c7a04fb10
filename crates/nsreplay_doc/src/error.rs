//! Error types for the document crate.

use thiserror::Error;

/// Result type for document operations.
pub type DocResult<T> = Result<T, DocError>;

/// Errors that can occur while converting or encoding documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    /// Input text was not valid JSON.
    #[error("invalid JSON: {message}")]
    InvalidJson {
        /// Parser message.
        message: String,
    },

    /// A JSON number has no exact integer representation.
    #[error("unsupported number: {number}")]
    UnsupportedNumber {
        /// The number as it appeared in the input.
        number: String,
    },

    /// A value was expected to be a document.
    #[error("expected a document, found {type_name}")]
    NotADocument {
        /// Type name of the value found instead.
        type_name: &'static str,
    },

    /// Failed to encode a document payload.
    #[error("encoding failed: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a document payload.
    #[error("decoding failed: {message}")]
    Decoding {
        /// Description of the decoding error.
        message: String,
    },
}

impl DocError {
    /// Creates an invalid JSON error.
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }

    /// Creates an unsupported number error.
    pub fn unsupported_number(number: impl Into<String>) -> Self {
        Self::UnsupportedNumber {
            number: number.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a decoding error.
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }
}
