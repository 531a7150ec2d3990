//! Common error types used throughout reelmeta.
//!
//! Source parsers return `Result<Record>` so the failure kind stays visible
//! for logging; only the orchestrator converts a failure into an empty
//! record.

/// Common error type for reelmeta.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be parsed.
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// The file is not a format this parser understands.
    #[error("Unsupported source: {0}")]
    Unsupported(String),

    /// The recording container could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No media access key was configured for the recording container.
    #[error("Missing media access key")]
    MissingSecret,
}

impl Error {
    /// Create a new Malformed error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a new Unsupported error.
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a new Decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
