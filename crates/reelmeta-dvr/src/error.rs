//! Decoder error type.

/// Errors produced while decoding a recording container.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is shorter than the fixed 16-byte header.
    #[error("Truncated header: {0} bytes")]
    TruncatedHeader(usize),

    /// A chunk record or payload runs past the declared payload area.
    #[error("Chunk table overruns payload at offset {0}")]
    ChunkOverrun(usize),

    /// The declared chunk sizes do not add up to the declared payload size.
    #[error("Chunk sizes sum to {actual} bytes, header declares {declared}")]
    SizeMismatch { declared: usize, actual: usize },

    /// A required chunk is absent.
    #[error("Missing required chunk {0}")]
    MissingChunk(u16),

    /// Chunk 2 is encrypted but no key-seed chunk is present.
    #[error("Encrypted details chunk without a key seed chunk")]
    MissingKeySeed,

    /// No media access key was supplied.
    #[error("Missing media access key")]
    MissingSecret,

    /// The external decoder binary failed.
    #[error("External decoder failed: {0}")]
    External(String),
}

/// Result type alias for decoder operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
