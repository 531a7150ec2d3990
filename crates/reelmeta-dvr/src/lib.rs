//! Decoder for the encrypted chunked DVR recording container.
//!
//! The container is a fixed 16-byte header followed by a table of
//! length-prefixed chunks. Chunk 2 holds the "details" XML document,
//! possibly encrypted; chunk 3 holds the raw key seed when it is. The
//! symmetric key is derived from a per-device secret through a two-stage
//! hash chain and the payload is decrypted with a position-addressable
//! stream cipher seeked to the payload's absolute byte offset.
//!
//! Decoding is a pure function of `(bytes, secret)`; no state is retained
//! between calls. An external decoder binary can stand in for the
//! in-process path and must produce byte-identical plaintext.

pub mod chunks;
pub mod cipher;
pub mod decoder;
pub mod error;
pub mod keys;

pub use chunks::{Chunk, ChunkTable, CHUNK_DETAILS, CHUNK_KEY};
pub use decoder::{decode, decode_file, DecoderConfig};
pub use error::{DecodeError, Result};
