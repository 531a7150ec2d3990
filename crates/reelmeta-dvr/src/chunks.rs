//! Binary chunk table parsing.
//!
//! The container opens with a fixed 16-byte header whose last six bytes
//! give the total payload length (big-endian u32) and the chunk count
//! (big-endian u16). Each chunk is a 12-byte record — `chunk_size` (u32),
//! `data_size` (u32), `chunk_id` (u16), `encoding_flag` (u16) — followed by
//! `data_size` payload bytes; the cursor advances by `chunk_size`, which
//! may exceed `12 + data_size` due to padding.

use crate::error::{DecodeError, Result};

/// Length of the fixed file header.
pub const HEADER_LEN: usize = 16;

/// Chunk id of the "details" XML payload.
pub const CHUNK_DETAILS: u16 = 2;

/// Chunk id of the raw symmetric-key seed.
pub const CHUNK_KEY: u16 = 3;

/// One parsed chunk.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Numeric chunk id.
    pub id: u16,
    /// Encoding flag; non-zero means the payload is encrypted.
    pub encoding: u16,
    /// Raw payload bytes.
    pub data: Vec<u8>,
    /// Absolute byte offset of the payload within the whole stream,
    /// header included. The stream cipher is seeked to this position.
    pub payload_offset: u64,
}

impl Chunk {
    /// True when the encoding flag marks this payload as encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.encoding != 0
    }
}

/// The parsed chunk table of a container.
#[derive(Debug)]
pub struct ChunkTable {
    chunks: Vec<Chunk>,
}

impl ChunkTable {
    /// Parse the header and chunk table from the start of a container.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::TruncatedHeader(bytes.len()));
        }

        let total = u32::from_be_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]) as usize;
        let count = u16::from_be_bytes([bytes[14], bytes[15]]) as usize;

        if total < HEADER_LEN || total > bytes.len() {
            return Err(DecodeError::ChunkOverrun(total));
        }
        let raw = &bytes[HEADER_LEN..total];

        let mut chunks = Vec::with_capacity(count);
        let mut cursor = 0usize;
        for _ in 0..count {
            let record = raw
                .get(cursor..cursor + 12)
                .ok_or(DecodeError::ChunkOverrun(cursor))?;
            let chunk_size =
                u32::from_be_bytes([record[0], record[1], record[2], record[3]]) as usize;
            let data_size =
                u32::from_be_bytes([record[4], record[5], record[6], record[7]]) as usize;
            let id = u16::from_be_bytes([record[8], record[9]]);
            let encoding = u16::from_be_bytes([record[10], record[11]]);

            if chunk_size < 12 + data_size {
                return Err(DecodeError::ChunkOverrun(cursor));
            }
            let data = raw
                .get(cursor + 12..cursor + 12 + data_size)
                .ok_or(DecodeError::ChunkOverrun(cursor + 12))?
                .to_vec();

            chunks.push(Chunk {
                id,
                encoding,
                data,
                payload_offset: (HEADER_LEN + cursor + 12) as u64,
            });
            cursor += chunk_size;
        }

        // The declared chunk sizes must cover the declared payload exactly.
        if cursor != total - HEADER_LEN {
            return Err(DecodeError::SizeMismatch {
                declared: total - HEADER_LEN,
                actual: cursor,
            });
        }

        Ok(Self { chunks })
    }

    /// Find a chunk by id.
    pub fn chunk(&self, id: u16) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.id == id)
    }

    /// Find a chunk by id, or fail with [`DecodeError::MissingChunk`].
    pub fn require(&self, id: u16) -> Result<&Chunk> {
        self.chunk(id).ok_or(DecodeError::MissingChunk(id))
    }

    /// All chunks in table order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}
