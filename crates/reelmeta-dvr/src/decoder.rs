//! Container decode entry points.
//!
//! [`decode`] is the in-process path: parse the chunk table, derive the
//! cipher keys when the details chunk is encrypted, and XOR the payload
//! with the keystream seeked to its absolute offset. [`decode_file`]
//! additionally supports an external decoder binary; both paths must
//! produce byte-identical plaintext.

use crate::chunks::{ChunkTable, CHUNK_DETAILS, CHUNK_KEY};
use crate::cipher::StreamCipher;
use crate::error::{DecodeError, Result};
use crate::keys;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Name of the conventional external decoder binary.
const EXTERNAL_DECODER: &str = "tdcat";

/// Configuration for decoding recording containers.
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Per-device media access key. Decoding cannot proceed without it.
    pub media_access_key: Option<String>,
    /// Explicit path to an external decoder binary. When unset, the
    /// conventional name is looked up on `PATH`.
    pub external_decoder: Option<PathBuf>,
}

impl DecoderConfig {
    /// Discover the conventional external decoder on `PATH` and record it
    /// in the config. Decoding itself only shells out when a path is set.
    pub fn discover_external(mut self) -> Self {
        if self.external_decoder.is_none() {
            self.external_decoder = which::which(EXTERNAL_DECODER).ok();
        }
        self
    }
}

/// Decode a recording container already read into memory, returning the
/// plaintext details document.
pub fn decode(bytes: &[u8], secret: &str) -> Result<Vec<u8>> {
    let table = ChunkTable::parse(bytes)?;
    let details = table.require(CHUNK_DETAILS)?;

    if !details.is_encrypted() {
        return Ok(details.data.clone());
    }

    let seed = table
        .chunk(CHUNK_KEY)
        .ok_or(DecodeError::MissingKeySeed)?
        .data
        .as_slice();
    let derived = keys::derive(secret, seed);

    let mut plaintext = details.data.clone();
    let mut cipher = StreamCipher::new(&derived.key, &derived.iv);
    cipher.seek(details.payload_offset);
    cipher.apply_keystream(&mut plaintext);

    tracing::debug!(
        offset = details.payload_offset,
        len = plaintext.len(),
        "decrypted details chunk"
    );
    Ok(plaintext)
}

/// Decode a recording container on disk, preferring a configured external
/// decoder and falling back to the in-process path.
pub fn decode_file(path: &Path, config: &DecoderConfig) -> Result<Vec<u8>> {
    let secret = config
        .media_access_key
        .as_deref()
        .ok_or(DecodeError::MissingSecret)?;

    if let Some(tool) = config.external_decoder.as_deref() {
        return decode_external(tool, path, secret);
    }

    let bytes = std::fs::read(path)?;
    decode(&bytes, secret)
}

/// Run the external decoder and capture its stdout as the plaintext.
fn decode_external(tool: &Path, path: &Path, secret: &str) -> Result<Vec<u8>> {
    let output = Command::new(tool)
        .arg("-m")
        .arg(secret)
        .arg("-2")
        .arg(path)
        .output()
        .map_err(|e| DecodeError::External(format!("{}: {e}", tool.display())))?;

    if !output.status.success() {
        return Err(DecodeError::External(format!(
            "{} exited with {}",
            tool.display(),
            output.status
        )));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::tests::build_container;
    use crate::chunks::HEADER_LEN;

    const SECRET: &str = "1234567890";
    const PLAINTEXT: &[u8] = b"<showing><program><title>Test</title></program></showing>";
    const SEED: &[u8] = &[0x10, 0x32, 0x54, 0x76, 0x98, 0xba, 0xdc, 0xfe];

    /// Encrypt `PLAINTEXT` exactly as a recorder would: keystream seeked to
    /// the absolute offset the details payload will land at.
    fn encrypted_container() -> Vec<u8> {
        // Details is the first chunk, so its payload starts right after the
        // file header and its own 12-byte record.
        let payload_offset = (HEADER_LEN + 12) as u64;
        let derived = keys::derive(SECRET, SEED);
        let mut ciphertext = PLAINTEXT.to_vec();
        let mut cipher = StreamCipher::new(&derived.key, &derived.iv);
        cipher.seek(payload_offset);
        cipher.apply_keystream(&mut ciphertext);

        build_container(&[(CHUNK_DETAILS, 1, &ciphertext, 0), (CHUNK_KEY, 0, SEED, 0)])
    }

    #[test]
    fn test_decode_encrypted_details() {
        let container = encrypted_container();
        let plaintext = decode(&container, SECRET).unwrap();
        assert_eq!(plaintext, PLAINTEXT);
    }

    // The expected bytes were computed with an independent implementation
    // of the key chain and cipher, so this pins the whole decode path to
    // fixed values rather than whatever the code under test produces.
    #[test]
    fn test_ciphertext_matches_known_vector() {
        let container = encrypted_container();
        let payload = &container[HEADER_LEN + 12..HEADER_LEN + 12 + 16];
        assert_eq!(hex::encode(payload), "cdd24433cbd48a4fd745a7534d37ce7f");
        assert_eq!(decode(&container, SECRET).unwrap(), PLAINTEXT);
    }

    #[test]
    fn test_wrong_secret_garbles_plaintext() {
        let container = encrypted_container();
        let garbled = decode(&container, "0000000000").unwrap();
        assert_ne!(garbled, PLAINTEXT);
    }

    #[test]
    fn test_unencrypted_details_pass_through() {
        let container = build_container(&[(CHUNK_DETAILS, 0, PLAINTEXT, 0)]);
        let plaintext = decode(&container, SECRET).unwrap();
        assert_eq!(plaintext, PLAINTEXT);
    }

    #[test]
    fn test_encrypted_without_seed_fails() {
        let container = build_container(&[(CHUNK_DETAILS, 1, b"garbage", 0)]);
        assert!(matches!(
            decode(&container, SECRET),
            Err(DecodeError::MissingKeySeed)
        ));
    }

    #[test]
    fn test_decode_file_requires_secret() {
        let config = DecoderConfig::default();
        let err = decode_file(Path::new("/nonexistent.tivo"), &config).unwrap_err();
        assert!(matches!(err, DecodeError::MissingSecret));
    }

    #[test]
    fn test_decode_file_in_process_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.tivo");
        std::fs::write(&path, encrypted_container()).unwrap();

        let config = DecoderConfig {
            media_access_key: Some(SECRET.to_string()),
            external_decoder: None,
        };
        let plaintext = decode_file(&path, &config).unwrap();
        assert_eq!(plaintext, PLAINTEXT);
    }

    /// Both decode paths are interchangeable: a stand-in external decoder
    /// that emits the known plaintext must match the in-process result
    /// byte for byte.
    #[cfg(unix)]
    #[test]
    fn test_external_path_matches_in_process() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.tivo");
        std::fs::write(&path, encrypted_container()).unwrap();

        let plain_path = dir.path().join("plain.xml");
        std::fs::write(&plain_path, PLAINTEXT).unwrap();
        let tool = dir.path().join("tdcat");
        std::fs::write(
            &tool,
            format!("#!/bin/sh\nexec cat {}\n", plain_path.display()),
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let in_process = decode_file(
            &path,
            &DecoderConfig {
                media_access_key: Some(SECRET.to_string()),
                external_decoder: None,
            },
        )
        .unwrap();
        let external = decode_file(
            &path,
            &DecoderConfig {
                media_access_key: Some(SECRET.to_string()),
                external_decoder: Some(tool),
            },
        )
        .unwrap();
        assert_eq!(in_process, external);
    }

    #[test]
    fn test_external_decoder_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording.tivo");
        std::fs::write(&path, encrypted_container()).unwrap();

        let config = DecoderConfig {
            media_access_key: Some(SECRET.to_string()),
            external_decoder: Some(PathBuf::from("/nonexistent/tdcat")),
        };
        assert!(matches!(
            decode_file(&path, &config),
            Err(DecodeError::External(_))
        ));
    }
}
