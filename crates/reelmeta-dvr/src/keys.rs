//! Key derivation for the encrypted details payload.
//!
//! The cipher key material comes from a two-stage hash chain over the
//! per-device secret and the key seed embedded in chunk 3:
//!
//! 1. `stage1` is the lower-case hex MD5 digest of
//!    `"tivo:TiVo DVR:" + secret`.
//! 2. `derived` is the first 16 bytes of `SHA1(stage1 + seed)` padded with
//!    four zero bytes.
//! 3. The cipher key is `SHA1(derived[..17])` and the IV is
//!    `SHA1(derived)`.

use md5::Md5;
use sha1::{Digest, Sha1};

/// The literal prefix mixed into the first hash stage.
const SECRET_PREFIX: &str = "tivo:TiVo DVR:";

/// Derived cipher key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherKeys {
    /// 20-byte stream cipher key.
    pub key: [u8; 20],
    /// 20-byte stream cipher IV.
    pub iv: [u8; 20],
}

/// Derive the stream cipher key and IV from the device secret and the raw
/// key seed carried in the container.
pub fn derive(secret: &str, seed: &[u8]) -> CipherKeys {
    let stage1 = hex::encode(Md5::digest(format!("{SECRET_PREFIX}{secret}").as_bytes()));

    let mut hasher = Sha1::new();
    hasher.update(stage1.as_bytes());
    hasher.update(seed);
    let digest = hasher.finalize();

    let mut derived = [0u8; 20];
    derived[..16].copy_from_slice(&digest[..16]);
    // last four bytes stay zero

    let key: [u8; 20] = Sha1::digest(&derived[..17]).into();
    let iv: [u8; 20] = Sha1::digest(derived).into();
    CipherKeys { key, iv }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Computed with an independent implementation of the hash chain.
    #[test]
    fn test_known_derivation_vector() {
        let keys = derive("1234567890", &[0x10, 0x32, 0x54, 0x76, 0x98, 0xba, 0xdc, 0xfe]);
        assert_eq!(
            hex::encode(keys.key),
            "c32adc7efe3cf7cb37eed85c563e451ca403000d"
        );
        assert_eq!(
            hex::encode(keys.iv),
            "92b6296d9e6ed8d7c190c674fac1b2b942ecd939"
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive("0123456789", b"seed-bytes");
        let b = derive("0123456789", b"seed-bytes");
        assert_eq!(a, b);
        assert_ne!(a.key, a.iv);
    }

    #[test]
    fn test_secret_and_seed_both_matter() {
        let base = derive("0123456789", b"seed");
        assert_ne!(derive("9876543210", b"seed").key, base.key);
        assert_ne!(derive("0123456789", b"another").key, base.key);
    }
}
