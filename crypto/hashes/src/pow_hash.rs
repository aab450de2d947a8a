//! Raw proof-of-work hash functions.
//!
//! Each function maps the serialized header bytes to a 32-byte digest. Which one a
//! header is checked with is decided by its algorithm tag in `consensus_core`.

use blake2b_simd::Params as Blake2bParams;
use sha3::{Digest, Keccak256};

use crate::{double_sha256, Hash};

/// SHA256(SHA256(data))
pub fn sha256d(data: &[u8]) -> Hash {
    double_sha256(data)
}

/// BLAKE2b with a 32-byte output.
pub fn blake2b_256(data: &[u8]) -> Hash {
    let digest = Blake2bParams::new().hash_length(32).hash(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_bytes());
    Hash::from_bytes(out)
}

/// BLAKE3 default 32-byte output.
pub fn blake3_256(data: &[u8]) -> Hash {
    Hash::from_bytes(*blake3::hash(data).as_bytes())
}

/// Original Keccak-256 (pre-NIST padding).
pub fn keccak_256(data: &[u8]) -> Hash {
    Hash::from_bytes(Keccak256::digest(data).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_keccak_empty_vector() {
        assert_eq!(
            keccak_256(b"").as_bytes(),
            &hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn test_blake3_empty_vector() {
        assert_eq!(
            blake3_256(b"").as_bytes(),
            &hex!("af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262")
        );
    }

    #[test]
    fn test_algorithms_disagree() {
        let data = b"header bytes";
        let digests = [sha256d(data), blake2b_256(data), blake3_256(data), keccak_256(data)];
        for i in 0..digests.len() {
            for j in (i + 1)..digests.len() {
                assert_ne!(digests[i], digests[j]);
            }
        }
    }
}
