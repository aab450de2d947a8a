use crypto_hashes::{blake2b_256, blake3_256, double_sha256, keccak_256, sha256d};

use crate::{header::Header, Hash, PowAlgorithm};

/// Serialized header length: version, two hashes, timestamp, bits, algo tag, nonce.
pub const HEADER_SIZE: usize = 2 + 32 + 32 + 8 + 4 + 1 + 8;

/// Fixed little-endian layout of a header.
pub fn header_bytes(header: &Header) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE);
    bytes.extend_from_slice(&header.version.to_le_bytes());
    bytes.extend_from_slice(header.prev_hash.as_bytes());
    bytes.extend_from_slice(header.merkle_root.as_bytes());
    bytes.extend_from_slice(&header.timestamp.to_le_bytes());
    bytes.extend_from_slice(&header.bits.to_le_bytes());
    bytes.push(header.algo.as_u8());
    bytes.extend_from_slice(&header.nonce.to_le_bytes());
    bytes
}

pub fn hash(header: &Header) -> Hash {
    double_sha256(&header_bytes(header))
}

/// Digest of the header under its own proof-of-work algorithm.
pub fn pow_hash(header: &Header) -> Hash {
    let bytes = header_bytes(header);
    match header.algo {
        PowAlgorithm::Sha256d => sha256d(&bytes),
        PowAlgorithm::Blake2b => blake2b_256(&bytes),
        PowAlgorithm::Blake3 => blake3_256(&bytes),
        PowAlgorithm::Keccak => keccak_256(&bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_length() {
        let header = Header::new(1, Hash::zeroed(), Hash::zeroed(), 0, 0x207f_ffff, PowAlgorithm::Keccak, 0);
        let bytes = header_bytes(&header);
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(bytes[78], PowAlgorithm::Keccak.as_u8());
    }

    #[test]
    fn test_sha256d_pow_hash_is_block_hash() {
        let header = Header::new(1, Hash::zeroed(), Hash::zeroed(), 5, 0x207f_ffff, PowAlgorithm::Sha256d, 9);
        assert_eq!(pow_hash(&header), hash(&header));
    }
}
