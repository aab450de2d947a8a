use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::{hashing, Hash, PowAlgorithm};

/// Block header. The block hash commits to every field here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: u16,
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    /// Compact encoding of the target
    pub bits: u32,
    pub algo: PowAlgorithm,
    pub nonce: u64,
}

impl Header {
    pub fn new(
        version: u16,
        prev_hash: Hash,
        merkle_root: Hash,
        timestamp: u64,
        bits: u32,
        algo: PowAlgorithm,
        nonce: u64,
    ) -> Self {
        Self { version, prev_hash, merkle_root, timestamp, bits, algo, nonce }
    }

    /// Identity of the block, double SHA-256 of the serialized header.
    pub fn hash(&self) -> Hash {
        hashing::header::hash(self)
    }

    /// Digest checked against the target, computed with the header's own algorithm.
    pub fn pow_hash(&self) -> Hash {
        hashing::header::pow_hash(self)
    }

    /// The proof-of-work digest read as a little-endian 256-bit number.
    pub fn pow_value(&self) -> U256 {
        U256::from_little_endian(self.pow_hash().as_bytes())
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_zero()
    }
}
