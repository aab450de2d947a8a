use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::ConsensusError;

/// Proof-of-work algorithm a header was mined with.
///
/// Every algorithm keeps its own difficulty lineage, see `consensus_pow::retarget`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PowAlgorithm {
    Sha256d = 0,
    Blake2b = 1,
    Blake3 = 2,
    Keccak = 3,
}

impl PowAlgorithm {
    pub const ALL: [PowAlgorithm; 4] = [Self::Sha256d, Self::Blake2b, Self::Blake3, Self::Keccak];

    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Sha256d),
            1 => Some(Self::Blake2b),
            2 => Some(Self::Blake3),
            3 => Some(Self::Keccak),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256d => "sha256d",
            Self::Blake2b => "blake2b",
            Self::Blake3 => "blake3",
            Self::Keccak => "keccak",
        }
    }
}

impl Default for PowAlgorithm {
    fn default() -> Self {
        Self::Sha256d
    }
}

impl Display for PowAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PowAlgorithm {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|algo| algo.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConsensusError::UnknownAlgorithm(s.to_string()))
    }
}
