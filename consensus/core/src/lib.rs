//! Consensus data model shared by every crate in the workspace.
//!
//! Headers, blocks, transactions, scripts and block signatures, together with the
//! consensus error vocabulary and the network parameters that drive validation.

pub mod algo;
pub mod block;
pub mod blockstatus;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod header;
pub mod script;
pub mod sign;
pub mod subsidy;
pub mod tx;
pub mod utxo;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use algo::PowAlgorithm;
pub use crypto_hashes::{Hash, ZERO_HASH};

/// Cumulative or per-block proof-of-work, in expected hashes.
pub type Work = primitive_types::U256;

/// Height of a block above genesis.
pub type BlockHeight = u64;
