//! Proof-of-work verification and per-algorithm difficulty.
//!
//! A header passes when its digest under its own algorithm, read as a 256-bit number, does not
//! exceed the target encoded in its bits. All comparisons are integer comparisons.

pub mod retarget;

pub use retarget::{next_work_required, AlgoLineage, LineageBlock};

use chain_math::{difficulty_ratio, target_from_compact};
use consensus_core::header::Header;
use primitive_types::U256;

/// A header with its decoded target, for checking many nonces against the same bits.
pub struct State {
    pub(crate) target: Option<U256>,
    pub(crate) header: Header,
}

impl State {
    pub fn new(header: &Header) -> Self {
        Self { target: target_from_compact(header.bits).ok(), header: header.clone() }
    }

    #[inline]
    #[must_use]
    pub fn calculate_pow(&self, nonce: u64) -> U256 {
        let mut header = self.header.clone();
        header.nonce = nonce;
        header.pow_value()
    }

    #[inline]
    #[must_use]
    pub fn check_pow(&self, nonce: u64) -> (bool, U256) {
        let pow = self.calculate_pow(nonce);
        // The pow hash must be less or equal than the claimed target.
        (self.target.map_or(false, |target| pow <= target), pow)
    }
}

/// Checks the header's proof of work against its own bits and the network limit.
///
/// Fails for negative, overflowing or zero compact targets and for targets easier than `pow_limit`.
pub fn check_proof_of_work(header: &Header, pow_limit: U256) -> bool {
    let Ok(target) = target_from_compact(header.bits) else {
        return false;
    };
    if target > pow_limit {
        return false;
    }
    header.pow_value() <= target
}

/// How many times harder `bits` is than the network limit. For display only.
pub fn difficulty(bits: u32, pow_limit: U256) -> f64 {
    match target_from_compact(bits) {
        Ok(target) => difficulty_ratio(pow_limit, target),
        Err(_) => 0.0,
    }
}
