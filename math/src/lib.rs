//! Fixed-width 256-bit arithmetic for targets, work and difficulty.
//!
//! Everything that gates consensus goes through [`U256`]. Floating point only
//! appears in [`difficulty_ratio`], which is meant for reporting.

pub mod compact;

pub use compact::{compact_from_target, target_from_compact, CompactError};
pub use primitive_types::U256;

/// Expected number of hashes to find a block under `target`, i.e. `2^256 / (target + 1)`.
///
/// Computed as `!target / (target + 1) + 1` so it never overflows 256 bits.
/// A zero target has no meaningful work and yields zero.
pub fn work_from_target(target: U256) -> U256 {
    if target.is_zero() {
        return U256::zero();
    }
    (!target / (target + U256::one())) + U256::one()
}

/// Work of a header from its compact bits, zero for malformed encodings.
pub fn work_from_compact(bits: u32) -> U256 {
    match target_from_compact(bits) {
        Ok(target) => work_from_target(target),
        Err(_) => U256::zero(),
    }
}

/// `pow_limit / target` as a float, for display only.
pub fn difficulty_ratio(pow_limit: U256, target: U256) -> f64 {
    if target.is_zero() {
        return 0.0;
    }
    let quotient = pow_limit / target;
    let remainder = pow_limit % target;
    u256_to_f64(quotient) + u256_to_f64(remainder) / u256_to_f64(target)
}

/// Lossy conversion, the low limbs lose precision beyond 53 significant bits.
pub fn u256_to_f64(value: U256) -> f64 {
    value.0.iter().rev().fold(0.0, |acc, limb| acc * 18_446_744_073_709_551_616.0 + *limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_of_half_space_target_is_two() {
        // 0x207fffff is the regtest limit: 0x7fffff << 232, roughly 2^255.
        assert_eq!(work_from_compact(0x207f_ffff), U256::from(2u64));
    }

    #[test]
    fn work_grows_as_target_shrinks() {
        let easy = work_from_compact(0x207f_ffff);
        let hard = work_from_compact(0x2000_ffff);
        assert!(hard > easy);
        assert_eq!(work_from_target(U256::zero()), U256::zero());
    }

    #[test]
    fn difficulty_ratio_of_limit_is_one() {
        let limit = target_from_compact(0x1d00_ffff).unwrap();
        assert_eq!(difficulty_ratio(limit, limit), 1.0);
        let harder = limit / U256::from(4u64);
        assert_eq!(difficulty_ratio(limit, harder), 4.0);
    }

    #[test]
    fn u256_to_f64_matches_small_values() {
        assert_eq!(u256_to_f64(U256::from(12345u64)), 12345.0);
        assert_eq!(u256_to_f64(U256::one() << 64), 18_446_744_073_709_551_616.0);
    }
}
