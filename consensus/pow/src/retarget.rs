//! Per-algorithm difficulty retargeting.
//!
//! Each algorithm is retargeted only from blocks mined with that same algorithm, found by
//! walking the chain through [`AlgoLineage`]. The new target is the average target of the last
//! `retarget_window` lineage blocks scaled by how long they took against the expected span,
//! with the span clamped to a factor of four either way and the result capped at the limit.

use chain_math::{compact_from_target, target_from_compact};
use consensus_core::config::Params;
use consensus_core::{Hash, PowAlgorithm};
use primitive_types::U256;
use tracing::trace;

/// The parts of an ancestor the retarget needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineageBlock {
    pub hash: Hash,
    pub prev_hash: Hash,
    pub timestamp: u64,
    pub bits: u32,
}

/// Chain access for lineage walks.
pub trait AlgoLineage {
    /// The most recent block mined with `algo` among `from` and its ancestors.
    fn last_with_algo(&self, from: &Hash, algo: PowAlgorithm) -> Option<LineageBlock>;
}

/// Compact bits a child of `parent` mined with `algo` must carry.
pub fn next_work_required(params: &Params, parent: &Hash, algo: PowAlgorithm, lineage: &impl AlgoLineage) -> u32 {
    let limit = params.pow_limit();
    if params.pow_no_retargeting || params.retarget_window == 0 {
        return params.pow_limit_bits;
    }

    let window = params.retarget_window;
    let mut blocks = Vec::with_capacity(window + 1);
    let mut cursor = lineage.last_with_algo(parent, algo);
    while let Some(block) = cursor {
        let prev = block.prev_hash;
        blocks.push(block);
        if blocks.len() > window || prev.is_zero() {
            break;
        }
        cursor = lineage.last_with_algo(&prev, algo);
    }

    if blocks.len() <= window {
        trace!("{algo} lineage has {} of {} blocks, using the limit", blocks.len(), window + 1);
        return params.pow_limit_bits;
    }

    let window_u256 = U256::from(window as u64);
    let average = blocks[..window]
        .iter()
        .map(|b| target_from_compact(b.bits).unwrap_or(limit) / window_u256)
        .fold(U256::zero(), |acc, t| acc.saturating_add(t));

    let expected = window as u64 * params.algo_spacing();
    let actual = blocks[0].timestamp.saturating_sub(blocks[window].timestamp).clamp(expected / 4, expected * 4);

    let next = average.checked_mul(U256::from(actual)).map(|t| t / U256::from(expected.max(1))).unwrap_or(limit);
    let next = next.min(limit);
    trace!("{algo} retarget: span {actual}s of expected {expected}s");
    compact_from_target(next)
}
