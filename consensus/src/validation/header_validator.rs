//! Header validation
//!
//! Context-free: algorithm enabled, proof of work, not too far in the future.
//! Against the parent: required difficulty bits for the algorithm, after median time past.

use std::sync::Arc;

use chain_math::target_from_compact;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::header::Header;
use consensus_pow::{check_proof_of_work, next_work_required};

use crate::chain_index::{BlockIndexEntry, ChainIndex};
use crate::types::CheckFlags;

pub struct HeaderValidator {
    params: Arc<Params>,
}

impl HeaderValidator {
    pub fn new(params: Arc<Params>) -> Self {
        Self { params }
    }

    pub fn validate_header(&self, header: &Header, now: u64, flags: CheckFlags) -> ConsensusResult<()> {
        self.check_algo_and_pow(header, flags)?;
        self.check_future_time(header, now)
    }

    pub fn check_algo_and_pow(&self, header: &Header, flags: CheckFlags) -> ConsensusResult<()> {
        if !self.params.is_algo_enabled(header.algo) {
            return Err(ConsensusError::AlgorithmDisabled(header.algo));
        }
        if flags.check_pow && !check_proof_of_work(header, self.params.pow_limit()) {
            return Err(ConsensusError::InvalidProofOfWork);
        }
        Ok(())
    }

    pub fn check_future_time(&self, header: &Header, now: u64) -> ConsensusResult<()> {
        let limit = now.saturating_add(self.params.max_future_block_time);
        if header.timestamp > limit {
            return Err(ConsensusError::BlockTimeTooNew { time: header.timestamp, limit });
        }
        Ok(())
    }

    /// Rules that need the parent: difficulty bits and median time past.
    pub fn validate_in_context(
        &self,
        header: &Header,
        parent: &BlockIndexEntry,
        index: &ChainIndex,
        flags: CheckFlags,
    ) -> ConsensusResult<()> {
        if flags.check_difficulty {
            self.check_difficulty_bits(header, parent, index)?;
        }
        let median = index.median_time_past(&parent.hash);
        if header.timestamp <= median {
            return Err(ConsensusError::BlockTimeTooOld { time: header.timestamp, median });
        }
        Ok(())
    }

    fn check_difficulty_bits(&self, header: &Header, parent: &BlockIndexEntry, index: &ChainIndex) -> ConsensusResult<()> {
        if self.params.pow_no_retargeting {
            // Any target up to the limit
            return match target_from_compact(header.bits) {
                Ok(target) if target <= self.params.pow_limit() => Ok(()),
                _ => Err(ConsensusError::BadDifficultyBits { expected: self.params.pow_limit_bits, actual: header.bits }),
            };
        }
        let expected = next_work_required(&self.params, &parent.hash, header.algo, index);
        if header.bits != expected {
            return Err(ConsensusError::BadDifficultyBits { expected, actual: header.bits });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::test_utils::{unmine, BlockBuilder};
    use consensus_core::PowAlgorithm;

    fn validator(params: Params) -> HeaderValidator {
        HeaderValidator::new(Arc::new(params))
    }

    #[test]
    fn test_context_free_rules() {
        let params = Params::regtest();
        let genesis = params.genesis_block();
        let now = genesis.header.timestamp + 100;
        let v = validator(params.clone());

        let mut header = BlockBuilder::new(&params, &genesis.header, 0).build().header;
        assert!(v.validate_header(&header, now, CheckFlags::all()).is_ok());

        unmine(&mut header);
        assert_eq!(v.validate_header(&header, now, CheckFlags::all()), Err(ConsensusError::InvalidProofOfWork));
        let no_pow = CheckFlags { check_pow: false, ..CheckFlags::all() };
        assert!(v.validate_header(&header, now, no_pow).is_ok());

        header.timestamp = now + params.max_future_block_time + 1;
        assert_eq!(v.validate_header(&header, now, no_pow).unwrap_err().reject_reason(), "time-too-new");

        let mut restricted = params.clone();
        restricted.enabled_algos = vec![PowAlgorithm::Sha256d];
        let header = BlockBuilder::new(&params, &genesis.header, 0).algo(PowAlgorithm::Keccak).build().header;
        assert_eq!(
            validator(restricted).validate_header(&header, now, CheckFlags::all()),
            Err(ConsensusError::AlgorithmDisabled(PowAlgorithm::Keccak))
        );
    }
}
