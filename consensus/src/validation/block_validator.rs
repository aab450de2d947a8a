//! Stateless block validation
//!
//! Checks, in order, stopping at the first failure:
//! - Structure: transactions present, exactly one coinbase and it comes first
//! - Merkle root matches and the tree is not mutated
//! - Header algorithm and proof of work
//! - No transaction timestamped past the allowed drift
//! - Header time not too far in the future
//! - Block signature when the coinbase pays a public key
//!
//! Nothing here reads chain state, so blocks from many sources are checked in parallel.

use std::sync::Arc;

use consensus_core::block::Block;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::sign::check_block_signature;

use super::header_validator::HeaderValidator;
use crate::types::CheckFlags;

pub struct BlockValidator {
    params: Arc<Params>,
    header_validator: HeaderValidator,
}

impl BlockValidator {
    pub fn new(params: Arc<Params>) -> Self {
        Self { header_validator: HeaderValidator::new(params.clone()), params }
    }

    pub fn header_validator(&self) -> &HeaderValidator {
        &self.header_validator
    }

    /// Every check that needs only the block and the adjusted time.
    pub fn check_block(&self, block: &Block, now: u64, flags: CheckFlags) -> ConsensusResult<()> {
        self.check_structure(block)?;
        if flags.check_merkle_root {
            self.check_merkle_root(block)?;
        }
        self.header_validator.check_algo_and_pow(&block.header, flags)?;
        self.check_transaction_times(block, now)?;
        self.header_validator.check_future_time(&block.header, now)?;
        if flags.check_signature {
            check_block_signature(block)?;
        }
        Ok(())
    }

    fn check_structure(&self, block: &Block) -> ConsensusResult<()> {
        let (first, rest) = block.transactions.split_first().ok_or(ConsensusError::EmptyTransactionList)?;
        if !first.is_coinbase() {
            return Err(ConsensusError::MissingCoinbase);
        }
        if rest.iter().any(|tx| tx.is_coinbase()) {
            return Err(ConsensusError::MultipleCoinbase);
        }
        for tx in &block.transactions {
            tx.check_sanity()?;
        }
        Ok(())
    }

    fn check_merkle_root(&self, block: &Block) -> ConsensusResult<()> {
        let tree = block.merkle_tree();
        let computed = tree.root();
        if computed != block.header.merkle_root {
            return Err(ConsensusError::BadMerkleRoot { expected: block.header.merkle_root, computed });
        }
        if tree.is_mutated() {
            return Err(ConsensusError::MutatedMerkleTree);
        }
        Ok(())
    }

    /// The header's own time does not matter here: every transaction is bounded by the clock.
    fn check_transaction_times(&self, block: &Block, now: u64) -> ConsensusResult<()> {
        let limit = now.saturating_add(self.params.max_tx_future_drift);
        match block.transactions.iter().find(|tx| tx.time > limit) {
            Some(tx) => Err(ConsensusError::TransactionTimeTooNew { txid: tx.id(), time: tx.time, limit }),
            None => Ok(()),
        }
    }
}
