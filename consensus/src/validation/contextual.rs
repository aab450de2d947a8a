//! Contextual body validation
//!
//! Runs a block's transactions through a view of its parent's ledger and produces the block's
//! undo record. The coinbase may claim at most the subsidy plus the fees of the block.

use std::sync::Arc;

use consensus_core::block::Block;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::utxo::{UtxoDiff, UtxoInquirer, UtxoView};
use consensus_core::BlockHeight;

use super::transaction_validator::TransactionValidator;

pub struct ContextualValidator {
    params: Arc<Params>,
    transaction_validator: TransactionValidator,
}

impl ContextualValidator {
    pub fn new(params: Arc<Params>) -> Self {
        Self { transaction_validator: TransactionValidator::new(params.coinbase_maturity), params }
    }

    /// Validates `block` at `height` on top of `ledger` and returns its net effect.
    pub fn validate_block_with_utxo<I: UtxoInquirer + ?Sized>(
        &self,
        block: &Block,
        height: BlockHeight,
        ledger: &I,
    ) -> ConsensusResult<UtxoDiff> {
        let (coinbase, rest) = block.transactions.split_first().ok_or(ConsensusError::EmptyTransactionList)?;
        let mut view = UtxoView::new(ledger);
        TransactionValidator::add_outputs(coinbase, &mut view, height);

        let mut fees = 0u64;
        for tx in rest {
            let fee = self.transaction_validator.spend_inputs(tx, &mut view, height)?;
            fees = fees.checked_add(fee).ok_or(ConsensusError::OutputValueOverflow(tx.id()))?;
            TransactionValidator::add_outputs(tx, &mut view, height);
        }

        let allowed = self.params.block_subsidy(height).saturating_add(fees);
        let actual = coinbase.total_output_value().ok_or(ConsensusError::OutputValueOverflow(coinbase.id()))?;
        if actual > allowed {
            return Err(ConsensusError::BadCoinbaseAmount { actual, allowed });
        }
        Ok(view.into_diff())
    }

    /// Undo record of a block applied without checks. Used for genesis only.
    pub fn trusted_diff<I: UtxoInquirer + ?Sized>(block: &Block, height: BlockHeight, ledger: &I) -> UtxoDiff {
        let mut view = UtxoView::new(ledger);
        for tx in &block.transactions {
            TransactionValidator::add_outputs(tx, &mut view, height);
        }
        view.into_diff()
    }
}
