//! Transaction validation against spendable outputs
//!
//! Every input must reference an output that is still unspent in the view, coinbase outputs
//! must be mature, the spending script must satisfy the locking script, and inputs must cover
//! outputs. Spending happens inside the view, so a second spend in the same block fails.

use consensus_core::errors::{ConsensusError, ConsensusResult};
use consensus_core::script::verify_input;
use consensus_core::tx::{Transaction, UtxoEntry};
use consensus_core::utxo::{UtxoInquirer, UtxoView};
use consensus_core::BlockHeight;

pub struct TransactionValidator {
    coinbase_maturity: u64,
}

impl TransactionValidator {
    pub fn new(coinbase_maturity: u64) -> Self {
        Self { coinbase_maturity }
    }

    /// Spends the inputs of `tx` from `view` and returns the fee. On error the view is left
    /// partially spent, callers discard it.
    pub fn spend_inputs<I: UtxoInquirer + ?Sized>(
        &self,
        tx: &Transaction,
        view: &mut UtxoView<'_, I>,
        height: BlockHeight,
    ) -> ConsensusResult<u64> {
        let txid = tx.id();
        let mut total_in = 0u64;
        for (index, input) in tx.inputs.iter().enumerate() {
            let outpoint = input.previous_outpoint;
            let entry = view.spend(&outpoint).ok_or(ConsensusError::MissingOrSpentInput(outpoint))?;
            if entry.is_coinbase {
                let confirmations = height.saturating_sub(entry.block_height);
                if confirmations < self.coinbase_maturity {
                    return Err(ConsensusError::PrematureCoinbaseSpend { outpoint, confirmations });
                }
            }
            if !verify_input(tx, index, &entry.script_public_key) {
                return Err(ConsensusError::ScriptVerifyFailed(outpoint));
            }
            total_in = total_in.checked_add(entry.amount).ok_or(ConsensusError::OutputValueOverflow(txid))?;
        }

        let total_out = tx.total_output_value().ok_or(ConsensusError::OutputValueOverflow(txid))?;
        if total_in < total_out {
            return Err(ConsensusError::InputsBelowOutputs(txid));
        }
        Ok(total_in - total_out)
    }

    /// Adds the spendable outputs of `tx` to `view`.
    pub fn add_outputs<I: UtxoInquirer + ?Sized>(tx: &Transaction, view: &mut UtxoView<'_, I>, height: BlockHeight) {
        let is_coinbase = tx.is_coinbase();
        for (outpoint, output) in tx.created_outpoints().zip(&tx.outputs) {
            if output.script_public_key.is_unspendable() {
                continue;
            }
            view.add(outpoint, UtxoEntry::new(output.value, output.script_public_key.clone(), height, is_coinbase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::script::ScriptPublicKey;
    use consensus_core::test_utils::{p2pk_script, secret_key, sign_input, spend_tx};
    use consensus_core::tx::TransactionOutpoint;
    use consensus_core::utxo::UtxoCollection;
    use consensus_core::Hash;

    fn outpoint(n: u64) -> TransactionOutpoint {
        TransactionOutpoint::new(Hash::from_le_u64([n, 0, 0, 0]), 0)
    }

    #[test]
    fn test_spend_rules() {
        let mut base = UtxoCollection::new();
        base.insert(outpoint(1), UtxoEntry::new(100, ScriptPublicKey::anyone_can_spend(), 1, false));
        base.insert(outpoint(2), UtxoEntry::new(100, ScriptPublicKey::anyone_can_spend(), 5, true));
        let v = TransactionValidator::new(10);

        let mut view = UtxoView::new(&base);
        assert_eq!(v.spend_inputs(&spend_tx(outpoint(1), 60, 0), &mut view, 20), Ok(40));
        assert_eq!(
            v.spend_inputs(&spend_tx(outpoint(1), 60, 0), &mut view, 20),
            Err(ConsensusError::MissingOrSpentInput(outpoint(1)))
        );
        assert_eq!(v.spend_inputs(&spend_tx(outpoint(9), 1, 0), &mut view, 20).unwrap_err().reject_reason(), "bad-txns-inputs-missingorspent");

        let mut view = UtxoView::new(&base);
        let err = v.spend_inputs(&spend_tx(outpoint(2), 1, 0), &mut view, 14).unwrap_err();
        assert_eq!(err, ConsensusError::PrematureCoinbaseSpend { outpoint: outpoint(2), confirmations: 9 });
        assert_eq!(v.spend_inputs(&spend_tx(outpoint(2), 1, 0), &mut UtxoView::new(&base), 15), Ok(99));

        let overspend = spend_tx(outpoint(1), 101, 0);
        assert_eq!(v.spend_inputs(&overspend, &mut UtxoView::new(&base), 20).unwrap_err().reject_reason(), "bad-txns-in-belowout");
    }

    #[test]
    fn test_script_must_unlock() {
        let key = secret_key("owner");
        let mut base = UtxoCollection::new();
        base.insert(outpoint(3), UtxoEntry::new(100, p2pk_script(&key), 1, false));
        let v = TransactionValidator::new(10);

        let unsigned = spend_tx(outpoint(3), 50, 0);
        assert_eq!(v.spend_inputs(&unsigned, &mut UtxoView::new(&base), 2), Err(ConsensusError::ScriptVerifyFailed(outpoint(3))));

        let mut signed = unsigned.clone();
        sign_input(&mut signed, 0, &key);
        assert_eq!(v.spend_inputs(&signed, &mut UtxoView::new(&base), 2), Ok(50));

        let mut wrong = unsigned;
        sign_input(&mut wrong, 0, &secret_key("thief"));
        assert!(v.spend_inputs(&wrong, &mut UtxoView::new(&base), 2).is_err());
    }
}
