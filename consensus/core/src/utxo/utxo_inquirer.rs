use crate::tx::{TransactionOutpoint, UtxoEntry};

/// Read access to a set of unspent outputs.
pub trait UtxoInquirer {
    fn get_utxo(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry>;

    fn has_utxo(&self, outpoint: &TransactionOutpoint) -> bool {
        self.get_utxo(outpoint).is_some()
    }
}
