use serde::{Deserialize, Serialize};

use crate::tx::{TransactionOutpoint, UtxoEntry};

/// Net effect of connecting one block on the UTXO set, kept as the block's undo record.
///
/// `spent` holds the consumed entries in spend order so they can be restored verbatim.
/// Outputs created and spent inside the same block appear in neither list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UtxoDiff {
    pub spent: Vec<(TransactionOutpoint, UtxoEntry)>,
    pub created: Vec<(TransactionOutpoint, UtxoEntry)>,
}

impl UtxoDiff {
    pub fn new() -> Self {
        Self { spent: Vec::new(), created: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.spent.is_empty() && self.created.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptPublicKey;

    #[test]
    fn diff_roundtrip() {
        let outpoint = TransactionOutpoint::new(Default::default(), 0);
        let entry = UtxoEntry::new(10, ScriptPublicKey::anyone_can_spend(), 0, false);
        let mut d = UtxoDiff::new();
        d.spent.push((outpoint, entry.clone()));
        d.created.push((TransactionOutpoint::new(Default::default(), 1), entry));
        let ser = bincode::serialize(&d).unwrap();
        let de: UtxoDiff = bincode::deserialize(&ser).unwrap();
        assert_eq!(d, de);
        assert!(!de.is_empty());
    }
}
