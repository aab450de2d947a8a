use std::collections::HashMap;

use crypto_hashes::{HashWriter, Hashable};
use serde::{Deserialize, Serialize};

use crate::errors::ConsensusError;
use crate::tx::{TransactionOutpoint, UtxoEntry};
use crate::utxo::{UtxoDiff, UtxoInquirer};
use crate::Hash;

impl Hashable for UtxoEntry {
    fn hash_into(&self, writer: &mut HashWriter) {
        writer
            .write_u64(self.amount)
            .write_var_bytes(self.script_public_key.script())
            .write_u64(self.block_height)
            .write_u8(self.is_coinbase as u8);
    }
}

/// In-memory UTXO set.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UtxoCollection {
    utxos: HashMap<TransactionOutpoint, UtxoEntry>,
}

impl UtxoCollection {
    /// Create a new empty collection
    pub fn new() -> Self {
        Self { utxos: HashMap::new() }
    }

    /// Returns true if the outpoint exists in the set
    pub fn contains(&self, outpoint: &TransactionOutpoint) -> bool {
        self.utxos.contains_key(outpoint)
    }

    /// Get a reference to a UTXO entry
    pub fn get(&self, outpoint: &TransactionOutpoint) -> Option<&UtxoEntry> {
        self.utxos.get(outpoint)
    }

    /// Insert a new UTXO entry (overwrites if exists)
    pub fn insert(&mut self, outpoint: TransactionOutpoint, entry: UtxoEntry) {
        self.utxos.insert(outpoint, entry);
    }

    /// Remove and return an entry
    pub fn remove(&mut self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        self.utxos.remove(outpoint)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TransactionOutpoint, &UtxoEntry)> {
        self.utxos.iter()
    }

    /// Sum of all amounts
    pub fn total_supply(&self) -> u128 {
        self.utxos.values().map(|e| e.amount as u128).sum()
    }

    /// Checks that `diff` applies cleanly: every spent outpoint present, no created outpoint present.
    pub fn can_apply(&self, diff: &UtxoDiff) -> Result<(), ConsensusError> {
        if let Some((outpoint, _)) = diff.spent.iter().find(|(o, _)| !self.contains(o)) {
            return Err(ConsensusError::MissingOrSpentInput(*outpoint));
        }
        if let Some((outpoint, _)) = diff.created.iter().find(|(o, _)| self.contains(o)) {
            return Err(ConsensusError::MissingOrSpentInput(*outpoint));
        }
        Ok(())
    }

    /// Applies a block's net effect. Callers check [`Self::can_apply`] first.
    pub fn apply(&mut self, diff: &UtxoDiff) {
        for (outpoint, _) in &diff.spent {
            self.remove(outpoint);
        }
        for (outpoint, entry) in &diff.created {
            self.insert(*outpoint, entry.clone());
        }
    }

    /// Exact inverse of [`Self::apply`], walking both lists backwards.
    pub fn rollback(&mut self, diff: &UtxoDiff) {
        for (outpoint, _) in diff.created.iter().rev() {
            self.remove(outpoint);
        }
        for (outpoint, entry) in diff.spent.iter().rev() {
            self.insert(*outpoint, entry.clone());
        }
    }

    /// SHA-256 over the set in outpoint order. Equal sets give equal digests regardless of history.
    pub fn digest(&self) -> Hash {
        let mut sorted: Vec<_> = self.utxos.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let mut writer = HashWriter::new();
        writer.write_u64(sorted.len() as u64);
        for (outpoint, entry) in sorted {
            writer.hash_object(outpoint).hash_object(entry);
        }
        writer.finalize()
    }
}

impl UtxoInquirer for UtxoCollection {
    fn get_utxo(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        self.utxos.get(outpoint).cloned()
    }
}

impl FromIterator<(TransactionOutpoint, UtxoEntry)> for UtxoCollection {
    fn from_iter<T: IntoIterator<Item = (TransactionOutpoint, UtxoEntry)>>(iter: T) -> Self {
        Self { utxos: iter.into_iter().collect() }
    }
}
