use std::collections::{HashMap, HashSet};

use crate::tx::{TransactionOutpoint, UtxoEntry};
use crate::utxo::{UtxoDiff, UtxoInquirer};

/// Staged view over a base set: outputs added and spent by the transactions processed so far.
///
/// Validation runs a whole block through a view, so later transactions see outputs of earlier
/// ones and an outpoint cannot be spent twice within the block. The base is never touched.
pub struct UtxoView<'a, I: UtxoInquirer + ?Sized> {
    base: &'a I,
    added: HashMap<TransactionOutpoint, UtxoEntry>,
    created_order: Vec<TransactionOutpoint>,
    spent_from_base: HashSet<TransactionOutpoint>,
    spent_order: Vec<(TransactionOutpoint, UtxoEntry)>,
}

impl<'a, I: UtxoInquirer + ?Sized> UtxoView<'a, I> {
    pub fn new(base: &'a I) -> Self {
        Self {
            base,
            added: HashMap::new(),
            created_order: Vec::new(),
            spent_from_base: HashSet::new(),
            spent_order: Vec::new(),
        }
    }

    pub fn add(&mut self, outpoint: TransactionOutpoint, entry: UtxoEntry) {
        if self.added.insert(outpoint, entry).is_none() {
            self.created_order.push(outpoint);
        }
    }

    /// Removes `outpoint` from the view and returns what it held, `None` if missing or already spent.
    pub fn spend(&mut self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        if let Some(entry) = self.added.remove(outpoint) {
            return Some(entry);
        }
        if self.spent_from_base.contains(outpoint) {
            return None;
        }
        let entry = self.base.get_utxo(outpoint)?;
        self.spent_from_base.insert(*outpoint);
        self.spent_order.push((*outpoint, entry.clone()));
        Some(entry)
    }

    pub fn into_diff(mut self) -> UtxoDiff {
        let created = self.created_order.into_iter().filter_map(|o| self.added.remove(&o).map(|e| (o, e))).collect();
        UtxoDiff { spent: self.spent_order, created }
    }
}

impl<I: UtxoInquirer + ?Sized> UtxoInquirer for UtxoView<'_, I> {
    fn get_utxo(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        if let Some(entry) = self.added.get(outpoint) {
            return Some(entry.clone());
        }
        if self.spent_from_base.contains(outpoint) {
            return None;
        }
        self.base.get_utxo(outpoint)
    }
}
