//! Connects blocks to and disconnects them from the active tip.
//!
//! The executor owns the UTXO ledger. Every connect or disconnect commits the UTXO changes, the
//! undo record, the new tip and the entry's status as one store batch, and only touches memory
//! after that batch is written. A failed write therefore leaves both the store and the in-memory
//! state exactly as they were.

use std::sync::Arc;

use consensus_core::block::Block;
use consensus_core::blockstatus::BlockStatus;
use consensus_core::config::Params;
use consensus_core::tx::{TransactionOutpoint, UtxoEntry};
use consensus_core::utxo::{UtxoCollection, UtxoDiff};
use consensus_core::{Hash, ZERO_HASH};
use database::stores::ChainStores;
use database::WriteBatch;
use tracing::{debug, info, warn};

use crate::chain_index::{BlockIndexEntry, ChainIndex};
use crate::errors::{ChainError, ChainResult};
use crate::validation::ContextualValidator;

pub struct Executor {
    ledger: UtxoCollection,
    stores: ChainStores,
    contextual: ContextualValidator,
}

impl Executor {
    pub fn new(params: Arc<Params>, stores: ChainStores) -> Self {
        Self { ledger: UtxoCollection::new(), stores, contextual: ContextualValidator::new(params) }
    }

    /// Restores the ledger persisted by earlier connects.
    pub fn load(params: Arc<Params>, stores: ChainStores) -> ChainResult<Self> {
        let ledger: UtxoCollection = stores.utxos.load_all()?.into_iter().collect();
        info!("loaded {} unspent outputs", ledger.len());
        Ok(Self { ledger, stores, contextual: ContextualValidator::new(params) })
    }

    pub fn ledger(&self) -> &UtxoCollection {
        &self.ledger
    }

    pub fn utxo(&self, outpoint: &TransactionOutpoint) -> Option<&UtxoEntry> {
        self.ledger.get(outpoint)
    }

    /// Deterministic digest of the ledger. Equal block sets give equal digests.
    pub fn ledger_digest(&self) -> Hash {
        self.ledger.digest()
    }

    pub fn load_block(&self, hash: &Hash) -> ChainResult<Block> {
        self.stores.blocks.get_block(hash)?.ok_or_else(|| ChainError::Internal(format!("body of {hash} is not stored")))
    }

    /// Connects `block`, whose parent must be the active tip.
    ///
    /// A body that breaks a consensus rule marks the entry and its descendants invalid and is
    /// returned as [`ChainError::Rejected`]; nothing is applied.
    pub fn connect(&mut self, index: &mut ChainIndex, block: &Block) -> ChainResult<BlockIndexEntry> {
        let hash = block.hash();
        let entry = index.get(&hash).cloned().ok_or_else(|| ChainError::Internal(format!("connecting unindexed block {hash}")))?;
        let tip = index.best_tip().unwrap_or(ZERO_HASH);
        if entry.parent() != tip {
            return Err(ChainError::Internal(format!("block {hash} does not extend tip {tip}")));
        }

        let diff = if entry.header.is_genesis() {
            ContextualValidator::trusted_diff(block, entry.height, &self.ledger)
        } else {
            let checked = self
                .contextual
                .validate_block_with_utxo(block, entry.height, &self.ledger)
                .and_then(|diff| self.ledger.can_apply(&diff).map(|_| diff));
            match checked {
                Ok(diff) => diff,
                Err(err) => {
                    warn!("block {hash} at height {} failed to connect: {err}", entry.height);
                    index.invalidate_with_descendants(&hash)?;
                    return Err(err.into());
                }
            }
        };

        let mut batch = WriteBatch::new();
        self.stores.utxos.stage_apply(&mut batch, &diff)?;
        self.stores.undo.stage_put(&mut batch, &hash, &diff)?;
        self.stores.metadata.stage_tip(&mut batch, &hash);
        index.stage_status(&mut batch, &hash, BlockStatus::Connected)?;
        self.stores.db.write(batch)?;

        self.ledger.apply(&diff);
        index.apply_status(&hash, BlockStatus::Connected);
        index.set_tip(Some(hash));
        debug!("connected {hash} at height {} (+{} -{})", entry.height, diff.created.len(), diff.spent.len());
        Ok(BlockIndexEntry { status: BlockStatus::Connected, ..entry })
    }

    /// Disconnects the active tip, making its parent the tip again. Returns the disconnected hash.
    pub fn disconnect(&mut self, index: &mut ChainIndex) -> ChainResult<Hash> {
        let tip = index.tip_entry().cloned().ok_or_else(|| ChainError::Internal("no tip to disconnect".into()))?;
        if tip.status != BlockStatus::Connected || tip.header.is_genesis() {
            return Err(ChainError::Internal(format!("tip {} cannot be disconnected", tip.hash)));
        }
        let diff: UtxoDiff =
            self.stores.undo.get(&tip.hash)?.ok_or_else(|| ChainError::Internal(format!("no undo record for {}", tip.hash)))?;

        let parent = tip.parent();
        let mut batch = WriteBatch::new();
        self.stores.utxos.stage_rollback(&mut batch, &diff)?;
        self.stores.undo.stage_delete(&mut batch, &tip.hash);
        self.stores.metadata.stage_tip(&mut batch, &parent);
        index.stage_status(&mut batch, &tip.hash, BlockStatus::Valid)?;
        self.stores.db.write(batch)?;

        self.ledger.rollback(&diff);
        index.apply_status(&tip.hash, BlockStatus::Valid);
        index.set_tip(Some(parent));
        debug!("disconnected {} at height {}", tip.hash, tip.height);
        Ok(tip.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::test_utils::{spend_tx, BlockBuilder};
    use database::memory::WriteFault;
    use database::{Column, MemoryDb};

    struct Harness {
        db: Arc<MemoryDb>,
        stores: ChainStores,
        params: Params,
        index: ChainIndex,
        executor: Executor,
        genesis: Block,
    }

    impl Harness {
        fn new() -> Self {
            let mut params = Params::regtest();
            params.coinbase_maturity = 1;
            let db = Arc::new(MemoryDb::new());
            let stores = ChainStores::new(db.clone());
            let mut index = ChainIndex::new(stores.headers.clone());
            let mut executor = Executor::new(Arc::new(params.clone()), stores.clone());
            let genesis = params.genesis_block();
            index.insert_header(&genesis.header).unwrap();
            executor.connect(&mut index, &genesis).unwrap();
            Self { db, stores, params, index, executor, genesis }
        }

        fn index_block(&mut self, block: &Block) {
            self.index.insert_header(&block.header).unwrap();
            self.stores.blocks.put_block(block).unwrap();
            self.index.set_body_valid(&block.hash()).unwrap();
        }
    }

    #[test]
    fn test_connect_disconnect_restores_ledger() {
        let mut h = Harness::new();
        let after_genesis = h.executor.ledger_digest();
        let genesis_out = TransactionOutpoint::new(h.genesis.transactions[0].id(), 0);

        let a = BlockBuilder::new(&h.params, &h.genesis.header, 0).tx(spend_tx(genesis_out, 10, 0)).build();
        h.index_block(&a);
        let entry = h.executor.connect(&mut h.index, &a).unwrap();
        assert_eq!(entry.status, BlockStatus::Connected);
        assert_eq!(h.index.best_tip(), Some(a.hash()));
        assert!(h.executor.utxo(&genesis_out).is_none());
        assert_eq!(h.stores.metadata.tip().unwrap(), Some(a.hash()));

        assert_eq!(h.executor.disconnect(&mut h.index).unwrap(), a.hash());
        assert_eq!(h.executor.ledger_digest(), after_genesis);
        assert_eq!(h.index.best_tip(), Some(h.genesis.hash()));
        assert_eq!(h.index.get(&a.hash()).unwrap().status, BlockStatus::Valid);
        assert!(h.stores.undo.get(&a.hash()).unwrap().is_none());
        assert!(h.executor.disconnect(&mut h.index).is_err());
    }

    #[test]
    fn test_failed_write_changes_nothing() {
        let mut h = Harness::new();
        let before = h.executor.ledger_digest();
        let a = BlockBuilder::new(&h.params, &h.genesis.header, 0).build();
        h.index_block(&a);

        h.db.inject_fault(WriteFault::OnPut { column: Column::Undo, key: a.hash().as_bytes().to_vec() });
        assert!(matches!(h.executor.connect(&mut h.index, &a), Err(ChainError::Storage(_))));
        assert_eq!(h.executor.ledger_digest(), before);
        assert_eq!(h.index.best_tip(), Some(h.genesis.hash()));
        assert_eq!(h.index.get(&a.hash()).unwrap().status, BlockStatus::Valid);

        h.db.clear_fault();
        h.executor.connect(&mut h.index, &a).unwrap();
        let reloaded = Executor::load(Arc::new(h.params.clone()), h.stores.clone()).unwrap();
        assert_eq!(reloaded.ledger_digest(), h.executor.ledger_digest());
    }

    #[test]
    fn test_bad_body_invalidates_entry() {
        let mut h = Harness::new();
        let missing = TransactionOutpoint::new(Hash::from_le_u64([9, 9, 9, 9]), 0);
        let bad = BlockBuilder::new(&h.params, &h.genesis.header, 0).tx(spend_tx(missing, 1, 0)).build();
        h.index_block(&bad);
        let child = BlockBuilder::new(&h.params, &bad.header, 1).build();
        h.index_block(&child);

        let err = h.executor.connect(&mut h.index, &bad).unwrap_err();
        assert_eq!(err.as_rejection().unwrap().reject_reason(), "bad-txns-inputs-missingorspent");
        assert!(h.index.get(&bad.hash()).unwrap().status.is_invalid());
        assert!(h.index.get(&child.hash()).unwrap().status.is_invalid());
        assert_eq!(h.index.best_tip(), Some(h.genesis.hash()));
    }

    #[test]
    fn test_connect_requires_tip_parent() {
        let mut h = Harness::new();
        let a = BlockBuilder::new(&h.params, &h.genesis.header, 0).build();
        let b = BlockBuilder::new(&h.params, &a.header, 1).build();
        h.index_block(&a);
        h.index_block(&b);
        assert!(matches!(h.executor.connect(&mut h.index, &b), Err(ChainError::Internal(_))));
    }
}
