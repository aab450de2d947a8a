use std::sync::Arc;

use consensus_core::block::Block;
use consensus_core::Hash;

use crate::chain_index::BlockIndexEntry;

#[derive(Clone, Debug)]
pub enum ChainEvent {
    BlockConnected { block: Arc<Block>, entry: BlockIndexEntry },
    BlockDisconnected { block: Arc<Block> },
    /// Emitted once after a reorganization, with the new tip and the last block both branches share.
    TipUpdated { new_tip: Hash, fork_point: Hash },
}

impl ChainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BlockConnected { .. } => "block_connected",
            Self::BlockDisconnected { .. } => "block_disconnected",
            Self::TipUpdated { .. } => "tip_updated",
        }
    }
}

/// Receives chain events on the dispatcher thread. Callbacks must not block on the chain
/// itself or on the dispatcher: no `sync`, no `unsubscribe` from inside a callback.
pub trait ChainObserver: Send + Sync {
    fn block_connected(&self, _block: &Arc<Block>, _entry: &BlockIndexEntry) {}

    fn block_disconnected(&self, _block: &Arc<Block>) {}

    fn tip_updated(&self, _new_tip: &Hash, _fork_point: &Hash) {}
}

impl ChainEvent {
    pub(crate) fn deliver(&self, observer: &dyn ChainObserver) {
        match self {
            Self::BlockConnected { block, entry } => observer.block_connected(block, entry),
            Self::BlockDisconnected { block } => observer.block_disconnected(block),
            Self::TipUpdated { new_tip, fork_point } => observer.tip_updated(new_tip, fork_point),
        }
    }
}
