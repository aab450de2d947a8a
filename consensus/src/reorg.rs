//! Moves the active chain to the best candidate.
//!
//! Three cases for a candidate:
//! - its parent is the tip: connect it
//! - it has no more work than the tip: leave it as a valid side branch
//! - it has more work: disconnect back to the fork point, then connect the new branch
//!
//! When a block on the new branch fails to connect, the partial branch is disconnected and the
//! old branch reconnected before the next best candidate is tried. Events of a failed attempt
//! are dropped. If the old branch cannot be restored the node stops.

use std::sync::Arc;

use consensus_core::errors::ConsensusError;
use consensus_core::{Hash, ZERO_HASH};
use tracing::{error, info, warn};

use crate::chain_index::ChainIndex;
use crate::errors::{ChainError, ChainResult};
use crate::executor::Executor;
use crate::notify::ChainEvent;

/// What one activation did.
#[derive(Debug, Default)]
pub struct Activation {
    /// Events of the successful switch, in emission order
    pub events: Vec<ChainEvent>,
    /// Blocks that failed to connect, with the reason
    pub failures: Vec<(Hash, ConsensusError)>,
}

impl Activation {
    pub fn failure_for(&self, hash: &Hash) -> Option<&ConsensusError> {
        self.failures.iter().find(|(h, _)| h == hash).map(|(_, err)| err)
    }

    pub fn tip_changed(&self) -> bool {
        !self.events.is_empty()
    }
}

enum Attempt {
    Switched(Vec<ChainEvent>),
    Failed(Hash, ConsensusError),
}

/// Connects the best candidate, retrying with the next best after each failed switch.
///
/// A storage failure restores the previous tip and aborts the activation.
pub fn activate_best_chain(index: &mut ChainIndex, executor: &mut Executor) -> ChainResult<Activation> {
    let mut activation = Activation::default();
    let attempts = index.candidate_count() + 1;
    for _ in 0..attempts {
        let Some(candidate) = index.best_candidate() else {
            break;
        };
        if !is_improvement(index, &candidate) {
            break;
        }
        match switch_to(index, executor, candidate)? {
            Attempt::Switched(events) => activation.events.extend(events),
            Attempt::Failed(hash, err) => activation.failures.push((hash, err)),
        }
    }
    Ok(activation)
}

/// Strictly more work than the active tip. Ties keep the active branch.
fn is_improvement(index: &ChainIndex, candidate: &Hash) -> bool {
    let Some(tip) = index.tip_entry() else {
        return true;
    };
    match index.get(candidate) {
        Some(entry) => entry.hash != tip.hash && entry.cumulative_work > tip.cumulative_work,
        None => false,
    }
}

fn switch_to(index: &mut ChainIndex, executor: &mut Executor, candidate: Hash) -> ChainResult<Attempt> {
    let old_tip = index.best_tip();
    let fork = match old_tip {
        Some(tip) => index.fork_point(&tip, &candidate)?,
        None => ZERO_HASH,
    };
    let path = index.path_from(&fork, &candidate)?;
    let mut events = Vec::new();

    let mut disconnected = Vec::new();
    while index.best_tip() != Some(fork) && index.best_tip().is_some() {
        let outcome = executor.load_block(&index.best_tip().unwrap_or(ZERO_HASH)).and_then(|block| {
            executor.disconnect(index)?;
            Ok(block)
        });
        match outcome {
            Ok(block) => {
                disconnected.push(block.hash());
                events.push(ChainEvent::BlockDisconnected { block: Arc::new(block) });
            }
            Err(err) => {
                restore(index, executor, &[], &disconnected, old_tip);
                return Err(err);
            }
        }
    }

    let mut connected = Vec::new();
    for hash in path {
        let outcome = executor.load_block(&hash).and_then(|block| {
            let entry = executor.connect(index, &block)?;
            Ok((block, entry))
        });
        match outcome {
            Ok((block, entry)) => {
                connected.push(hash);
                events.push(ChainEvent::BlockConnected { block: Arc::new(block), entry });
            }
            Err(ChainError::Rejected(err)) => {
                warn!("switch to {candidate} failed at {hash}: {err}");
                restore(index, executor, &connected, &disconnected, old_tip);
                return Ok(Attempt::Failed(hash, err));
            }
            Err(err) => {
                error!("switch to {candidate} aborted at {hash}: {err}");
                restore(index, executor, &connected, &disconnected, old_tip);
                return Err(err);
            }
        }
    }

    if !disconnected.is_empty() {
        info!("reorganized to {candidate}, {} blocks disconnected from fork point {fork}", disconnected.len());
        events.push(ChainEvent::TipUpdated { new_tip: candidate, fork_point: fork });
    }
    Ok(Attempt::Switched(events))
}

/// Puts the old branch back: disconnect the `connected` blocks of the new branch, then reconnect
/// `disconnected` in reverse from wherever the tip now is.
///
/// Panics if that fails. The chain would otherwise be left without a consistent tip.
fn restore(index: &mut ChainIndex, executor: &mut Executor, connected: &[Hash], disconnected: &[Hash], old_tip: Option<Hash>) {
    let result = (|| -> ChainResult<()> {
        for hash in connected.iter().rev() {
            if index.best_tip() != Some(*hash) {
                return Err(ChainError::Internal(format!("expected tip {hash} while unwinding, found {:?}", index.best_tip())));
            }
            executor.disconnect(index)?;
        }
        for hash in disconnected.iter().rev() {
            let block = executor.load_block(hash)?;
            executor.connect(index, &block)?;
        }
        Ok(())
    })();
    if let Err(err) = result {
        panic!("failed to restore chain tip {old_tip:?} after aborted reorganization: {err}");
    }
    if index.best_tip() != old_tip {
        panic!("restored tip {:?} differs from {old_tip:?}", index.best_tip());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consensus_core::block::Block;
    use consensus_core::blockstatus::BlockStatus;
    use consensus_core::config::Params;
    use consensus_core::test_utils::{spend_tx, BlockBuilder};
    use consensus_core::tx::TransactionOutpoint;
    use database::stores::ChainStores;
    use database::MemoryDb;

    struct Chain {
        params: Params,
        stores: ChainStores,
        index: ChainIndex,
        executor: Executor,
        genesis: Block,
    }

    impl Chain {
        fn new() -> Self {
            let params = Params::regtest();
            let stores = ChainStores::new(Arc::new(MemoryDb::new()));
            let index = ChainIndex::new(stores.headers.clone());
            let executor = Executor::new(Arc::new(params.clone()), stores.clone());
            let genesis = params.genesis_block();
            let mut chain = Self { params, stores, index, executor, genesis };
            let genesis = chain.genesis.clone();
            chain.add(&genesis);
            chain
        }

        fn add(&mut self, block: &Block) -> Activation {
            self.index.insert_header(&block.header).unwrap();
            self.stores.blocks.put_block(block).unwrap();
            self.index.set_body_valid(&block.hash()).unwrap();
            activate_best_chain(&mut self.index, &mut self.executor).unwrap()
        }

        fn child(&self, parent: &Block, nonce: u64) -> Block {
            let height = self.index.get(&parent.hash()).unwrap().height;
            BlockBuilder::new(&self.params, &parent.header, height).extra_nonce(nonce).build()
        }
    }

    fn kinds(activation: &Activation) -> Vec<&'static str> {
        activation.events.iter().map(ChainEvent::kind).collect()
    }

    #[test]
    fn test_extend_and_tie() {
        let mut chain = Chain::new();
        assert_eq!(chain.index.best_tip(), Some(chain.genesis.hash()));
        let a = chain.child(&chain.genesis.clone(), 0);
        assert_eq!(kinds(&chain.add(&a)), vec!["block_connected"]);

        let b = chain.child(&chain.genesis.clone(), 1);
        let activation = chain.add(&b);
        assert!(!activation.tip_changed());
        assert_eq!(chain.index.best_tip(), Some(a.hash()));
        assert_eq!(chain.index.get(&b.hash()).unwrap().status, BlockStatus::Valid);
    }

    #[test]
    fn test_heavier_branch_reorganizes() {
        let mut chain = Chain::new();
        let genesis = chain.genesis.clone();
        let a = chain.child(&genesis, 0);
        chain.add(&a);
        let b = chain.child(&a, 0);
        chain.add(&b);
        let digest_ab = chain.executor.ledger_digest();

        let c = chain.child(&genesis, 1);
        chain.add(&c);
        let d = chain.child(&c, 1);
        assert!(!chain.add(&d).tip_changed());
        let e = chain.child(&d, 1);
        let activation = chain.add(&e);
        assert_eq!(
            kinds(&activation),
            vec!["block_disconnected", "block_disconnected", "block_connected", "block_connected", "block_connected", "tip_updated"]
        );
        match activation.events.last() {
            Some(ChainEvent::TipUpdated { new_tip, fork_point }) => {
                assert_eq!(*new_tip, e.hash());
                assert_eq!(*fork_point, genesis.hash());
            }
            other => panic!("unexpected last event {other:?}"),
        }
        assert_eq!(chain.index.get(&a.hash()).unwrap().status, BlockStatus::Valid);

        // Two more on the old branch bring it back
        let f = chain.child(&b, 0);
        chain.add(&f);
        let g = chain.child(&f, 0);
        chain.add(&g);
        assert_eq!(chain.index.best_tip(), Some(g.hash()));
        chain.executor.disconnect(&mut chain.index).unwrap();
        chain.executor.disconnect(&mut chain.index).unwrap();
        assert_eq!(chain.executor.ledger_digest(), digest_ab);
    }

    #[test]
    fn test_failed_switch_restores_old_tip() {
        let mut chain = Chain::new();
        let genesis = chain.genesis.clone();
        let a = chain.child(&genesis, 0);
        chain.add(&a);
        let b = chain.child(&a, 0);
        chain.add(&b);
        let digest = chain.executor.ledger_digest();

        // Side branch c <- bad <- e, where bad spends an output that does not exist
        let c = chain.child(&genesis, 1);
        chain.add(&c);
        let height = chain.index.get(&c.hash()).unwrap().height;
        let missing = TransactionOutpoint::new(Hash::from_le_u64([1, 2, 3, 4]), 0);
        let bad = BlockBuilder::new(&chain.params, &c.header, height).extra_nonce(1).tx(spend_tx(missing, 1, 0)).build();
        chain.add(&bad);
        let e = chain.child(&bad, 1);
        let activation = chain.add(&e);

        assert!(!activation.tip_changed());
        assert_eq!(activation.failure_for(&bad.hash()).unwrap().reject_reason(), "bad-txns-inputs-missingorspent");
        assert_eq!(chain.index.best_tip(), Some(b.hash()));
        assert_eq!(chain.executor.ledger_digest(), digest);
        assert!(chain.index.get(&e.hash()).unwrap().status.is_invalid());
        assert_eq!(chain.index.get(&c.hash()).unwrap().status, BlockStatus::Valid);
    }
}
