#![allow(dead_code)]

use std::sync::Arc;

use consensus::{BlockIndexEntry, ChainObserver, Clock, Consensus, SystemClock};
use consensus_core::block::Block;
use consensus_core::config::Params;
use consensus_core::test_utils::{spend_tx, BlockBuilder};
use consensus_core::tx::TransactionOutpoint;
use consensus_core::{BlockHeight, Hash};
use database::{KeyValueStore, MemoryDb};
use parking_lot::Mutex;
use rand::Rng;

/// Regtest with coinbase outputs spendable after one confirmation.
pub fn test_params() -> Params {
    let mut params = Params::regtest();
    params.coinbase_maturity = 1;
    params
}

pub fn consensus_with(params: Params, db: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Consensus {
    Consensus::new(params, db, clock).unwrap()
}

/// In-memory chain with genesis connected.
pub fn setup() -> (Consensus, Block) {
    let params = test_params();
    let genesis = params.genesis_block();
    let consensus = consensus_with(params, Arc::new(MemoryDb::new()), Arc::new(SystemClock::new()));
    assert!(consensus.submit_block(&genesis, true).unwrap().accepted);
    (consensus, genesis)
}

/// Submits `block` and asserts it is accepted.
pub fn accept(consensus: &Consensus, block: &Block) {
    let result = consensus.submit_block(block, true).unwrap();
    assert!(result.accepted, "block {} rejected: {:?}", block.hash(), result.reject_reason);
}

/// Produces distinct blocks: each one gets a fresh extra nonce.
#[derive(Default)]
pub struct BlockFactory {
    counter: u64,
}

impl BlockFactory {
    pub fn builder(&mut self, params: &Params, parent: &Block, parent_height: BlockHeight) -> BlockBuilder {
        self.counter += 1;
        BlockBuilder::new(params, &parent.header, parent_height).extra_nonce(self.counter)
    }

    pub fn good(&mut self, params: &Params, parent: &Block, parent_height: BlockHeight) -> Block {
        self.builder(params, parent, parent_height).build()
    }

    /// Valid header, but the body spends its own coinbase before it matures.
    pub fn bad(&mut self, params: &Params, parent: &Block, parent_height: BlockHeight) -> Block {
        let builder = self.builder(params, parent, parent_height);
        let coinbase = builder.coinbase();
        let spend = spend_tx(TransactionOutpoint::new(coinbase.id(), 0), coinbase.outputs[0].value, parent.header.timestamp);
        builder.tx(spend).build()
    }

    /// A line of `len` good blocks on `parent`.
    pub fn chain(&mut self, params: &Params, parent: &Block, parent_height: BlockHeight, len: usize) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::with_capacity(len);
        for i in 0..len {
            let block = match blocks.last() {
                Some(prev) => self.good(params, prev, parent_height + i as u64),
                None => self.good(params, parent, parent_height),
            };
            blocks.push(block);
        }
        blocks
    }
}

struct Task {
    parent: Arc<Block>,
    parent_height: BlockHeight,
    remaining: u32,
    /// Sibling branch scheduled by a fork decision, always starts with a good block
    fork: bool,
}

/// Random block tree rooted at `root`, parents always listed before children.
///
/// Each step extends its parent with a good block, or with a bad one (`invalid_rate` percent)
/// that ends the branch; with `branch_rate` percent probability another good sibling branch
/// is grown from the same parent afterwards.
pub fn build_tree(
    factory: &mut BlockFactory,
    params: &Params,
    root: &Block,
    height: u32,
    invalid_rate: u32,
    branch_rate: u32,
    max_size: usize,
    rng: &mut impl Rng,
) -> Vec<Arc<Block>> {
    let mut blocks = Vec::new();
    let mut work = vec![Task { parent: Arc::new(root.clone()), parent_height: 0, remaining: height, fork: false }];
    while let Some(task) = work.pop() {
        if task.remaining == 0 || blocks.len() >= max_size {
            continue;
        }
        let invalid = !task.fork && rng.gen_range(0..100) < invalid_rate;
        if !task.fork && rng.gen_range(0..100) < branch_rate {
            work.push(Task { parent: task.parent.clone(), parent_height: task.parent_height, remaining: task.remaining, fork: true });
        }
        let block = if invalid {
            factory.bad(params, &task.parent, task.parent_height)
        } else {
            factory.good(params, &task.parent, task.parent_height)
        };
        let block = Arc::new(block);
        blocks.push(block.clone());
        if !invalid {
            work.push(Task { parent: block, parent_height: task.parent_height + 1, remaining: task.remaining - 1, fork: false });
        }
    }
    blocks
}

/// Records every event as a short string.
#[derive(Default)]
pub struct EventLog {
    pub events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }
}

pub fn label(hash: &Hash, names: &[(&str, Hash)]) -> String {
    names.iter().find(|(_, h)| h == hash).map(|(n, _)| n.to_string()).unwrap_or_else(|| hash.to_string())
}

impl ChainObserver for EventLog {
    fn block_connected(&self, block: &Arc<Block>, _entry: &BlockIndexEntry) {
        self.events.lock().push(format!("connected {}", block.hash()));
    }

    fn block_disconnected(&self, block: &Arc<Block>) {
        self.events.lock().push(format!("disconnected {}", block.hash()));
    }

    fn tip_updated(&self, new_tip: &Hash, fork_point: &Hash) {
        self.events.lock().push(format!("tip_updated {new_tip} {fork_point}"));
    }
}

/// Follows the event stream and checks every event continues from the previous one.
pub struct ContinuityChecker {
    pub expected_tip: Mutex<Hash>,
    pub errors: Mutex<Vec<String>>,
}

impl ContinuityChecker {
    pub fn new(tip: Hash) -> Self {
        Self { expected_tip: Mutex::new(tip), errors: Mutex::new(Vec::new()) }
    }

    fn check(&self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.errors.lock().push(message());
        }
    }
}

impl ChainObserver for ContinuityChecker {
    fn block_connected(&self, block: &Arc<Block>, entry: &BlockIndexEntry) {
        let mut tip = self.expected_tip.lock();
        self.check(block.header.prev_hash == *tip, || format!("connected {} on {} but tip was {}", block.hash(), block.header.prev_hash, *tip));
        self.check(entry.parent() == *tip, || format!("entry of {} has parent {}", entry.hash, entry.parent()));
        *tip = block.hash();
    }

    fn block_disconnected(&self, block: &Arc<Block>) {
        let mut tip = self.expected_tip.lock();
        self.check(block.hash() == *tip, || format!("disconnected {} but tip was {}", block.hash(), *tip));
        *tip = block.header.prev_hash;
    }

    fn tip_updated(&self, new_tip: &Hash, _fork_point: &Hash) {
        let tip = self.expected_tip.lock();
        self.check(*new_tip == *tip, || format!("tip_updated to {new_tip} but tip was {}", *tip));
    }
}
