//! Block processor
//!
//! Entry point for candidate blocks and headers. A submission goes through:
//! - stateless checks, before the chain lock is taken
//! - duplicate and parent lookups, then header rules against the parent
//! - storing the body and activating the best chain
//! - queueing the resulting events while the lock is still held
//!
//! The chain index and the executor sit behind one mutex, so concurrent submissions behave as
//! if processed one at a time in lock order.

use std::sync::Arc;

use consensus_core::block::Block;
use consensus_core::config::Params;
use consensus_core::errors::{ConsensusError, RejectKind};
use consensus_core::header::Header;
use consensus_core::tx::{TransactionOutpoint, UtxoEntry};
use consensus_core::{BlockHeight, Hash, PowAlgorithm};
use consensus_pow::{check_proof_of_work, difficulty, next_work_required};
use database::stores::ChainStores;
use database::KeyValueStore;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::chain_index::{BlockIndexEntry, ChainIndex};
use crate::clock::Clock;
use crate::errors::{ChainError, ChainResult};
use crate::executor::Executor;
use crate::notify::{ChainObserver, Dispatcher, SubscriptionId};
use crate::reorg::{activate_best_chain, Activation};
use crate::types::{CheckFlags, SubmitResult};
use crate::validation::BlockValidator;

/// State guarded by the chain lock.
struct ChainState {
    index: ChainIndex,
    executor: Executor,
}

pub struct Consensus {
    params: Arc<Params>,
    genesis_hash: Hash,
    clock: Arc<dyn Clock>,
    validator: BlockValidator,
    stores: ChainStores,
    state: Mutex<ChainState>,
    dispatcher: Dispatcher,
}

impl Consensus {
    /// Opens the chain stored in `db`, or an empty chain waiting for genesis.
    pub fn new(params: Params, db: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> ChainResult<Self> {
        let params = Arc::new(params);
        let stores = ChainStores::new(db);
        match stores.metadata.network()? {
            Some(network) if network != params.network => {
                return Err(ChainError::Internal(format!("store holds a {network} chain, not {}", params.network)));
            }
            Some(_) => {}
            None => stores.metadata.put_network(&params.network)?,
        }

        let index = ChainIndex::load(stores.headers.clone(), stores.metadata.tip()?)?;
        let executor = Executor::load(params.clone(), stores.clone())?;
        info!("opened {} chain with {} known headers, tip {:?}", params.network, index.len(), index.best_tip());

        Ok(Self {
            genesis_hash: params.genesis_hash(),
            validator: BlockValidator::new(params.clone()),
            params,
            clock,
            stores,
            state: Mutex::new(ChainState { index, executor }),
            dispatcher: Dispatcher::new(),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Processes a candidate block. Rejections are reported in the result; only storage and
    /// internal failures are errors.
    pub fn submit_block(&self, block: &Block, validate_signature: bool) -> ChainResult<SubmitResult> {
        self.submit_block_with_flags(block, CheckFlags::all().with_signature(validate_signature))
    }

    pub fn submit_block_with_flags(&self, block: &Block, flags: CheckFlags) -> ChainResult<SubmitResult> {
        let hash = block.hash();
        let is_genesis = block.header.is_genesis();
        if is_genesis && hash != self.genesis_hash {
            return Ok(SubmitResult::rejected(hash, &ConsensusError::BadGenesis(hash)));
        }
        // Genesis is trusted by hash
        let stateless = if is_genesis { Ok(()) } else { self.validator.check_block(block, self.clock.now(), flags) };

        let mut state = self.state.lock();
        if let Some(entry) = state.index.get(&hash) {
            if entry.status.is_invalid() {
                return Ok(SubmitResult::rejected(hash, &ConsensusError::DuplicateInvalid(hash)));
            }
            if entry.has_body {
                debug!("block {hash} already known");
                // A previous activation may have been cut short by a storage failure
                self.activate(&mut state)?;
                return Ok(SubmitResult::accepted(hash));
            }
        }

        if let Err(err) = stateless {
            if self.is_permanent_body_failure(block, &err) && state.index.contains(&block.header.prev_hash) {
                state.index.insert_invalid(&block.header)?;
            }
            debug!("block {hash} rejected: {err}");
            return Ok(SubmitResult::rejected(hash, &err));
        }

        if let Some(err) = self.accept_header(&mut state.index, &block.header, flags)? {
            return Ok(SubmitResult::rejected(hash, &err));
        }
        self.stores.blocks.put_block(block)?;
        state.index.set_body_valid(&hash)?;

        let activation = self.activate(&mut state)?;
        let invalid_now = state.index.get(&hash).map_or(false, |e| e.status.is_invalid());
        drop(state);

        if let Some(err) = activation.failure_for(&hash) {
            return Ok(SubmitResult::rejected(hash, err));
        }
        if invalid_now {
            return Ok(SubmitResult::rejected(hash, &ConsensusError::BadPrevBlock(block.header.prev_hash)));
        }
        Ok(SubmitResult::accepted(hash))
    }

    /// Structural failures are blamed on the header only when the body provably belongs to it
    /// and the header carries real work. Anything else could be a corrupted copy.
    fn is_permanent_body_failure(&self, block: &Block, err: &ConsensusError) -> bool {
        err.kind() == RejectKind::Structural
            && block.body_matches_header()
            && check_proof_of_work(&block.header, self.params.pow_limit())
    }

    /// Indexes a header whose parent is known and that satisfies the parent-dependent rules.
    /// Returns the rejection, if any, after recording it as the rules require.
    fn accept_header(&self, index: &mut ChainIndex, header: &Header, flags: CheckFlags) -> ChainResult<Option<ConsensusError>> {
        let hash = header.hash();
        if index.contains(&hash) {
            return Ok(None);
        }
        if !header.is_genesis() {
            let verdict = match index.get(&header.prev_hash) {
                None => {
                    debug!("orphan {hash}, parent {} unknown", header.prev_hash);
                    return Ok(Some(ConsensusError::PrevBlockNotFound(header.prev_hash)));
                }
                Some(parent) if parent.status.is_invalid() => Ok(()),
                Some(parent) => self.validator.header_validator().validate_in_context(header, parent, index, flags),
            };
            if let Err(err) = verdict {
                if err.kind() == RejectKind::Consensus {
                    index.insert_invalid(header)?;
                }
                return Ok(Some(err));
            }
        }
        match index.insert_header(header) {
            Ok(_) => Ok(None),
            Err(ChainError::Rejected(err)) => Ok(Some(err)),
            Err(err) => Err(err),
        }
    }

    fn activate(&self, state: &mut ChainState) -> ChainResult<Activation> {
        let ChainState { index, executor } = state;
        let mut activation = activate_best_chain(index, executor)?;
        self.dispatcher.enqueue(std::mem::take(&mut activation.events));
        Ok(activation)
    }

    /// Learns headers ahead of their bodies. Stops at the first rejected header.
    pub fn submit_headers(&self, headers: &[Header]) -> ChainResult<()> {
        let now = self.clock.now();
        for header in headers {
            let hash = header.hash();
            if header.is_genesis() && hash != self.genesis_hash {
                return Err(ConsensusError::BadGenesis(hash).into());
            }
            if !header.is_genesis() {
                self.validator.header_validator().validate_header(header, now, CheckFlags::all())?;
            }
            let mut state = self.state.lock();
            if state.index.get(&hash).map_or(false, |e| e.status.is_invalid()) {
                return Err(ConsensusError::DuplicateInvalid(hash).into());
            }
            if let Some(err) = self.accept_header(&mut state.index, header, CheckFlags::all())? {
                return Err(err.into());
            }
        }
        Ok(())
    }

    pub fn best_tip(&self) -> Option<Hash> {
        self.state.lock().index.best_tip()
    }

    pub fn tip_height(&self) -> Option<BlockHeight> {
        self.state.lock().index.tip_entry().map(|e| e.height)
    }

    pub fn tip_entry(&self) -> Option<BlockIndexEntry> {
        self.state.lock().index.tip_entry().cloned()
    }

    pub fn entry(&self, hash: &Hash) -> Option<BlockIndexEntry> {
        self.state.lock().index.get(hash).cloned()
    }

    pub fn header(&self, hash: &Hash) -> Option<Header> {
        self.state.lock().index.get(hash).map(|e| e.header.clone())
    }

    pub fn block(&self, hash: &Hash) -> ChainResult<Option<Block>> {
        Ok(self.stores.blocks.get_block(hash)?)
    }

    /// Block of the active chain at `height`.
    pub fn ancestor_at_height(&self, height: BlockHeight) -> Option<Hash> {
        let state = self.state.lock();
        let tip = state.index.best_tip()?;
        state.index.ancestor_at_height(&tip, height).map(|e| e.hash)
    }

    /// Bits the next block mined with `algo` on the active tip must carry.
    pub fn next_work_required(&self, algo: PowAlgorithm) -> u32 {
        let state = self.state.lock();
        match state.index.best_tip() {
            Some(tip) if !self.params.pow_no_retargeting => next_work_required(&self.params, &tip, algo, &state.index),
            _ => self.params.pow_limit_bits,
        }
    }

    pub fn difficulty_for_algo(&self, algo: PowAlgorithm) -> f64 {
        difficulty(self.next_work_required(algo), self.params.pow_limit())
    }

    pub fn difficulty_for_block(&self, hash: &Hash) -> Option<f64> {
        self.entry(hash).map(|e| difficulty(e.bits(), self.params.pow_limit()))
    }

    pub fn utxo(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        self.state.lock().executor.utxo(outpoint).cloned()
    }

    pub fn ledger_digest(&self) -> Hash {
        self.state.lock().executor.ledger_digest()
    }

    pub fn subscribe(&self, observer: Arc<dyn ChainObserver>) -> SubscriptionId {
        self.dispatcher.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.dispatcher.unsubscribe(id)
    }

    /// Waits until every event produced so far has been delivered.
    pub fn sync_with_notifications(&self) {
        self.dispatcher.sync();
    }

    pub fn pending_callbacks(&self) -> usize {
        self.dispatcher.pending_callbacks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use consensus_core::test_utils::{unmine, BlockBuilder};
    use database::MemoryDb;

    fn consensus() -> (Consensus, Block) {
        let params = Params::regtest();
        let genesis = params.genesis_block();
        let consensus = Consensus::new(params, Arc::new(MemoryDb::new()), Arc::new(SystemClock::new())).unwrap();
        assert!(consensus.submit_block(&genesis, true).unwrap().accepted);
        (consensus, genesis)
    }

    #[test]
    fn test_orphan_and_duplicates() {
        let (consensus, genesis) = consensus();
        let params = consensus.params().clone();
        let a = BlockBuilder::new(&params, &genesis.header, 0).build();
        let b = BlockBuilder::new(&params, &a.header, 1).build();

        let orphan = consensus.submit_block(&b, true).unwrap();
        assert!(!orphan.accepted);
        assert_eq!(orphan.reason(), Some("prev-blk-not-found"));
        assert_eq!(orphan.reject_code.unwrap().as_u8(), consensus_core::errors::REJECT_INVALID);
        assert!(consensus.entry(&b.hash()).is_none());

        assert!(consensus.submit_block(&a, true).unwrap().accepted);
        assert!(consensus.submit_block(&a, true).unwrap().accepted);
        assert!(consensus.submit_block(&b, true).unwrap().accepted);
        assert_eq!(consensus.tip_height(), Some(2));
        assert!(consensus.submit_block(&genesis, true).unwrap().accepted);
    }

    #[test]
    fn test_bad_pow_is_not_recorded() {
        let (consensus, genesis) = consensus();
        let mut a = BlockBuilder::new(consensus.params(), &genesis.header, 0).build();
        unmine(&mut a.header);
        let result = consensus.submit_block(&a, true).unwrap();
        assert_eq!(result.reason(), Some("bad-pow"));
        assert!(consensus.entry(&a.hash()).is_none());
    }

    #[test]
    fn test_structural_failure_with_matching_body_is_permanent() {
        let (consensus, genesis) = consensus();
        let params = consensus.params().clone();
        let mut a = BlockBuilder::new(&params, &genesis.header, 0).build_unmined();
        a.transactions[0].outputs.clear();
        a.header.merkle_root = a.calculate_merkle_root();
        consensus_core::test_utils::mine(&mut a.header);

        assert_eq!(consensus.submit_block(&a, true).unwrap().reason(), Some("bad-txns-vout-empty"));
        assert!(consensus.entry(&a.hash()).unwrap().status.is_invalid());
        let again = consensus.submit_block(&a, true).unwrap();
        assert_eq!(again.reason(), Some("duplicate-invalid"));
        assert_eq!(again.reject_code, Some(consensus_core::errors::RejectCode::Duplicate));

        let child = BlockBuilder::new(&params, &a.header, 1).build();
        assert_eq!(consensus.submit_block(&child, true).unwrap().reason(), Some("bad-prevblk"));
    }

    #[test]
    fn test_mismatched_body_does_not_poison_header() {
        let (consensus, genesis) = consensus();
        let good = BlockBuilder::new(consensus.params(), &genesis.header, 0).build();
        let mut corrupted = good.clone();
        corrupted.transactions[0].outputs[0].value += 1;
        assert_eq!(consensus.submit_block(&corrupted, true).unwrap().reason(), Some("bad-merkle-root"));
        assert!(consensus.submit_block(&good, true).unwrap().accepted);
        assert_eq!(consensus.best_tip(), Some(good.hash()));
    }

    #[test]
    fn test_wrong_genesis_and_old_timestamps() {
        let (consensus, genesis) = consensus();
        let params = consensus.params().clone();
        let mainnet_genesis = Params::mainnet().genesis_block();
        assert_eq!(consensus.submit_block(&mainnet_genesis, true).unwrap().reason(), Some("bad-genesis"));

        let a = BlockBuilder::new(&params, &genesis.header, 0).build();
        assert!(consensus.submit_block(&a, true).unwrap().accepted);
        let stale = BlockBuilder::new(&params, &a.header, 1).time(genesis.header.timestamp).build();
        assert_eq!(consensus.submit_block(&stale, true).unwrap().reason(), Some("time-too-old"));
        assert!(consensus.entry(&stale.hash()).unwrap().status.is_invalid());
    }

    #[test]
    fn test_headers_first() {
        let (consensus, genesis) = consensus();
        let params = consensus.params().clone();
        let a = BlockBuilder::new(&params, &genesis.header, 0).build();
        let b = BlockBuilder::new(&params, &a.header, 1).build();
        consensus.submit_headers(&[a.header.clone(), b.header.clone()]).unwrap();
        assert_eq!(consensus.header(&b.hash()), Some(b.header.clone()));
        assert_eq!(consensus.best_tip(), Some(genesis.hash()));

        // b's body alone cannot connect until a's body arrives
        assert!(consensus.submit_block(&b, true).unwrap().accepted);
        assert_eq!(consensus.best_tip(), Some(genesis.hash()));
        assert!(consensus.submit_block(&a, true).unwrap().accepted);
        assert_eq!(consensus.best_tip(), Some(b.hash()));
        assert_eq!(consensus.ancestor_at_height(1), Some(a.hash()));
        assert_eq!(consensus.difficulty_for_block(&b.hash()), Some(1.0));
        assert_eq!(consensus.difficulty_for_algo(PowAlgorithm::Keccak), 1.0);
    }
}
