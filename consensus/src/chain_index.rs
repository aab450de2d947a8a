//! Block index: every header ever accepted, arranged as a tree.
//!
//! Entries live in an arena keyed by block hash. Parent links are hashes, children are kept in a
//! side table so invalidation can walk downwards. Entries are never removed; invalid ones stay
//! so the same block is not validated twice.
//!
//! Entries with a checked body that are valid or connected are also kept in an ordered set, most
//! cumulative work first, so picking the next chain tip does not scan the arena.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

use chain_math::work_from_compact;
use consensus_core::blockstatus::BlockStatus;
use consensus_core::constants::MEDIAN_TIME_SPAN;
use consensus_core::errors::ConsensusError;
use consensus_core::header::Header;
use consensus_core::{BlockHeight, Hash, PowAlgorithm, Work, ZERO_HASH};
use consensus_pow::{AlgoLineage, LineageBlock};
use database::stores::{HeaderRecord, HeaderStore};
use database::WriteBatch;
use tracing::{debug, warn};

use crate::errors::{ChainError, ChainResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndexEntry {
    pub hash: Hash,
    pub header: Header,
    pub height: BlockHeight,
    /// Expected hashes to find this block alone
    pub work: Work,
    pub cumulative_work: Work,
    pub status: BlockStatus,
    pub has_body: bool,
    /// First-seen sequence number, breaks cumulative work ties
    pub arrival: u64,
}

impl BlockIndexEntry {
    pub fn parent(&self) -> Hash {
        self.header.prev_hash
    }

    pub fn algo(&self) -> PowAlgorithm {
        self.header.algo
    }

    pub fn bits(&self) -> u32 {
        self.header.bits
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    fn record(&self) -> HeaderRecord {
        HeaderRecord { header: self.header.clone(), status: self.status, has_body: self.has_body, arrival: self.arrival }
    }

    fn is_candidate(&self) -> bool {
        self.has_body && self.status.is_valid_or_connected()
    }

    fn candidate_key(&self) -> CandidateKey {
        (Reverse(self.cumulative_work), self.arrival, self.hash)
    }
}

/// Orders candidates by cumulative work descending, then arrival.
type CandidateKey = (Reverse<Work>, u64, Hash);

pub struct ChainIndex {
    entries: HashMap<Hash, BlockIndexEntry>,
    children: HashMap<Hash, Vec<Hash>>,
    candidates: BTreeSet<CandidateKey>,
    tip: Option<Hash>,
    next_arrival: u64,
    store: HeaderStore,
}

impl ChainIndex {
    pub fn new(store: HeaderStore) -> Self {
        Self {
            entries: HashMap::new(),
            children: HashMap::new(),
            candidates: BTreeSet::new(),
            tip: None,
            next_arrival: 0,
            store,
        }
    }

    /// Rebuilds the index from persisted records. Heights and work are recomputed.
    pub fn load(store: HeaderStore, tip: Option<Hash>) -> ChainResult<Self> {
        let records = store.load_all()?;
        let mut index = Self::new(store);
        for record in records {
            let entry = index.build_entry(&record.header, record.status, record.arrival)?;
            index.next_arrival = index.next_arrival.max(record.arrival + 1);
            index.attach(BlockIndexEntry { has_body: record.has_body, ..entry });
        }
        if let Some(tip) = tip {
            match index.get(&tip) {
                Some(entry) if entry.status == BlockStatus::Connected => index.tip = Some(tip),
                _ => return Err(ChainError::Internal(format!("stored tip {tip} is not a connected entry"))),
            }
        }
        debug!("loaded {} index entries, tip {:?}", index.len(), index.tip);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.entries.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&BlockIndexEntry> {
        self.entries.get(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = &BlockIndexEntry> {
        self.entries.values()
    }

    pub fn children(&self, hash: &Hash) -> &[Hash] {
        self.children.get(hash).map(Vec::as_slice).unwrap_or_default()
    }

    /// Tip of the active chain, `None` until genesis is connected.
    pub fn best_tip(&self) -> Option<Hash> {
        self.tip
    }

    pub fn tip_entry(&self) -> Option<&BlockIndexEntry> {
        self.tip.and_then(|tip| self.entries.get(&tip))
    }

    pub(crate) fn set_tip(&mut self, tip: Option<Hash>) {
        self.tip = tip;
    }

    /// Records a new header as `HeaderOnly`. Known headers are returned unchanged.
    ///
    /// Fails with `prev-blk-not-found` when the parent is unknown, and with `bad-prevblk` when
    /// the parent is invalid, in which case the header itself is recorded invalid.
    pub fn insert_header(&mut self, header: &Header) -> ChainResult<Hash> {
        let hash = header.hash();
        if self.contains(&hash) {
            return Ok(hash);
        }
        let parent_invalid = match self.entries.get(&header.prev_hash) {
            Some(parent) => parent.status.is_invalid(),
            None if header.is_genesis() => false,
            None => return Err(ConsensusError::PrevBlockNotFound(header.prev_hash).into()),
        };
        if parent_invalid {
            self.insert_with_status(header, BlockStatus::Invalid)?;
            return Err(ConsensusError::BadPrevBlock(header.prev_hash).into());
        }
        self.insert_with_status(header, BlockStatus::HeaderOnly)
    }

    /// Records a header that failed a permanent check. The parent must be known.
    pub fn insert_invalid(&mut self, header: &Header) -> ChainResult<Hash> {
        let hash = header.hash();
        if self.contains(&hash) {
            self.set_status(&hash, BlockStatus::Invalid)?;
            return Ok(hash);
        }
        if !header.is_genesis() && !self.contains(&header.prev_hash) {
            return Err(ConsensusError::PrevBlockNotFound(header.prev_hash).into());
        }
        self.insert_with_status(header, BlockStatus::Invalid)
    }

    fn insert_with_status(&mut self, header: &Header, status: BlockStatus) -> ChainResult<Hash> {
        let entry = self.build_entry(header, status, self.next_arrival)?;
        self.store.put_record(&entry.hash, &entry.record())?;
        self.next_arrival += 1;
        let hash = entry.hash;
        debug!("indexed {hash} at height {} as {status:?}", entry.height);
        self.attach(entry);
        Ok(hash)
    }

    fn build_entry(&self, header: &Header, status: BlockStatus, arrival: u64) -> ChainResult<BlockIndexEntry> {
        let work = work_from_compact(header.bits);
        let (height, cumulative_work) = if header.is_genesis() {
            (0, work)
        } else {
            let parent = self
                .entries
                .get(&header.prev_hash)
                .ok_or_else(|| ChainError::Internal(format!("parent {} of indexed header is missing", header.prev_hash)))?;
            (parent.height + 1, parent.cumulative_work.saturating_add(work))
        };
        Ok(BlockIndexEntry {
            hash: header.hash(),
            header: header.clone(),
            height,
            work,
            cumulative_work,
            status,
            has_body: false,
            arrival,
        })
    }

    fn attach(&mut self, entry: BlockIndexEntry) {
        if !entry.header.is_genesis() {
            self.children.entry(entry.parent()).or_default().push(entry.hash);
        }
        if entry.is_candidate() {
            self.candidates.insert(entry.candidate_key());
        }
        self.entries.insert(entry.hash, entry);
    }

    /// Adds or drops `hash` from the candidate set after its status or body flag changed.
    fn refresh_candidate(&mut self, hash: &Hash) {
        if let Some(entry) = self.entries.get(hash) {
            if entry.is_candidate() {
                self.candidates.insert(entry.candidate_key());
            } else {
                self.candidates.remove(&entry.candidate_key());
            }
        }
    }

    fn entry_mut(&mut self, hash: &Hash) -> ChainResult<&mut BlockIndexEntry> {
        self.entries.get_mut(hash).ok_or_else(|| ChainError::Internal(format!("no index entry for {hash}")))
    }

    /// Updates and persists the status of one entry.
    pub fn set_status(&mut self, hash: &Hash, status: BlockStatus) -> ChainResult<()> {
        let mut batch = WriteBatch::new();
        self.stage_status(&mut batch, hash, status)?;
        self.store_batch(batch)?;
        self.apply_status(hash, status);
        Ok(())
    }

    /// Stages the record of `hash` with `status` without touching memory. Pair with [`Self::apply_status`]
    /// once the batch is committed.
    pub fn stage_status(&self, batch: &mut WriteBatch, hash: &Hash, status: BlockStatus) -> ChainResult<()> {
        let entry = self.entries.get(hash).ok_or_else(|| ChainError::Internal(format!("no index entry for {hash}")))?;
        let record = HeaderRecord { status, ..entry.record() };
        self.store.stage_record(batch, hash, &record)?;
        Ok(())
    }

    pub(crate) fn apply_status(&mut self, hash: &Hash, status: BlockStatus) {
        if let Some(entry) = self.entries.get_mut(hash) {
            entry.status = status;
        }
        self.refresh_candidate(hash);
    }

    /// Marks the body of `hash` as held and checked. Header-only entries become `Valid`.
    pub fn set_body_valid(&mut self, hash: &Hash) -> ChainResult<()> {
        let entry = self.entry_mut(hash)?;
        let status = if entry.status == BlockStatus::HeaderOnly { BlockStatus::Valid } else { entry.status };
        let record = HeaderRecord { status, has_body: true, ..entry.record() };
        self.store.put_record(hash, &record)?;
        let entry = self.entry_mut(hash)?;
        entry.status = status;
        entry.has_body = true;
        self.refresh_candidate(hash);
        Ok(())
    }

    /// Marks `hash` and everything built on it invalid. Returns the hashes that changed status.
    pub fn invalidate_with_descendants(&mut self, hash: &Hash) -> ChainResult<Vec<Hash>> {
        let mut changed = Vec::new();
        let mut stack = vec![*hash];
        while let Some(current) = stack.pop() {
            match self.entries.get(&current) {
                Some(entry) if entry.status == BlockStatus::Connected => {
                    return Err(ChainError::Internal(format!("refusing to invalidate connected block {current}")));
                }
                Some(entry) if !entry.status.is_invalid() => changed.push(current),
                Some(_) => {}
                None => continue,
            }
            stack.extend(self.children(&current).iter().copied());
        }

        let mut batch = WriteBatch::new();
        for h in &changed {
            self.stage_status(&mut batch, h, BlockStatus::Invalid)?;
        }
        self.store_batch(batch)?;
        for h in &changed {
            self.apply_status(h, BlockStatus::Invalid);
        }
        if changed.len() > 1 {
            warn!("invalidated {hash} and {} descendants", changed.len() - 1);
        }
        Ok(changed)
    }

    fn store_batch(&self, batch: WriteBatch) -> ChainResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.store.write(batch)?;
        Ok(())
    }

    /// Ancestor of `hash` (inclusive) at `height`.
    pub fn ancestor_at_height(&self, hash: &Hash, height: BlockHeight) -> Option<&BlockIndexEntry> {
        let mut entry = self.entries.get(hash)?;
        if height > entry.height {
            return None;
        }
        while entry.height > height {
            entry = self.entries.get(&entry.parent())?;
        }
        Some(entry)
    }

    /// Last common ancestor of `a` and `b`.
    pub fn fork_point(&self, a: &Hash, b: &Hash) -> ChainResult<Hash> {
        let missing = |h: &Hash| ChainError::Internal(format!("fork point walk reached unknown block {h}"));
        let mut a = self.entries.get(a).ok_or_else(|| missing(a))?;
        let mut b = self.entries.get(b).ok_or_else(|| missing(b))?;
        while a.height > b.height {
            a = self.entries.get(&a.parent()).ok_or_else(|| missing(&a.parent()))?;
        }
        while b.height > a.height {
            b = self.entries.get(&b.parent()).ok_or_else(|| missing(&b.parent()))?;
        }
        while a.hash != b.hash {
            if a.header.is_genesis() || b.header.is_genesis() {
                return Err(ChainError::Internal(format!("{} and {} share no ancestor", a.hash, b.hash)));
            }
            a = self.entries.get(&a.parent()).ok_or_else(|| missing(&a.parent()))?;
            b = self.entries.get(&b.parent()).ok_or_else(|| missing(&b.parent()))?;
        }
        Ok(a.hash)
    }

    /// Blocks after `ancestor` up to and including `descendant`, oldest first.
    /// A zero `ancestor` means the path starts at genesis.
    pub fn path_from(&self, ancestor: &Hash, descendant: &Hash) -> ChainResult<Vec<Hash>> {
        let mut path = Vec::new();
        let mut cursor = *descendant;
        while cursor != *ancestor {
            let entry = self
                .entries
                .get(&cursor)
                .ok_or_else(|| ChainError::Internal(format!("{ancestor} is not an ancestor of {descendant}")))?;
            path.push(cursor);
            cursor = entry.parent();
            if cursor == ZERO_HASH && *ancestor != ZERO_HASH {
                return Err(ChainError::Internal(format!("{ancestor} is not an ancestor of {descendant}")));
            }
        }
        path.reverse();
        Ok(path)
    }

    /// Entry the active chain should end at: most cumulative work among blocks whose whole branch
    /// down to the active chain has checked bodies, earliest arrival first on ties.
    pub fn best_candidate(&self) -> Option<Hash> {
        self.candidates
            .iter()
            .filter_map(|(_, _, hash)| self.entries.get(hash))
            .find(|e| self.is_connectable(e))
            .map(|e| e.hash)
    }

    /// Eligible entries not yet connected, which bounds how many activation attempts make sense.
    pub fn candidate_count(&self) -> usize {
        self.candidates
            .iter()
            .filter(|(_, _, hash)| self.entries.get(hash).is_some_and(|e| e.status == BlockStatus::Valid))
            .count()
    }

    fn is_connectable(&self, entry: &BlockIndexEntry) -> bool {
        let mut cursor = entry;
        loop {
            match cursor.status {
                BlockStatus::Connected => return true,
                BlockStatus::Valid if cursor.has_body => {}
                _ => return false,
            }
            if cursor.header.is_genesis() {
                return self.tip.is_none();
            }
            match self.entries.get(&cursor.parent()) {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    /// Median timestamp of `hash` and up to ten of its ancestors.
    pub fn median_time_past(&self, hash: &Hash) -> u64 {
        let mut times = Vec::with_capacity(MEDIAN_TIME_SPAN);
        let mut cursor = self.entries.get(hash);
        while let Some(entry) = cursor {
            times.push(entry.timestamp());
            if times.len() == MEDIAN_TIME_SPAN {
                break;
            }
            cursor = self.entries.get(&entry.parent());
        }
        times.sort_unstable();
        times.get(times.len() / 2).copied().unwrap_or_default()
    }
}

impl AlgoLineage for ChainIndex {
    fn last_with_algo(&self, from: &Hash, algo: PowAlgorithm) -> Option<LineageBlock> {
        let mut cursor = self.entries.get(from);
        while let Some(entry) = cursor {
            if entry.algo() == algo {
                return Some(LineageBlock {
                    hash: entry.hash,
                    prev_hash: entry.parent(),
                    timestamp: entry.timestamp(),
                    bits: entry.bits(),
                });
            }
            cursor = self.entries.get(&entry.parent());
        }
        None
    }
}
