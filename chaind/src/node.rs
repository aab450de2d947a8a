//! Opens the chain described by a [`Config`] and feeds it blocks.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use consensus::{BlockIndexEntry, ChainObserver, Consensus, SystemClock};
use consensus_core::block::Block;
use consensus_core::Hash;
use database::{Database, KeyValueStore, MemoryDb};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Logs every chain event.
pub struct LogObserver;

impl ChainObserver for LogObserver {
    fn block_connected(&self, block: &Arc<Block>, entry: &BlockIndexEntry) {
        info!("connected {} at height {} ({} txs)", block.hash(), entry.height, block.transactions.len());
    }

    fn block_disconnected(&self, block: &Arc<Block>) {
        info!("disconnected {}", block.hash());
    }

    fn tip_updated(&self, new_tip: &Hash, fork_point: &Hash) {
        info!("reorganized to {new_tip} from fork point {fork_point}");
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub accepted: usize,
    pub rejected: usize,
}

pub struct Node {
    consensus: Consensus,
    check_signatures: bool,
}

impl Node {
    /// Opens the configured store and makes sure genesis is connected.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let params = config.params()?;
        let db: Arc<dyn KeyValueStore> = if config.storage.in_memory {
            Arc::new(MemoryDb::new())
        } else {
            fs::create_dir_all(&config.storage.data_dir)
                .with_context(|| format!("failed to create {}", config.storage.data_dir.display()))?;
            Arc::new(Database::open(&config.storage.data_dir)?)
        };
        let genesis = params.genesis_block();
        let consensus = Consensus::new(params, db, Arc::new(SystemClock::new()))?;
        consensus.subscribe(Arc::new(LogObserver));

        if consensus.best_tip().is_none() {
            let result = consensus.submit_block(&genesis, true)?;
            anyhow::ensure!(result.accepted, "genesis rejected: {:?}", result.reject_reason);
        }
        Ok(Self { consensus, check_signatures: config.consensus.check_signatures })
    }

    pub fn consensus(&self) -> &Consensus {
        &self.consensus
    }

    /// Submits every block of a bincode encoded `Vec<Block>` file, in file order.
    pub fn import(&self, path: &Path) -> anyhow::Result<ImportSummary> {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let blocks: Vec<Block> = bincode::deserialize(&bytes).with_context(|| format!("malformed block file {}", path.display()))?;
        info!("importing {} blocks from {}", blocks.len(), path.display());

        let mut summary = ImportSummary::default();
        for block in &blocks {
            let result = self.consensus.submit_block(block, self.check_signatures)?;
            if result.accepted {
                summary.accepted += 1;
                debug!("accepted {}", result.hash);
            } else {
                summary.rejected += 1;
                warn!("rejected {}: {}", result.hash, result.reason().unwrap_or("unknown"));
            }
        }
        self.consensus.sync_with_notifications();
        Ok(summary)
    }

    pub fn log_status(&self) {
        match self.consensus.tip_entry() {
            Some(tip) => info!(
                "tip {} at height {}, cumulative work {}, ledger digest {}",
                tip.hash,
                tip.height,
                tip.cumulative_work,
                self.consensus.ledger_digest()
            ),
            None => info!("chain is empty"),
        }
    }
}

/// Writes `blocks` as a block file readable by [`Node::import`].
pub fn write_block_file(path: &Path, blocks: &[Block]) -> anyhow::Result<()> {
    let bytes = bincode::serialize(blocks)?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}
