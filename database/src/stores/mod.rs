pub mod block_store;
pub mod header_store;
pub mod metadata_store;
pub mod undo_store;
pub mod utxo_store;

pub use block_store::BlockStore;
pub use header_store::{HeaderRecord, HeaderStore};
pub use metadata_store::MetadataStore;
pub use undo_store::UndoStore;
pub use utxo_store::UtxoStore;

use crate::KeyValueStore;
use std::sync::Arc;

/// Every typed store over one backend.
#[derive(Clone)]
pub struct ChainStores {
    pub db: Arc<dyn KeyValueStore>,
    pub headers: HeaderStore,
    pub blocks: BlockStore,
    pub utxos: UtxoStore,
    pub undo: UndoStore,
    pub metadata: MetadataStore,
}

impl ChainStores {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self {
            headers: HeaderStore::new(db.clone()),
            blocks: BlockStore::new(db.clone()),
            utxos: UtxoStore::new(db.clone()),
            undo: UndoStore::new(db.clone()),
            metadata: MetadataStore::new(db.clone()),
            db,
        }
    }
}
