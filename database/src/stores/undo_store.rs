use crate::{Column, DbResult, KeyValueStore, WriteBatch};
use consensus_core::utxo::UtxoDiff;
use consensus_core::Hash;
use std::sync::Arc;

/// Undo records of connected blocks, keyed by block hash.
#[derive(Clone)]
pub struct UndoStore {
    db: Arc<dyn KeyValueStore>,
}

impl UndoStore {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db }
    }

    pub fn stage_put(&self, batch: &mut WriteBatch, hash: &Hash, diff: &UtxoDiff) -> DbResult<()> {
        batch.put(Column::Undo, hash.as_bytes().to_vec(), bincode::serialize(diff)?);
        Ok(())
    }

    pub fn stage_delete(&self, batch: &mut WriteBatch, hash: &Hash) {
        batch.delete(Column::Undo, hash.as_bytes().to_vec());
    }

    pub fn get(&self, hash: &Hash) -> DbResult<Option<UtxoDiff>> {
        match self.db.get(Column::Undo, hash.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }
}
