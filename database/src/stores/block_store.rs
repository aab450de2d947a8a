use crate::{Column, DbResult, KeyValueStore, WriteBatch};
use consensus_core::block::Block;
use consensus_core::Hash;
use std::sync::Arc;

#[derive(Clone)]
pub struct BlockStore {
    db: Arc<dyn KeyValueStore>,
}

impl BlockStore {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db }
    }

    pub fn put_block(&self, block: &Block) -> DbResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(Column::Blocks, block.hash().as_bytes().to_vec(), bincode::serialize(block)?);
        self.db.write(batch)
    }

    pub fn get_block(&self, hash: &Hash) -> DbResult<Option<Block>> {
        match self.db.get(Column::Blocks, hash.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    pub fn has_block(&self, hash: &Hash) -> DbResult<bool> {
        Ok(self.db.get(Column::Blocks, hash.as_bytes())?.is_some())
    }
}
