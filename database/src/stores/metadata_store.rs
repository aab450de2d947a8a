use crate::{Column, DbError, DbResult, KeyValueStore, WriteBatch};
use consensus_core::Hash;
use std::sync::Arc;

const TIP_KEY: &[u8] = b"tip";
const NETWORK_KEY: &[u8] = b"network";

#[derive(Clone)]
pub struct MetadataStore {
    db: Arc<dyn KeyValueStore>,
}

impl MetadataStore {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db }
    }

    pub fn stage_tip(&self, batch: &mut WriteBatch, tip: &Hash) {
        batch.put(Column::Metadata, TIP_KEY.to_vec(), tip.as_bytes().to_vec());
    }

    pub fn tip(&self) -> DbResult<Option<Hash>> {
        match self.db.get(Column::Metadata, TIP_KEY)? {
            Some(data) => Hash::try_from_slice(&data).map(Some).map_err(|e| DbError::Corrupt { column: Column::Metadata, reason: e.to_string() }),
            None => Ok(None),
        }
    }

    pub fn put_network(&self, network: &str) -> DbResult<()> {
        let mut batch = WriteBatch::new();
        batch.put(Column::Metadata, NETWORK_KEY.to_vec(), network.as_bytes().to_vec());
        self.db.write(batch)
    }

    pub fn network(&self) -> DbResult<Option<String>> {
        Ok(self.db.get(Column::Metadata, NETWORK_KEY)?.map(|v| String::from_utf8_lossy(&v).into_owned()))
    }
}
