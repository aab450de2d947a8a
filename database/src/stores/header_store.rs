use crate::{Column, DbResult, KeyValueStore, WriteBatch};
use consensus_core::blockstatus::BlockStatus;
use consensus_core::header::Header;
use consensus_core::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persisted form of a block index entry. Height and work are recomputed on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub header: Header,
    pub status: BlockStatus,
    pub has_body: bool,
    /// First-seen order, also the replay order on load
    pub arrival: u64,
}

#[derive(Clone)]
pub struct HeaderStore {
    db: Arc<dyn KeyValueStore>,
}

impl HeaderStore {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db }
    }

    pub fn stage_record(&self, batch: &mut WriteBatch, hash: &Hash, record: &HeaderRecord) -> DbResult<()> {
        batch.put(Column::Headers, hash.as_bytes().to_vec(), bincode::serialize(record)?);
        Ok(())
    }

    pub fn put_record(&self, hash: &Hash, record: &HeaderRecord) -> DbResult<()> {
        let mut batch = WriteBatch::new();
        self.stage_record(&mut batch, hash, record)?;
        self.db.write(batch)
    }

    /// Commits records staged with [`Self::stage_record`].
    pub fn write(&self, batch: WriteBatch) -> DbResult<()> {
        self.db.write(batch)
    }

    pub fn get_record(&self, hash: &Hash) -> DbResult<Option<HeaderRecord>> {
        match self.db.get(Column::Headers, hash.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    /// All records sorted by arrival, parents always before children.
    pub fn load_all(&self) -> DbResult<Vec<HeaderRecord>> {
        let mut records = self
            .db
            .scan(Column::Headers)?
            .into_iter()
            .map(|(_, value)| bincode::deserialize::<HeaderRecord>(&value).map_err(Into::into))
            .collect::<DbResult<Vec<_>>>()?;
        records.sort_by_key(|r| r.arrival);
        Ok(records)
    }
}
