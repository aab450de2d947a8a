use crate::{Column, DbError, DbResult, KeyValueStore, WriteBatch};
use consensus_core::tx::{TransactionOutpoint, UtxoEntry};
use consensus_core::utxo::UtxoDiff;
use consensus_core::Hash;
use std::sync::Arc;

#[derive(Clone)]
pub struct UtxoStore {
    db: Arc<dyn KeyValueStore>,
}

impl UtxoStore {
    pub fn new(db: Arc<dyn KeyValueStore>) -> Self {
        Self { db }
    }

    /// Stages the forward application of `diff`.
    pub fn stage_apply(&self, batch: &mut WriteBatch, diff: &UtxoDiff) -> DbResult<()> {
        for (outpoint, _) in &diff.spent {
            batch.delete(Column::Utxos, Self::outpoint_to_key(outpoint));
        }
        for (outpoint, entry) in &diff.created {
            batch.put(Column::Utxos, Self::outpoint_to_key(outpoint), bincode::serialize(entry)?);
        }
        Ok(())
    }

    /// Stages the inverse of `diff`.
    pub fn stage_rollback(&self, batch: &mut WriteBatch, diff: &UtxoDiff) -> DbResult<()> {
        for (outpoint, _) in diff.created.iter().rev() {
            batch.delete(Column::Utxos, Self::outpoint_to_key(outpoint));
        }
        for (outpoint, entry) in diff.spent.iter().rev() {
            batch.put(Column::Utxos, Self::outpoint_to_key(outpoint), bincode::serialize(entry)?);
        }
        Ok(())
    }

    pub fn get_utxo(&self, outpoint: &TransactionOutpoint) -> DbResult<Option<UtxoEntry>> {
        match self.db.get(Column::Utxos, &Self::outpoint_to_key(outpoint))? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    pub fn load_all(&self) -> DbResult<Vec<(TransactionOutpoint, UtxoEntry)>> {
        self.db
            .scan(Column::Utxos)?
            .into_iter()
            .map(|(key, value)| Ok((Self::key_to_outpoint(&key)?, bincode::deserialize(&value)?)))
            .collect()
    }

    fn outpoint_to_key(outpoint: &TransactionOutpoint) -> Vec<u8> {
        let mut key = outpoint.transaction_id.as_bytes().to_vec();
        key.extend_from_slice(&outpoint.index.to_be_bytes());
        key
    }

    fn key_to_outpoint(key: &[u8]) -> DbResult<TransactionOutpoint> {
        if key.len() != 36 {
            return Err(DbError::Corrupt { column: Column::Utxos, reason: format!("key of length {}", key.len()) });
        }
        let transaction_id = Hash::try_from_slice(&key[..32]).map_err(|e| DbError::Corrupt { column: Column::Utxos, reason: e.to_string() })?;
        let mut index = [0u8; 4];
        index.copy_from_slice(&key[32..]);
        Ok(TransactionOutpoint::new(transaction_id, u32::from_be_bytes(index)))
    }
}
