use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::errors::{DbError, DbResult};
use crate::kv::{BatchOp, Column, KeyValueStore, WriteBatch};

/// Fault to inject into [`MemoryDb::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteFault {
    /// Every write fails
    All,
    /// Writes putting `key` into `column` fail
    OnPut { column: Column, key: Vec<u8> },
    /// The first write putting `key` into `column` fails, later ones succeed
    OnceOnPut { column: Column, key: Vec<u8> },
}

impl WriteFault {
    fn matches(column: &Column, key: &[u8], batch: &WriteBatch) -> bool {
        batch.ops().iter().any(|op| matches!(op, BatchOp::Put { column: c, key: k, .. } if c == column && k == key))
    }
}

/// In-memory backend, used by tests and ephemeral nodes.
#[derive(Default)]
pub struct MemoryDb {
    columns: RwLock<HashMap<Column, BTreeMap<Vec<u8>, Vec<u8>>>>,
    fault: RwLock<Option<WriteFault>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_fault(&self, fault: WriteFault) {
        *self.fault.write() = Some(fault);
    }

    pub fn clear_fault(&self) {
        *self.fault.write() = None;
    }

    fn check_fault(&self, batch: &WriteBatch) -> DbResult<()> {
        let mut fault = self.fault.write();
        let (failed, spent) = match fault.as_ref() {
            None => (false, false),
            Some(WriteFault::All) => (true, false),
            Some(WriteFault::OnPut { column, key }) => (WriteFault::matches(column, key, batch), false),
            Some(WriteFault::OnceOnPut { column, key }) => {
                let hit = WriteFault::matches(column, key, batch);
                (hit, hit)
            }
        };
        if spent {
            *fault = None;
        }
        if failed {
            return Err(DbError::BatchRejected("injected fault".into()));
        }
        Ok(())
    }

    pub fn len(&self, column: Column) -> usize {
        self.columns.read().get(&column).map_or(0, BTreeMap::len)
    }
}

impl KeyValueStore for MemoryDb {
    fn get(&self, column: Column, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        Ok(self.columns.read().get(&column).and_then(|c| c.get(key)).cloned())
    }

    fn write(&self, batch: WriteBatch) -> DbResult<()> {
        self.check_fault(&batch)?;
        let mut columns = self.columns.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { column, key, value } => {
                    columns.entry(column).or_default().insert(key, value);
                }
                BatchOp::Delete { column, key } => {
                    if let Some(c) = columns.get_mut(&column) {
                        c.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn scan(&self, column: Column) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self.columns.read().get(&column).map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_is_atomic_under_fault() {
        let db = MemoryDb::new();
        let mut batch = WriteBatch::new();
        batch.put(Column::Metadata, b"a".to_vec(), b"1".to_vec());
        batch.put(Column::Utxos, b"b".to_vec(), b"2".to_vec());
        db.inject_fault(WriteFault::OnPut { column: Column::Utxos, key: b"b".to_vec() });
        assert!(db.write(batch.clone()).is_err());
        assert_eq!(db.get(Column::Metadata, b"a").unwrap(), None);

        db.clear_fault();
        db.write(batch).unwrap();
        assert_eq!(db.get(Column::Metadata, b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(db.len(Column::Utxos), 1);
    }

    #[test]
    fn test_one_shot_fault_clears_itself() {
        let db = MemoryDb::new();
        let mut batch = WriteBatch::new();
        batch.put(Column::Headers, b"h".to_vec(), b"1".to_vec());
        db.inject_fault(WriteFault::OnceOnPut { column: Column::Headers, key: b"h".to_vec() });

        let mut other = WriteBatch::new();
        other.put(Column::Headers, b"x".to_vec(), b"2".to_vec());
        db.write(other).unwrap();
        assert!(db.write(batch.clone()).is_err());
        db.write(batch).unwrap();
        assert_eq!(db.len(Column::Headers), 2);
    }

    #[test]
    fn test_delete_and_scan_order() {
        let db = MemoryDb::new();
        let mut batch = WriteBatch::new();
        for k in [3u8, 1, 2] {
            batch.put(Column::Headers, vec![k], vec![k]);
        }
        batch.delete(Column::Headers, vec![2u8]);
        db.write(batch).unwrap();
        let keys: Vec<_> = db.scan(Column::Headers).unwrap().into_iter().map(|(k, _)| k[0]).collect();
        assert_eq!(keys, vec![1, 3]);
    }
}
