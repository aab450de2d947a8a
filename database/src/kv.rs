use crate::DbResult;

/// Logical key spaces. Each maps to a RocksDB column family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Headers,
    Blocks,
    Utxos,
    Undo,
    Metadata,
}

impl Column {
    pub const ALL: [Column; 5] = [Self::Headers, Self::Blocks, Self::Utxos, Self::Undo, Self::Metadata];

    pub fn name(self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::Blocks => "blocks",
            Self::Utxos => "utxos",
            Self::Undo => "undo",
            Self::Metadata => "metadata",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Put { column: Column, key: Vec<u8>, value: Vec<u8> },
    Delete { column: Column, key: Vec<u8> },
}

/// Ordered set of writes committed all-or-nothing.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn put(&mut self, column: Column, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put { column, key: key.into(), value: value.into() });
    }

    pub fn delete(&mut self, column: Column, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { column, key: key.into() });
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Minimal storage surface the chain needs.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, column: Column, key: &[u8]) -> DbResult<Option<Vec<u8>>>;

    /// Applies every operation of `batch` or none of them.
    fn write(&self, batch: WriteBatch) -> DbResult<()>;

    /// All pairs of a column in key order.
    fn scan(&self, column: Column) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>>;
}
