use crate::errors::{DbError, DbResult};
use crate::kv::{BatchOp, Column, KeyValueStore, WriteBatch};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// RocksDB backend with one column family per [`Column`].
pub struct Database {
    db: Arc<DB>,
    is_closed: Arc<RwLock<bool>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(10000);
        opts.set_keep_log_file_num(10);
        opts.set_max_background_jobs(4);
        opts.increase_parallelism(4);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_write_buffer_size(64 * 1024 * 1024);

        let cf_descriptors: Vec<_> =
            Column::ALL.iter().map(|column| ColumnFamilyDescriptor::new(column.name(), Options::default())).collect();

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)?;
        info!("opened database at {}", path.as_ref().display());
        Ok(Self { db: Arc::new(db), is_closed: Arc::new(RwLock::new(false)) })
    }

    fn check_closed(&self) -> DbResult<()> {
        if *self.is_closed.read() {
            return Err(DbError::Closed);
        }
        Ok(())
    }

    fn get_cf_handle(&self, column: Column) -> DbResult<&rocksdb::ColumnFamily> {
        self.db.cf_handle(column.name()).ok_or_else(|| DbError::MissingColumn(column.name()))
    }

    pub fn close(&self) {
        *self.is_closed.write() = true;
    }

    pub fn stats(&self) -> String {
        self.db.property_value("rocksdb.stats").unwrap_or_default().unwrap_or_default()
    }

    pub fn compact(&self, column: Column) -> DbResult<()> {
        let cf = self.get_cf_handle(column)?;
        self.db.compact_range_cf(cf, None::<&[u8]>, None::<&[u8]>);
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, column: Column, key: &[u8]) -> DbResult<Option<Vec<u8>>> {
        self.check_closed()?;
        let cf = self.get_cf_handle(column)?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn write(&self, batch: WriteBatch) -> DbResult<()> {
        self.check_closed()?;
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { column, key, value } => rocks_batch.put_cf(self.get_cf_handle(column)?, key, value),
                BatchOp::Delete { column, key } => rocks_batch.delete_cf(self.get_cf_handle(column)?, key),
            }
        }
        self.db.write(rocks_batch)?;
        Ok(())
    }

    fn scan(&self, column: Column) -> DbResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.check_closed()?;
        let cf = self.get_cf_handle(column)?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| item.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(DbError::from))
            .collect()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), is_closed: self.is_closed.clone() }
    }
}
