use thiserror::Error;

use crate::kv::Column;

/// Failures of a [`KeyValueStore`](crate::KeyValueStore) or of the typed stores on top of it.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("rocksdb: {0}")]
    Backend(#[from] rocksdb::Error),

    /// A record could not be encoded, or stored bytes did not decode.
    #[error("record codec: {0}")]
    Codec(String),

    #[error("corrupt {} record: {reason}", .column.name())]
    Corrupt { column: Column, reason: String },

    #[error("column family {0} missing from the open database")]
    MissingColumn(&'static str),

    #[error("store already closed")]
    Closed,

    /// The backend refused a batch. Nothing from it was applied.
    #[error("batch rejected: {0}")]
    BatchRejected(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<bincode::Error> for DbError {
    fn from(err: bincode::Error) -> Self {
        DbError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_column() {
        let err = DbError::Corrupt { column: Column::Utxos, reason: "short key".into() };
        assert_eq!(err.to_string(), "corrupt utxos record: short key");

        let decode: Result<u64, _> = bincode::deserialize(&[1u8, 2]);
        let err = DbError::from(decode.unwrap_err());
        assert!(matches!(err, DbError::Codec(_)));
        assert!(err.to_string().starts_with("record codec: "));
    }
}
