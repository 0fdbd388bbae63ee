use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Batch, Db, Tree};
use thiserror::Error;

use std::path::Path;

/// Stable record names. Each one holds a whole bincode-encoded value.
pub const CHAIN_RECORD: &str = "chain";
pub const USERS_RECORD: &str = "users";
pub const WALLETS_RECORD: &str = "wallets";
pub const HISTORY_RECORD: &str = "history";
pub const PENDING_RECORD: &str = "pending";

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error for record {record}: {reason}")]
    DeserializationError { record: String, reason: String },
}

/// Durable key-value store for ledger records
pub trait Store: Send + Sync {
    /// Raw bytes of `name`, `None` if it was never saved
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Writes every record of `batch` together
    fn save_batch(&self, batch: Vec<(&'static str, Vec<u8>)>) -> Result<(), StorageError>;

    /// Flushes all pending writes to durable media
    fn flush(&self) -> Result<(), StorageError>;
}

/// Loads and decodes `name`, falling back to `default` when it is absent
pub fn load_record<T: DeserializeOwned>(
    store: &dyn Store,
    name: &str,
    default: T,
) -> Result<T, StorageError> {
    match store.load(name)? {
        Some(bytes) => bincode::deserialize(&bytes).map_err(|e| StorageError::DeserializationError {
            record: name.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// Encodes a record for [`Store::save_batch`]
pub fn encode_record<T: Serialize + ?Sized>(
    name: &'static str,
    value: &T,
) -> Result<(&'static str, Vec<u8>), StorageError> {
    let bytes =
        bincode::serialize(value).map_err(|e| StorageError::SerializationError(e.to_string()))?;
    Ok((name, bytes))
}

/// sled-backed storage. All records live in one tree so a batch is atomic.
pub struct SledStore {
    /// The database instance
    db: Db,

    /// Tree for ledger records
    records: Tree,
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore").finish()
    }
}

impl SledStore {
    /// Opens (or creates) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Opens a throwaway database that is removed on drop
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self, StorageError> {
        let records = db.open_tree("records")?;
        Ok(Self { db, records })
    }
}

impl Store for SledStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.records.get(name.as_bytes())?.map(|value| value.to_vec()))
    }

    fn save_batch(&self, batch: Vec<(&'static str, Vec<u8>)>) -> Result<(), StorageError> {
        let mut writes = Batch::default();
        for (name, bytes) in batch {
            writes.insert(name.as_bytes(), bytes);
        }
        self.records.apply_batch(writes)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

/// Volatile storage for tests and throwaway ledgers
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.records.get(name).map(|entry| entry.value().clone()))
    }

    fn save_batch(&self, batch: Vec<(&'static str, Vec<u8>)>) -> Result<(), StorageError> {
        for (name, bytes) in batch {
            self.records.insert(name.to_string(), bytes);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn round_trip(store: &dyn Store) {
        let mut wallets = BTreeMap::new();
        wallets.insert("alice".to_string(), 100i64);

        store
            .save_batch(vec![encode_record(WALLETS_RECORD, &wallets).unwrap()])
            .unwrap();

        let loaded: BTreeMap<String, i64> =
            load_record(store, WALLETS_RECORD, BTreeMap::new()).unwrap();
        assert_eq!(loaded, wallets);
    }

    #[test]
    fn test_missing_record_uses_default() {
        let store = MemoryStore::new();

        let history: Vec<String> = load_record(&store, HISTORY_RECORD, vec!["x".into()]).unwrap();

        assert_eq!(history, vec!["x".to_string()]);
    }

    #[test]
    fn test_memory_store_round_trip() {
        round_trip(&MemoryStore::new());
    }

    #[test]
    fn test_sled_store_round_trip() {
        let store = SledStore::temporary().unwrap();
        round_trip(&store);
        store.flush().unwrap();
    }

    #[test]
    fn test_corrupt_record_is_reported() {
        let store = MemoryStore::new();
        store.save_batch(vec![(CHAIN_RECORD, vec![0xff])]).unwrap();

        let result: Result<Vec<String>, _> = load_record(&store, CHAIN_RECORD, Vec::new());

        assert!(matches!(
            result,
            Err(StorageError::DeserializationError { ref record, .. }) if record == CHAIN_RECORD
        ));
    }
}
