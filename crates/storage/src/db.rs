//! sled database wrapper with serialization helpers.

use itemchain_core::Hash;
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::Db;
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Chain is not initialized")]
    NotInitialized,

    #[error("Invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("Block previous hash {found:?} does not match tip {expected}")]
    TipMismatch { expected: Hash, found: Option<Hash> },

    #[error("Expected block height {expected}, got {found}")]
    HeightMismatch { expected: u64, found: u64 },

    #[error("Block {0} is already stored")]
    DuplicateBlock(Hash),

    #[error("Store is corrupted: {0}")]
    Corrupted(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Result type inside a sled transaction closure.
pub type TxResult<T> = ConflictableTransactionResult<T, StorageError>;

/// Wrapper around sled database with serialization helpers.
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Store a serializable value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: serde::Serialize,
    {
        let encoded = bincode::serialize(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Retrieve and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: serde::de::DeserializeOwned,
    {
        match self.db.get(key)? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Retrieve a value, returning error if not found.
    pub fn get_or_err<K, V>(&self, key: K) -> Result<V>
    where
        K: AsRef<[u8]> + std::fmt::Debug + Clone,
        V: serde::de::DeserializeOwned,
    {
        self.get(key.clone())?
            .ok_or_else(|| StorageError::NotFound(format!("{:?}", key)))
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Run `f` as one serializable read-write transaction.
    ///
    /// sled may call `f` more than once on conflict, so it must not have side
    /// effects outside the transactional tree. Aborting with a
    /// [`StorageError`] leaves the store unchanged and returns that error.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: Fn(&TransactionalTree) -> TxResult<T>,
    {
        self.db.transaction(f).map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StorageError::Database(e),
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// Read and deserialize a value inside a transaction.
pub fn tx_get<K, V>(tree: &TransactionalTree, key: K) -> TxResult<Option<V>>
where
    K: AsRef<[u8]>,
    V: serde::de::DeserializeOwned,
{
    match tree.get(key)? {
        Some(bytes) => bincode::deserialize(&bytes)
            .map(Some)
            .map_err(|e| ConflictableTransactionError::Abort(e.into())),
        None => Ok(None),
    }
}

/// Serialize and write a value inside a transaction.
pub fn tx_put<K, V>(tree: &TransactionalTree, key: K, value: &V) -> TxResult<()>
where
    K: AsRef<[u8]>,
    V: serde::Serialize,
{
    let encoded =
        bincode::serialize(value).map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
    tree.insert(key.as_ref(), encoded)?;
    Ok(())
}

/// Abort the enclosing transaction with `error`.
pub fn abort<T>(error: StorageError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(error))
}
