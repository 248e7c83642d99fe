//! Transaction mempool for pending transactions.
//!
//! Transactions wait here in arrival order until mined into a block. The only
//! admission policy is a capacity cap, and reaching `mining_threshold` is the
//! signal to mine.

use itemchain_core::{Hash, Transaction};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),

    #[error("transaction not found in mempool")]
    TransactionNotFound,

    #[error("transaction id {0} does not match its canonical hash")]
    InvalidId(Hash),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the mempool.
    pub max_transactions: usize,
    /// Pool size at which a block should be mined.
    pub mining_threshold: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
            mining_threshold: 10,
        }
    }
}

/// Transaction mempool.
#[derive(Debug, Default)]
pub struct Mempool {
    config: MempoolConfig,
    /// Transactions indexed by id.
    transactions: HashMap<Hash, Transaction>,
    /// Ids in arrival order.
    order: VecDeque<Hash>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Get the number of transactions in the mempool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is in the mempool.
    pub fn contains(&self, tx_id: &Hash) -> bool {
        self.transactions.contains_key(tx_id)
    }

    /// Get a transaction from the mempool.
    pub fn get(&self, tx_id: &Hash) -> Option<&Transaction> {
        self.transactions.get(tx_id)
    }

    /// Add a transaction. Returns `true` once the pool holds at least
    /// `mining_threshold` transactions.
    pub fn add(&mut self, tx: Transaction) -> Result<bool> {
        if tx.verify_id().is_err() {
            return Err(MempoolError::InvalidId(tx.tx_id));
        }
        if self.contains(&tx.tx_id) {
            return Err(MempoolError::DuplicateTransaction);
        }
        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        self.order.push_back(tx.tx_id);
        self.transactions.insert(tx.tx_id, tx);

        Ok(self.should_mine())
    }

    /// Whether the pool has reached the mining threshold.
    pub fn should_mine(&self) -> bool {
        self.len() >= self.config.mining_threshold
    }

    /// Remove a transaction from the mempool.
    pub fn remove(&mut self, tx_id: &Hash) -> Result<Transaction> {
        let tx = self
            .transactions
            .remove(tx_id)
            .ok_or(MempoolError::TransactionNotFound)?;
        self.order.retain(|id| id != tx_id);
        Ok(tx)
    }

    /// Remove multiple transactions, ignoring ids that are not pending.
    pub fn remove_batch(&mut self, tx_ids: &[Hash]) {
        for id in tx_ids {
            let _ = self.remove(id);
        }
    }

    /// Oldest `limit` transactions, left in the pool.
    pub fn get_pending(&self, limit: usize) -> Vec<Transaction> {
        self.order
            .iter()
            .take(limit)
            .filter_map(|id| self.transactions.get(id).cloned())
            .collect()
    }

    /// Remove and return the oldest `limit` transactions.
    pub fn take_batch(&mut self, limit: usize) -> Vec<Transaction> {
        let count = limit.min(self.order.len());
        self.order
            .drain(..count)
            .filter_map(|id| self.transactions.remove(&id))
            .collect()
    }

    /// Clear all transactions from the mempool.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.order.clear();
    }

    /// Get mempool statistics.
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            capacity: self.config.max_transactions,
            mining_threshold: self.config.mining_threshold,
        }
    }
}

/// Mempool statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MempoolStats {
    pub total_transactions: usize,
    pub capacity: usize,
    pub mining_threshold: usize,
}
