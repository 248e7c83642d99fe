//! Ledger configuration.

use crate::mempool::MempoolConfig;
use itemchain_consensus::{DifficultyPolicy, Miner, DEFAULT_MAX_ITERATIONS};
use serde::{Deserialize, Serialize};

/// Ledger configuration. Missing fields take their defaults when decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// A wallet that has introduced items may introduce another only while
    /// `mined blocks / introductions` is above this.
    pub mined_to_spend_ratio: f64,
    /// Difficulty required of new blocks.
    pub difficulty: DifficultyPolicy,
    /// Nonce candidates tried before mining gives up.
    pub max_pow_iterations: u64,
    /// Shard the nonce search across threads.
    pub parallel_mining: bool,
    /// Pending transactions that trigger mining.
    pub mempool_threshold: usize,
    /// Hard cap on pending transactions.
    pub mempool_capacity: usize,
    /// Maximum transactions per mined block.
    pub max_block_transactions: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mined_to_spend_ratio: 0.5,
            difficulty: DifficultyPolicy::PeriodicRamp,
            max_pow_iterations: DEFAULT_MAX_ITERATIONS,
            parallel_mining: true,
            mempool_threshold: 10,
            mempool_capacity: 10_000,
            max_block_transactions: 1000,
        }
    }
}

impl LedgerConfig {
    pub fn miner(&self) -> Miner {
        Miner::new(self.max_pow_iterations, self.parallel_mining)
    }

    pub fn mempool_config(&self) -> MempoolConfig {
        MempoolConfig {
            max_transactions: self.mempool_capacity,
            mining_threshold: self.mempool_threshold,
        }
    }
}
