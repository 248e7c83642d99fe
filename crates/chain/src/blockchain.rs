//! The ledger: a hash-linked chain of blocks persisted in sled.
//!
//! Appends are validated here and then committed by the storage layer in a
//! single transaction. Reads walk backward from the tip.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::mempool::{Mempool, MempoolStats};
use itemchain_consensus::{BlockValidator, TransactionValidator};
use itemchain_core::{Block, Hash, PubKeyHash, Transaction};
use itemchain_storage::{ChainStore, Storage};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Main ledger struct.
///
/// All methods take `&self`, so one `Blockchain` can be shared across
/// threads. Concurrent [`Blockchain::add_block`] calls are serialized.
pub struct Blockchain<'a> {
    /// Chain store for blocks.
    chain: ChainStore<'a>,
    /// Hash of the newest block.
    tip: RwLock<Hash>,
    /// Pending transactions.
    mempool: Mutex<Mempool>,
    config: LedgerConfig,
}

impl<'a> Blockchain<'a> {
    /// Open the ledger, creating the genesis block if the store is empty.
    pub fn init(storage: &'a Storage, config: LedgerConfig) -> Result<Self> {
        let chain = ChainStore::new(storage);
        let tip = chain.init_genesis(&Block::genesis())?;
        info!(tip = %tip, "Ledger ready");

        Ok(Self {
            chain,
            tip: RwLock::new(tip),
            mempool: Mutex::new(Mempool::with_config(config.mempool_config())),
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(crate) fn chain(&self) -> &ChainStore<'a> {
        &self.chain
    }

    /// Hash of the current tip.
    pub fn tip_hash(&self) -> Hash {
        *self.tip.read()
    }

    /// Get a block by hash.
    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        Ok(self.chain.get_block(hash)?)
    }

    /// Validate a mined block and append it on top of the tip.
    ///
    /// Checks, in order: the stored hash against the fields, the proof for
    /// the declared difficulty, the difficulty policy, every transaction's
    /// id and signature, then item ownership as of the block's parent.
    /// The store then checks linkage to the tip and commits block and tip
    /// together. On any failure the chain is unchanged.
    pub fn add_block(&self, block: &Block) -> Result<()> {
        if let Err(e) = BlockValidator::validate_block(block, &self.config.difficulty) {
            warn!(height = block.height(), hash = %block.hash(), error = %e, "Rejected block");
            return Err(e.into());
        }
        if let Err(e) = self.check_ownership(block) {
            warn!(height = block.height(), hash = %block.hash(), error = %e, "Rejected block");
            return Err(e);
        }

        let mut tip = self.tip.write();
        if let Err(e) = self.chain.append_block(block) {
            warn!(height = block.height(), hash = %block.hash(), error = %e, "Store refused block");
            return Err(e.into());
        }
        *tip = block.hash();
        drop(tip);

        info!(
            height = block.height(),
            hash = %block.hash(),
            txs = block.tx_count(),
            "Appended block"
        );
        Ok(())
    }

    /// Candidate block on top of the tip, with the policy's difficulty.
    pub fn prepare_block(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let parent = self.last_block()?;
        let height = parent.height() + 1;
        let difficulty = self.config.difficulty.difficulty_for(height);
        Ok(Block::new(height, parent.hash(), transactions, difficulty))
    }

    /// Prepare and mine a block without appending it.
    ///
    /// The miner's pubkey-hash is recorded after the nonce is found.
    pub fn mine_block(&self, transactions: Vec<Transaction>, miner: &PubKeyHash) -> Result<Block> {
        let mut block = self.prepare_block(transactions)?;
        let difficulty = block.header.difficulty;

        debug!(height = block.height(), difficulty, "Mining block");
        self.config.miner().mine(&mut block, difficulty)?;
        block.header.miner_pubkey_hash = Some(*miner);

        Ok(block)
    }

    /// Queue a transaction for mining. Returns whether the pool has reached
    /// its mining threshold.
    pub fn submit_transaction(&self, tx: Transaction) -> Result<bool> {
        TransactionValidator::validate_transaction(&tx, 0)?;
        Ok(self.mempool.lock().add(tx)?)
    }

    /// Oldest pending transactions, left in the pool.
    pub fn pending_transactions(&self, limit: usize) -> Vec<Transaction> {
        self.mempool.lock().get_pending(limit)
    }

    pub fn mempool_stats(&self) -> MempoolStats {
        self.mempool.lock().stats()
    }

    /// Mine the oldest pending transactions into a block and append it.
    ///
    /// Pending transactions that conflict with the chain or with an older
    /// pending one are evicted. The rest leave the pool only once their
    /// block is on the chain. Returns `None` when nothing minable is pending.
    pub fn mine_pending(&self, miner: &PubKeyHash) -> Result<Option<Block>> {
        let pending = self.pending_transactions(self.config.max_block_transactions);
        let (batch, conflicting) = self.partition_by_ownership(pending)?;
        if !conflicting.is_empty() {
            let ids: Vec<Hash> = conflicting.iter().map(|tx| tx.tx_id).collect();
            self.mempool.lock().remove_batch(&ids);
        }
        if batch.is_empty() {
            return Ok(None);
        }

        let block = self.mine_block(batch, miner)?;
        self.add_block(&block)?;

        let ids: Vec<Hash> = block.transactions().iter().map(|tx| tx.tx_id).collect();
        self.mempool.lock().remove_batch(&ids);
        Ok(Some(block))
    }

    /// Walk the chain from the tip back to genesis.
    pub fn iter(&self) -> BlockIter<'_, 'a> {
        self.iter_from(self.tip_hash())
    }

    /// Walk back from `hash` to genesis.
    pub fn iter_from(&self, hash: Hash) -> BlockIter<'_, 'a> {
        debug!(from = %hash, "Starting chain traversal");
        BlockIter {
            chain: &self.chain,
            next: Some(hash),
        }
    }
}

/// Lazy tip-to-genesis traversal, one block fetched per step.
///
/// A referenced block that is missing from the store is reported as
/// [`LedgerError::Corrupted`] and ends the walk.
pub struct BlockIter<'c, 'a> {
    chain: &'c ChainStore<'a>,
    next: Option<Hash>,
}

impl Iterator for BlockIter<'_, '_> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match self.chain.get_block(&hash) {
            Ok(Some(block)) => {
                self.next = block.header.previous_hash;
                Some(Ok(block))
            }
            Ok(None) => Some(Err(LedgerError::Corrupted(format!(
                "block {hash} is referenced but not stored"
            )))),
            Err(e) => Some(Err(e.into())),
        }
    }
}
