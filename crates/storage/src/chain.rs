//! Block storage and chain tip management.

use crate::db::{abort, tx_get, tx_put, Result, Storage, StorageError};
use itemchain_core::{Block, Hash};
use tracing::{debug, info};

/// Reserved key holding the tip hash. Block keys are always 32 bytes, so this
/// can never collide with one.
pub const LAST_HASH_KEY: &[u8] = b"lh";

/// Manages block storage and the chain tip.
pub struct ChainStore<'a> {
    storage: &'a Storage,
}

impl<'a> ChainStore<'a> {
    /// Create a new ChainStore wrapping the given storage.
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Get a block by its hash.
    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.storage.get(hash.as_bytes())
    }

    /// Check if a block exists by hash.
    pub fn has_block(&self, hash: &Hash) -> Result<bool> {
        self.storage.contains(hash.as_bytes())
    }

    /// Get the current tip hash.
    pub fn get_tip(&self) -> Result<Option<Hash>> {
        self.storage.get(LAST_HASH_KEY)
    }

    /// Get the tip block.
    pub fn get_latest_block(&self) -> Result<Option<Block>> {
        match self.get_tip()? {
            Some(hash) => self.get_block(&hash),
            None => Ok(None),
        }
    }

    /// Check if the chain is initialized (has a tip).
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.get_tip()?.is_some())
    }

    /// Store the genesis block and point the tip at it, unless the chain is
    /// already initialized. Returns the tip either way.
    ///
    /// Fails if the block is not the canonical genesis block.
    pub fn init_genesis(&self, genesis: &Block) -> Result<Hash> {
        if !genesis.is_genesis() {
            return Err(StorageError::InvalidGenesis(
                "genesis block must have height 0 and no previous hash".into(),
            ));
        }
        if genesis.hash() != Block::genesis_hash() || !genesis.verify_hash() {
            return Err(StorageError::InvalidGenesis(format!(
                "unexpected genesis hash {}",
                genesis.hash()
            )));
        }

        let hash = genesis.hash();
        let (tip, created) = self.storage.transaction(|tree| {
            if let Some(tip) = tx_get::<_, Hash>(tree, LAST_HASH_KEY)? {
                return Ok((tip, false));
            }
            tx_put(tree, hash.as_bytes(), genesis)?;
            tx_put(tree, LAST_HASH_KEY, &hash)?;
            Ok((hash, true))
        })?;

        if created {
            info!(hash = %tip, "Created genesis block");
        } else {
            debug!(tip = %tip, "Chain already initialized");
        }
        Ok(tip)
    }

    /// Append a block on top of the current tip.
    ///
    /// The tip read, the linkage checks and both writes happen in one sled
    /// transaction, so concurrent appends are serialized and a failure leaves
    /// the store unchanged.
    ///
    /// Note: This does NOT validate hashes, proof-of-work or transactions.
    /// Full validation should be done before calling this.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        let hash = block.hash();

        self.storage.transaction(|tree| {
            let Some(tip) = tx_get::<_, Hash>(tree, LAST_HASH_KEY)? else {
                return abort(StorageError::NotInitialized);
            };
            let Some(tip_block) = tx_get::<_, Block>(tree, tip.as_bytes())? else {
                return abort(StorageError::Corrupted(format!(
                    "tip {tip} has no stored block"
                )));
            };

            if block.header.previous_hash != Some(tip) {
                return abort(StorageError::TipMismatch {
                    expected: tip,
                    found: block.header.previous_hash,
                });
            }
            let expected = tip_block.height() + 1;
            if block.height() != expected {
                return abort(StorageError::HeightMismatch {
                    expected,
                    found: block.height(),
                });
            }
            if tree.get(hash.as_bytes())?.is_some() {
                return abort(StorageError::DuplicateBlock(hash));
            }

            tx_put(tree, hash.as_bytes(), block)?;
            tx_put(tree, LAST_HASH_KEY, &hash)?;
            Ok(())
        })?;

        debug!(height = block.height(), hash = %hash, "Stored block and moved tip");
        Ok(())
    }
}
