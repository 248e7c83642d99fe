//! Block and block header structures.

use crate::crypto::PubKeyHash;
use crate::hash::{hash_concat, Hash};
use crate::merkle::MerkleTree;
use crate::transaction::{current_timestamp, Transaction};
use crate::CodecError;
use serde::{Deserialize, Serialize};

/// Seed string the genesis hash is derived from.
pub const GENESIS_SEED: &str = "Genesis Block";

/// Fixed genesis timestamp (2022-01-01T00:00:00Z).
pub const GENESIS_TIMESTAMP: u64 = 1_640_995_200;

/// The header of a block containing metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height (0 for genesis).
    pub height: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
    /// Proof-of-work nonce.
    pub nonce: u64,
    /// Required number of leading zero hex digits in `block_hash`.
    pub difficulty: u64,
    /// Hash of the previous block, `None` only for genesis.
    pub previous_hash: Option<Hash>,
    /// Hash found by proof-of-work.
    pub block_hash: Hash,
    /// Pubkey-hash of the wallet that mined the block.
    pub miner_pubkey_hash: Option<PubKeyHash>,
}

/// A block: header plus an optional merkle tree of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub merkle_tree: Option<MerkleTree>,
}

impl Block {
    /// Create an unmined block stamped with the current time.
    pub fn new(
        height: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        difficulty: u64,
    ) -> Self {
        Self::new_at(height, previous_hash, transactions, difficulty, current_timestamp())
    }

    /// Create an unmined block with an explicit timestamp.
    pub fn new_at(
        height: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        difficulty: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            header: BlockHeader {
                height,
                timestamp,
                nonce: 0,
                difficulty,
                previous_hash: Some(previous_hash),
                block_hash: Hash::ZERO,
                miner_pubkey_hash: None,
            },
            merkle_tree: MerkleTree::build(transactions).ok(),
        }
    }

    /// Create the genesis block. Every node derives the same one.
    pub fn genesis() -> Self {
        Self {
            header: BlockHeader {
                height: 0,
                timestamp: GENESIS_TIMESTAMP,
                nonce: 0,
                difficulty: 0,
                previous_hash: None,
                block_hash: Self::genesis_hash(),
                miner_pubkey_hash: None,
            },
            merkle_tree: None,
        }
    }

    /// The pre-agreed genesis hash.
    pub fn genesis_hash() -> Hash {
        hash_concat(&[GENESIS_SEED.as_bytes(), &GENESIS_TIMESTAMP.to_le_bytes()])
    }

    /// SHA-256 over `(nonce ^ timestamp)` little-endian, the previous hash and
    /// the merkle root. Absent fields are skipped, not zero-filled.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        let mixed = (nonce ^ self.header.timestamp).to_le_bytes();
        let previous = self.header.previous_hash;
        let root = self.merkle_root();

        let mut parts: Vec<&[u8]> = Vec::with_capacity(3);
        parts.push(&mixed);
        if let Some(previous) = previous.as_ref() {
            parts.push(previous.as_ref());
        }
        if let Some(root) = root.as_ref() {
            parts.push(root.as_ref());
        }
        hash_concat(&parts)
    }

    /// Recompute the block hash from the current fields.
    pub fn compute_hash(&self) -> Hash {
        if self.is_genesis() {
            return Self::genesis_hash();
        }
        self.hash_with_nonce(self.header.nonce)
    }

    /// Check the stored hash against the fields.
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.header.block_hash
    }

    /// Get the stored block hash.
    pub fn hash(&self) -> Hash {
        self.header.block_hash
    }

    /// Get the block height.
    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.height == 0 && self.header.previous_hash.is_none()
    }

    pub fn merkle_root(&self) -> Option<Hash> {
        self.merkle_tree.as_ref().map(MerkleTree::root)
    }

    /// Transactions in leaf order; empty for blocks without a tree.
    pub fn transactions(&self) -> &[Transaction] {
        self.merkle_tree
            .as_ref()
            .map(MerkleTree::transactions)
            .unwrap_or_default()
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions().len()
    }

    /// Index of the last leaf that moves the given item.
    pub fn last_leaf_with_item(&self, item_hash: &Hash) -> Option<usize> {
        self.transactions()
            .iter()
            .rposition(|tx| tx.item_hash == *item_hash)
    }

    /// Encode for the wire or storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from [`Block::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
