//! Core ledger primitives for itemchain.
//!
//! This crate provides the fundamental types used throughout the ledger:
//! - SHA-256 hashing and hex/binary encodings
//! - Wallets, signatures, pubkey-hashes and addresses
//! - Ownership-transfer transactions
//! - Merkle trees with membership proofs
//! - Blocks and the genesis block
//! - Item identifiers

pub mod block;
pub mod crypto;
pub mod hash;
pub mod item;
pub mod merkle;
pub mod transaction;

use thiserror::Error;

/// Failure to encode or decode the binary wire format.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("codec error: {0}")]
    Bincode(#[from] bincode::Error),
}

// Re-export commonly used types at the crate root
pub use block::{Block, BlockHeader, GENESIS_SEED, GENESIS_TIMESTAMP};
pub use crypto::{verify_token, CryptoError, PubKeyHash, PublicKey, Signature, Wallet};
pub use hash::{hash, hash_concat, Hash, H256};
pub use item::{item_hash_from_id, Item};
pub use merkle::{verify_membership, verify_proof, MerkleError, MerkleProof, MerkleTree};
pub use transaction::{current_timestamp, Transaction, TransactionError};
