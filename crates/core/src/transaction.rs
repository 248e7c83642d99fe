//! Ownership-transfer transactions, their canonical hash and signing.

use crate::crypto::{CryptoError, PubKeyHash, PublicKey, Signature, Wallet};
use crate::hash::{hash, Hash};
use crate::CodecError;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction is not signed")]
    MissingSignature,
    #[error("signature verification failed: {0}")]
    InvalidSignature(#[from] CryptoError),
    #[error("transaction id {stored} does not match canonical hash {computed}")]
    IdMismatch { stored: Hash, computed: Hash },
}

/// A transaction moving one physical item to a new owner.
///
/// An introduction transaction has neither a seller nor a UTXO reference and
/// mints the item into the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Canonical hash of every other field except the signature.
    pub tx_id: Hash,
    /// `tx_id` of the transaction that last moved this item.
    pub utxo_id: Option<Hash>,
    /// Signature of the initiating wallet over `tx_id`.
    pub signature: Signature,
    /// Identifier of the physical item.
    pub item_hash: Hash,
    /// Pubkey-hash of the seller.
    pub seller_hash: Option<PubKeyHash>,
    /// Pubkey-hash of the buyer.
    pub buyer_hash: PubKeyHash,
    /// Price paid.
    pub amount: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

/// The fields covered by `tx_id`, in canonical order.
#[derive(Serialize)]
struct CanonicalTransaction<'a> {
    utxo_id: &'a Option<Hash>,
    item_hash: &'a Hash,
    seller_hash: &'a Option<PubKeyHash>,
    buyer_hash: &'a PubKeyHash,
    amount: u64,
    timestamp: u64,
}

impl Transaction {
    /// Create an unsigned introduction transaction with its id computed.
    pub fn introduction(buyer: PubKeyHash, item_hash: Hash, amount: u64, timestamp: u64) -> Self {
        let mut tx = Self {
            tx_id: Hash::ZERO,
            utxo_id: None,
            signature: Signature::default(),
            item_hash,
            seller_hash: None,
            buyer_hash: buyer,
            amount,
            timestamp,
        };
        tx.tx_id = tx.compute_id();
        tx
    }

    /// Create an unsigned transfer transaction with its id computed.
    pub fn transfer(
        utxo_id: Hash,
        seller: PubKeyHash,
        buyer: PubKeyHash,
        item_hash: Hash,
        amount: u64,
        timestamp: u64,
    ) -> Self {
        let mut tx = Self {
            tx_id: Hash::ZERO,
            utxo_id: Some(utxo_id),
            signature: Signature::default(),
            item_hash,
            seller_hash: Some(seller),
            buyer_hash: buyer,
            amount,
            timestamp,
        };
        tx.tx_id = tx.compute_id();
        tx
    }

    /// Hash of the canonical encoding of all fields except `tx_id` and `signature`.
    pub fn compute_id(&self) -> Hash {
        let canonical = CanonicalTransaction {
            utxo_id: &self.utxo_id,
            item_hash: &self.item_hash,
            seller_hash: &self.seller_hash,
            buyer_hash: &self.buyer_hash,
            amount: self.amount,
            timestamp: self.timestamp,
        };
        let encoded = bincode::serialize(&canonical).expect("serialization should not fail");
        hash(&encoded)
    }

    /// Recompute and store `tx_id`.
    pub fn seal(&mut self) {
        self.tx_id = self.compute_id();
    }

    /// Check the stored `tx_id` against the canonical hash.
    pub fn verify_id(&self) -> Result<(), TransactionError> {
        let computed = self.compute_id();
        if computed != self.tx_id {
            return Err(TransactionError::IdMismatch {
                stored: self.tx_id,
                computed,
            });
        }
        Ok(())
    }

    /// Sign `tx_id` with the given wallet.
    pub fn sign(&mut self, wallet: &Wallet) {
        self.signature = wallet.sign_hash(&self.tx_id);
    }

    /// Create a signed transaction.
    pub fn signed(mut self, wallet: &Wallet) -> Self {
        self.sign(wallet);
        self
    }

    /// Verify the signature over `tx_id`.
    pub fn verify_signature(&self, public_key: &PublicKey) -> Result<(), TransactionError> {
        if self.signature.is_empty() {
            return Err(TransactionError::MissingSignature);
        }
        public_key.verify(self.tx_id.as_bytes(), &self.signature)?;
        Ok(())
    }

    /// Check if this transaction introduces a new item.
    pub fn is_introduction(&self) -> bool {
        self.seller_hash.is_none() && self.utxo_id.is_none()
    }

    /// Check whether the given pubkey-hash is the buyer or the seller.
    pub fn involves(&self, pubkey_hash: &PubKeyHash) -> bool {
        self.buyer_hash == *pubkey_hash || self.seller_hash.as_ref() == Some(pubkey_hash)
    }

    /// Encode for the wire or storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from [`Transaction::to_bytes`] output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Current Unix time in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
