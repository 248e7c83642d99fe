//! Ledger errors and their coarse classification.

use crate::mempool::MempoolError;
use itemchain_consensus::{PowError, ValidationError};
use itemchain_core::{CryptoError, Hash, PubKeyHash};
use itemchain_storage::StorageError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("proof-of-work error: {0}")]
    Pow(#[from] PowError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("item {0} has no transaction on the chain")]
    ItemNotFound(Hash),

    #[error("item {item} is owned by {owner}, not the sender")]
    NotOwner { item: Hash, owner: PubKeyHash },

    #[error("transfer of item {item} spends {found:?}, but its newest transaction is {expected}")]
    UtxoMismatch {
        item: Hash,
        expected: Hash,
        found: Option<Hash>,
    },

    #[error("insufficient funds: {mined} mined blocks for {introduced} introductions (ratio must exceed {ratio})")]
    InsufficientFunds {
        mined: usize,
        introduced: usize,
        ratio: f64,
    },

    #[error("item {0} was already introduced")]
    DuplicateItem(Hash),

    #[error("chain is corrupted: {0}")]
    Corrupted(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error classes an outer layer maps to its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Encoding,
    NotFound,
    Ownership,
    InsufficientFunds,
    DuplicateItem,
    Signature,
    ProofOfWork,
    HashMismatch,
    Store,
    Corruption,
    Validation,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Storage(e) => match e {
                StorageError::Database(_) | StorageError::NotInitialized => ErrorKind::Store,
                StorageError::Serialization(_) | StorageError::Corrupted(_) => ErrorKind::Corruption,
                StorageError::NotFound(_) => ErrorKind::NotFound,
                StorageError::InvalidGenesis(_)
                | StorageError::TipMismatch { .. }
                | StorageError::HeightMismatch { .. }
                | StorageError::DuplicateBlock(_) => ErrorKind::Validation,
            },
            LedgerError::Validation(e) => match e {
                ValidationError::HashMismatch { .. }
                | ValidationError::TransactionIdMismatch { .. } => ErrorKind::HashMismatch,
                ValidationError::ProofMissing { .. } | ValidationError::DifficultyTooLow { .. } => {
                    ErrorKind::ProofOfWork
                }
                ValidationError::MissingSignature { .. } => ErrorKind::Signature,
                ValidationError::MalformedTransaction { .. } => ErrorKind::Validation,
            },
            LedgerError::Pow(_) => ErrorKind::ProofOfWork,
            LedgerError::Crypto(CryptoError::VerificationFailed) => ErrorKind::Signature,
            LedgerError::Crypto(_) => ErrorKind::Encoding,
            LedgerError::Mempool(e) => match e {
                MempoolError::InvalidId(_) => ErrorKind::HashMismatch,
                MempoolError::TransactionNotFound => ErrorKind::NotFound,
                MempoolError::DuplicateTransaction | MempoolError::MempoolFull(_) => {
                    ErrorKind::Validation
                }
            },
            LedgerError::ItemNotFound(_) => ErrorKind::NotFound,
            LedgerError::NotOwner { .. } | LedgerError::UtxoMismatch { .. } => ErrorKind::Ownership,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::DuplicateItem(_) => ErrorKind::DuplicateItem,
            LedgerError::Corrupted(_) => ErrorKind::Corruption,
        }
    }
}
