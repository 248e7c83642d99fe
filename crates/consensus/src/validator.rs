//! Transaction and block validation rules.
//!
//! Block checks run before the block reaches the store. Linkage to the tip is
//! checked later, inside the storage transaction that appends it.

use crate::pow::{has_leading_zeros, DifficultyPolicy};
use itemchain_core::{Block, Hash, Transaction};
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block hash {stored} does not match recomputed hash {computed}")]
    HashMismatch { stored: Hash, computed: Hash },

    #[error("block hash lacks {difficulty} leading zero digits")]
    ProofMissing { difficulty: u64 },

    #[error("block difficulty {got} is below the required {required}")]
    DifficultyTooLow { required: u64, got: u64 },

    #[error("transaction {index} id does not match its canonical hash")]
    TransactionIdMismatch { index: usize },

    #[error("transaction {index} must set both seller and utxo id, or neither")]
    MalformedTransaction { index: usize },

    #[error("transaction {index} is not signed")]
    MissingSignature { index: usize },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Transaction validator.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Structural checks that need no chain state.
    ///
    /// `index` is only used to label the error.
    pub fn validate_transaction(tx: &Transaction, index: usize) -> Result<()> {
        if tx.seller_hash.is_some() != tx.utxo_id.is_some() {
            return Err(ValidationError::MalformedTransaction { index });
        }
        if tx.verify_id().is_err() {
            return Err(ValidationError::TransactionIdMismatch { index });
        }
        if tx.signature.is_empty() {
            return Err(ValidationError::MissingSignature { index });
        }
        Ok(())
    }
}

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// The stored hash must equal the hash recomputed from the fields.
    pub fn validate_hash(block: &Block) -> Result<()> {
        let computed = block.compute_hash();
        if computed != block.hash() {
            return Err(ValidationError::HashMismatch {
                stored: block.hash(),
                computed,
            });
        }
        Ok(())
    }

    /// The hash must meet the difficulty the block declares.
    pub fn validate_proof(block: &Block) -> Result<()> {
        if !has_leading_zeros(&block.hash(), block.header.difficulty) {
            return Err(ValidationError::ProofMissing {
                difficulty: block.header.difficulty,
            });
        }
        Ok(())
    }

    /// The declared difficulty must not undercut the policy for its height.
    pub fn validate_difficulty(block: &Block, policy: &DifficultyPolicy) -> Result<()> {
        if block.is_genesis() {
            return Ok(());
        }
        let required = policy.difficulty_for(block.height());
        if block.header.difficulty < required {
            return Err(ValidationError::DifficultyTooLow {
                required,
                got: block.header.difficulty,
            });
        }
        Ok(())
    }

    pub fn validate_transactions(block: &Block) -> Result<()> {
        for (index, tx) in block.transactions().iter().enumerate() {
            TransactionValidator::validate_transaction(tx, index)?;
        }
        Ok(())
    }

    /// Full pre-append validation: hash, proof, difficulty, transactions.
    pub fn validate_block(block: &Block, policy: &DifficultyPolicy) -> Result<()> {
        Self::validate_hash(block)?;
        Self::validate_proof(block)?;
        Self::validate_difficulty(block, policy)?;
        Self::validate_transactions(block)?;
        Ok(())
    }
}
