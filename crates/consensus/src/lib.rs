//! Proof-of-work consensus for itemchain.
//!
//! This crate provides:
//! - The leading-zero puzzle over a block's hash, mined sequentially or in
//!   parallel on the rayon pool
//! - Difficulty policies (the periodic height ramp, or a fixed value)
//! - Block validation (recomputed hash, proof, difficulty, transaction ids)
//!
//! # Example
//!
//! ```rust,no_run
//! use itemchain_consensus::{verify, BlockValidator, DifficultyPolicy, Miner};
//! use itemchain_core::Block;
//!
//! let policy = DifficultyPolicy::PeriodicRamp;
//! let mut block = Block::new(1, Block::genesis_hash(), vec![], policy.difficulty_for(1));
//! Miner::default().mine(&mut block, policy.difficulty_for(1)).unwrap();
//!
//! assert!(verify(&block));
//! BlockValidator::validate_block(&block, &policy).unwrap();
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{
    difficulty_for_height, has_leading_zeros, leading_zero_digits, mine, mine_parallel, verify,
    DifficultyPolicy, Miner, PowError, DEFAULT_MAX_ITERATIONS, DIFFICULTY_PERIOD, MAX_DIFFICULTY,
};
pub use validator::{BlockValidator, TransactionValidator, ValidationError};
