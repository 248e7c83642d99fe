//! Proof-of-work: leading zero hex digits in the block hash.

use itemchain_core::{Block, Hash};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Heights after which the periodic ramp starts over at 1.
pub const DIFFICULTY_PERIOD: u64 = 2016;

/// A SHA-256 hash has 64 hex digits.
pub const MAX_DIFFICULTY: u64 = 64;

/// Default bound on nonce candidates per mining attempt.
pub const DEFAULT_MAX_ITERATIONS: u64 = 10_000_000;

/// Errors that can occur while mining.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowError {
    #[error("no nonce below {iterations} reaches difficulty {difficulty}")]
    MiningExhausted { difficulty: u64, iterations: u64 },

    #[error("difficulty {0} exceeds the 64 hex digits of a hash")]
    DifficultyOutOfRange(u64),
}

/// Number of leading `0` characters in the hash's hex form.
pub fn leading_zero_digits(hash: &Hash) -> u64 {
    let mut count = 0;
    for byte in hash.as_bytes() {
        if *byte == 0 {
            count += 2;
        } else {
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
    }
    count
}

/// Check whether the hex form of `hash` starts with at least `difficulty` zeros.
pub fn has_leading_zeros(hash: &Hash, difficulty: u64) -> bool {
    leading_zero_digits(hash) >= difficulty
}

/// `height mod 2016 + 1`.
pub fn difficulty_for_height(height: u64) -> u64 {
    height % DIFFICULTY_PERIOD + 1
}

/// How the required difficulty is derived for a new block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum DifficultyPolicy {
    /// [`difficulty_for_height`].
    #[default]
    PeriodicRamp,
    /// The same difficulty at every height.
    Fixed { difficulty: u64 },
}

impl DifficultyPolicy {
    /// Minimum difficulty a block at `height` must declare.
    pub fn difficulty_for(&self, height: u64) -> u64 {
        match self {
            DifficultyPolicy::PeriodicRamp => difficulty_for_height(height),
            DifficultyPolicy::Fixed { difficulty } => *difficulty,
        }
    }

    /// First height whose expected nonce search (16^difficulty tries) is
    /// larger than `budget`, or `None` if every height fits.
    pub fn first_unreachable_height(&self, budget: u64) -> Option<u64> {
        let fits = |difficulty: u64| {
            u32::try_from(difficulty)
                .ok()
                .and_then(|d| 16u128.checked_pow(d))
                .is_some_and(|tries| tries <= u128::from(budget))
        };
        match self {
            DifficultyPolicy::PeriodicRamp => {
                (0..DIFFICULTY_PERIOD).find(|h| !fits(difficulty_for_height(*h)))
            }
            DifficultyPolicy::Fixed { difficulty } => (!fits(*difficulty)).then_some(1),
        }
    }
}

/// Search nonces `0..max_iterations` in order; the first hit wins.
///
/// Sets the block's `difficulty`, `nonce` and `block_hash` on success and
/// leaves them untouched on failure.
pub fn mine(block: &mut Block, difficulty: u64, max_iterations: u64) -> Result<(), PowError> {
    check_difficulty(difficulty)?;

    let found = (0..max_iterations)
        .find(|nonce| has_leading_zeros(&block.hash_with_nonce(*nonce), difficulty));

    finish(block, difficulty, max_iterations, found)
}

/// Same as [`mine`] but shards the nonce range across the rayon pool.
///
/// Any matching nonce may win, not necessarily the smallest.
pub fn mine_parallel(
    block: &mut Block,
    difficulty: u64,
    max_iterations: u64,
) -> Result<(), PowError> {
    check_difficulty(difficulty)?;

    let template: &Block = block;
    let found = (0..max_iterations)
        .into_par_iter()
        .find_any(|nonce| has_leading_zeros(&template.hash_with_nonce(*nonce), difficulty));

    finish(block, difficulty, max_iterations, found)
}

fn check_difficulty(difficulty: u64) -> Result<(), PowError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(PowError::DifficultyOutOfRange(difficulty));
    }
    Ok(())
}

fn finish(
    block: &mut Block,
    difficulty: u64,
    max_iterations: u64,
    found: Option<u64>,
) -> Result<(), PowError> {
    let Some(nonce) = found else {
        debug!(difficulty, max_iterations, "Nonce search exhausted");
        return Err(PowError::MiningExhausted {
            difficulty,
            iterations: max_iterations,
        });
    };

    block.header.difficulty = difficulty;
    block.header.nonce = nonce;
    block.header.block_hash = block.hash_with_nonce(nonce);

    info!(
        "Mined block {} with nonce {} and hash {}",
        block.height(),
        nonce,
        block.header.block_hash
    );
    Ok(())
}

/// Recompute the hash from the block's fields, compare it to the stored one
/// and check the stored one against the declared difficulty.
pub fn verify(block: &Block) -> bool {
    block.verify_hash() && has_leading_zeros(&block.header.block_hash, block.header.difficulty)
}

/// Mining settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Miner {
    /// Nonce candidates tried before giving up.
    pub max_iterations: u64,
    /// Use [`mine_parallel`] instead of [`mine`].
    pub parallel: bool,
}

impl Default for Miner {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel: true,
        }
    }
}

impl Miner {
    pub fn new(max_iterations: u64, parallel: bool) -> Self {
        Self {
            max_iterations,
            parallel,
        }
    }

    pub fn mine(&self, block: &mut Block, difficulty: u64) -> Result<(), PowError> {
        if self.parallel {
            mine_parallel(block, difficulty, self.max_iterations)
        } else {
            mine(block, difficulty, self.max_iterations)
        }
    }
}
