//! Persistent storage layer for itemchain.
//!
//! Blocks are stored in sled keyed by their 32-byte hash. One reserved key
//! (`"lh"`) holds the hash of the current tip.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │          Ledger (itemchain-chain)          │
//! └─────────────────────┬──────────────────────┘
//!                       │
//! ┌─────────────────────▼──────────────────────┐
//! │  ChainStore                                │
//! │   - blocks by hash                         │
//! │   - tip pointer                            │
//! │   - atomic append                          │
//! │  Storage                                   │
//! │   - sled wrapper, bincode values           │
//! │   - read-write transactions                │
//! └─────────────────────┬──────────────────────┘
//!                       │
//! ┌─────────────────────▼──────────────────────┐
//! │           sled (embedded KV store)         │
//! └────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use itemchain_core::Block;
//! use itemchain_storage::{ChainStore, Storage};
//!
//! let storage = Storage::open("./itemchain_data").unwrap();
//! let chain = ChainStore::new(&storage);
//! let tip = chain.init_genesis(&Block::genesis()).unwrap();
//! ```

pub mod chain;
pub mod db;

// Re-export commonly used types
pub use chain::{ChainStore, LAST_HASH_KEY};
pub use db::{Result, Storage, StorageError};
