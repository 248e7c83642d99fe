//! Item ownership ledger for itemchain.
//!
//! This crate brings together all components into a working ledger:
//! - **Blockchain**: genesis, validated atomic appends, tip-to-genesis traversal
//! - **Queries**: item history, ownership and per-wallet views by chain replay
//! - **Builders**: signed introduction and transfer transactions
//! - **Ownership**: replay of a block's transactions against the items they move
//! - **Mempool**: pending transactions with a mining trigger
//!
//! # Example
//!
//! ```rust,no_run
//! use itemchain_chain::{Blockchain, LedgerConfig};
//! use itemchain_core::{item_hash_from_id, Wallet};
//! use itemchain_storage::Storage;
//!
//! let storage = Storage::open("./itemchain_data").unwrap();
//! let chain = Blockchain::init(&storage, LedgerConfig::default()).unwrap();
//!
//! let wallet = Wallet::generate();
//! let tx = chain
//!     .build_introduction(&wallet, item_hash_from_id("SN-0001"), 100)
//!     .unwrap();
//! let block = chain.mine_block(vec![tx], &wallet.pubkey_hash()).unwrap();
//! chain.add_block(&block).unwrap();
//!
//! let owned = chain.wallet_owned_items(&wallet.address()).unwrap();
//! ```

pub mod blockchain;
pub mod builder;
pub mod config;
pub mod error;
pub mod mempool;
pub mod ownership;
pub mod query;

// Re-export commonly used types
pub use blockchain::{BlockIter, Blockchain};
pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, Result};
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use ownership::OwnershipView;
