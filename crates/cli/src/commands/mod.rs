//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use itemchain_chain::LedgerConfig;
use itemchain_core::Wallet;
use itemchain_storage::Storage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

mod block;
mod init;
mod item;
mod wallet;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new chain
    Init(init::InitArgs),
    /// Wallet management
    Wallet(wallet::WalletArgs),
    /// Introduce, transfer and trace items
    Item(item::ItemArgs),
    /// Block operations
    Block(block::BlockArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args),
        Commands::Wallet(args) => wallet::run(args),
        Commands::Item(args) => item::run(args),
        Commands::Block(args) => block::run(args),
    }
}

const CONFIG_FILE: &str = "config.json";
const KEYS_DIR: &str = "keys";

/// On-disk wallet file.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyFile {
    pub address: String,
    pub public_key: String,
    pub private_key: String,
}

impl KeyFile {
    pub fn from_wallet(wallet: &Wallet) -> Self {
        Self {
            address: wallet.address(),
            public_key: wallet.public_key.to_hex(),
            private_key: hex::encode(wallet.private_key()),
        }
    }

    pub fn to_wallet(&self) -> Result<Wallet> {
        let wallet = Wallet::from_private_key_hex(&self.private_key)
            .context("Key file holds an invalid private key")?;
        anyhow::ensure!(
            wallet.address() == self.address,
            "Key file address {} does not match its private key",
            self.address
        );
        Ok(wallet)
    }
}

pub fn keys_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(KEYS_DIR)
}

pub fn save_wallet(data_dir: &Path, name: &str, wallet: &Wallet) -> Result<PathBuf> {
    let keys_dir = keys_dir(data_dir);
    fs::create_dir_all(&keys_dir)?;

    let key_file = keys_dir.join(format!("{}.json", name));
    let json = serde_json::to_string_pretty(&KeyFile::from_wallet(wallet))?;
    fs::write(&key_file, json)
        .with_context(|| format!("Failed to write key file: {}", key_file.display()))?;
    debug!(path = %key_file.display(), "Saved wallet");
    Ok(key_file)
}

pub fn load_wallet(data_dir: &Path, name: &str) -> Result<Wallet> {
    let key_file = keys_dir(data_dir).join(format!("{}.json", name));
    let content = fs::read_to_string(&key_file)
        .with_context(|| format!("Failed to read key file: {}", key_file.display()))?;
    let keys: KeyFile = serde_json::from_str(&content)
        .with_context(|| format!("Malformed key file: {}", key_file.display()))?;
    keys.to_wallet()
}

/// Ledger settings from `config.json`; defaults when the file is absent.
pub fn load_config(data_dir: &Path) -> Result<LedgerConfig> {
    let config_file = data_dir.join(CONFIG_FILE);
    if !config_file.exists() {
        return Ok(LedgerConfig::default());
    }
    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed to read config: {}", config_file.display()))?;
    let config: LedgerConfig = serde_json::from_str(&content)
        .with_context(|| format!("Malformed config: {}", config_file.display()))?;
    debug!(path = %config_file.display(), difficulty = ?config.difficulty, "Loaded ledger config");
    Ok(config)
}

pub fn save_config(data_dir: &Path, config: &LedgerConfig) -> Result<PathBuf> {
    let config_file = data_dir.join(CONFIG_FILE);
    fs::write(&config_file, serde_json::to_string_pretty(config)?)
        .with_context(|| format!("Failed to write config: {}", config_file.display()))?;
    Ok(config_file)
}

pub fn open_storage(data_dir: &Path) -> Result<Storage> {
    anyhow::ensure!(
        data_dir.join(CONFIG_FILE).exists(),
        "No chain at {}. Did you run 'itemchain init'?",
        data_dir.display()
    );
    Storage::open(data_dir).with_context(|| "Failed to open storage")
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemchain_consensus::DifficultyPolicy;

    #[test]
    fn test_wallet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = Wallet::generate();

        let path = save_wallet(dir.path(), "alice", &wallet).unwrap();
        assert!(path.ends_with("keys/alice.json"));

        let loaded = load_wallet(dir.path(), "alice").unwrap();
        assert_eq!(loaded.address(), wallet.address());
        assert_eq!(loaded.private_key(), wallet.private_key());
    }

    #[test]
    fn test_tampered_key_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut keys = KeyFile::from_wallet(&Wallet::generate());
        keys.address = Wallet::generate().address();

        fs::create_dir_all(keys_dir(dir.path())).unwrap();
        fs::write(
            keys_dir(dir.path()).join("bob.json"),
            serde_json::to_string(&keys).unwrap(),
        )
        .unwrap();

        assert!(load_wallet(dir.path(), "bob").is_err());
        assert!(load_wallet(dir.path(), "nobody").is_err());
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()).unwrap(), LedgerConfig::default());

        let config = LedgerConfig {
            difficulty: DifficultyPolicy::Fixed { difficulty: 3 },
            ..Default::default()
        };
        save_config(dir.path(), &config).unwrap();
        assert_eq!(load_config(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_open_storage_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_storage(dir.path()).is_err());
    }
}
