//! Item commands: hash, introduce, transfer and trace physical items.

use super::{load_config, load_wallet, open_storage};
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use itemchain_chain::Blockchain;
use itemchain_core::{item_hash_from_id, Block, Hash, Item, Transaction, Wallet};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct ItemArgs {
    #[command(subcommand)]
    command: ItemCommand,
}

/// Exactly one way of naming an item.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ItemRef {
    /// Physical identifier (serial number, tag)
    #[arg(long)]
    id: Option<String>,

    /// Item hash (hex format)
    #[arg(long)]
    hash: Option<String>,

    /// JSON file with a full item description
    #[arg(long)]
    file: Option<PathBuf>,
}

impl ItemRef {
    fn resolve(&self) -> Result<Hash> {
        if let Some(id) = &self.id {
            return Ok(item_hash_from_id(id));
        }
        if let Some(hex) = &self.hash {
            return Hash::from_hex(hex).with_context(|| format!("Invalid item hash: {}", hex));
        }
        if let Some(path) = &self.file {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read item file: {}", path.display()))?;
            let item: Item = serde_json::from_str(&content)
                .with_context(|| format!("Malformed item file: {}", path.display()))?;
            return Ok(item.hash());
        }
        bail!("One of --id, --hash or --file is required")
    }
}

#[derive(Subcommand)]
enum ItemCommand {
    /// Print an item's ledger identifier
    Hash {
        #[command(flatten)]
        item: ItemRef,
    },
    /// Register a new item to a wallet and mine it into a block
    Introduce {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Wallet name (key file without .json extension)
        #[arg(short, long)]
        wallet: String,

        #[command(flatten)]
        item: ItemRef,

        /// Declared value
        #[arg(short, long, default_value = "0")]
        amount: u64,
    },
    /// Sell an owned item to another address and mine the transfer
    Transfer {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Seller's wallet name (key file without .json extension)
        #[arg(short, long)]
        wallet: String,

        /// Buyer address (base58)
        #[arg(short, long)]
        to: String,

        #[command(flatten)]
        item: ItemRef,

        /// Price paid
        #[arg(short, long, default_value = "0")]
        amount: u64,
    },
    /// Show the current owner of an item
    Owner {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        #[command(flatten)]
        item: ItemRef,
    },
    /// Show every transaction that moved an item, newest first
    History {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        #[command(flatten)]
        item: ItemRef,
    },
}

pub fn run(args: ItemArgs) -> Result<()> {
    match args.command {
        ItemCommand::Hash { item } => {
            println!("{}", item.resolve()?.to_hex());
            Ok(())
        }
        ItemCommand::Introduce {
            data_dir,
            wallet,
            item,
            amount,
        } => introduce(data_dir, wallet, item, amount),
        ItemCommand::Transfer {
            data_dir,
            wallet,
            to,
            item,
            amount,
        } => transfer(data_dir, wallet, to, item, amount),
        ItemCommand::Owner { data_dir, item } => show_owner(data_dir, item),
        ItemCommand::History { data_dir, item } => show_history(data_dir, item),
    }
}

fn introduce(data_dir: PathBuf, wallet_name: String, item: ItemRef, amount: u64) -> Result<()> {
    let item_hash = item.resolve()?;
    let wallet = load_wallet(&data_dir, &wallet_name)?;

    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    println!("{}", "Introducing item...".bold().cyan());
    println!();
    println!("  Item:   {}", item_hash.to_hex().bright_yellow());
    println!("  Owner:  {}", wallet.address().bright_yellow());

    let tx = blockchain
        .build_introduction(&wallet, item_hash, amount)
        .with_context(|| "Failed to build introduction")?;
    commit(&blockchain, tx, &wallet)?;
    storage.flush()?;
    Ok(())
}

fn transfer(
    data_dir: PathBuf,
    wallet_name: String,
    to: String,
    item: ItemRef,
    amount: u64,
) -> Result<()> {
    let item_hash = item.resolve()?;
    let wallet = load_wallet(&data_dir, &wallet_name)?;

    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    println!("{}", "Transferring item...".bold().cyan());
    println!();
    println!("  Item:   {}", item_hash.to_hex().bright_yellow());
    println!("  From:   {}", wallet.address().bright_yellow());
    println!("  To:     {}", to.bright_yellow());
    println!("  Amount: {}", amount.to_string().bright_cyan());

    let tx = blockchain
        .build_transfer(&wallet, &to, item_hash, amount)
        .with_context(|| "Failed to build transfer")?;
    commit(&blockchain, tx, &wallet)?;
    storage.flush()?;
    Ok(())
}

/// Mine the transaction into its own block, with the sender as miner, and append it.
fn commit(blockchain: &Blockchain, tx: Transaction, miner: &Wallet) -> Result<Block> {
    let tx_id = tx.tx_id;
    println!("  Tx ID:  {}", tx_id.to_hex().bright_black());
    println!();
    println!("{}", "Mining...".bold());

    let block = blockchain
        .mine_block(vec![tx], &miner.pubkey_hash())
        .with_context(|| "Mining failed")?;
    blockchain
        .add_block(&block)
        .with_context(|| "Block was rejected")?;

    println!(
        "{}  Block #{} {} (nonce {}, difficulty {})",
        "✓".green().bold(),
        block.height(),
        block.hash().to_hex()[..16].bright_yellow(),
        block.header.nonce,
        block.header.difficulty
    );
    Ok(block)
}

fn show_owner(data_dir: PathBuf, item: ItemRef) -> Result<()> {
    let item_hash = item.resolve()?;
    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    let owner = blockchain.item_owner(&item_hash)?;

    println!();
    println!("  Item:  {}", item_hash.to_hex().bright_yellow());
    println!("  Owner: {}", owner.to_address().bright_yellow());
    println!();
    Ok(())
}

fn show_history(data_dir: PathBuf, item: ItemRef) -> Result<()> {
    let item_hash = item.resolve()?;
    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    let txs = blockchain.txs_including_item(&item_hash)?;
    if txs.is_empty() {
        bail!("Item {} has no transaction on the chain", item_hash.to_hex());
    }

    println!();
    println!("{}", "Item History:".bold().cyan());
    println!();
    for tx in &txs {
        let from = match tx.seller_hash {
            Some(seller) => seller.to_address(),
            None => "(introduced)".to_string(),
        };
        println!(
            "  {} {} {} {} {}",
            tx.timestamp.to_string().bright_black(),
            from.bright_black(),
            "→".bright_black(),
            tx.buyer_hash.to_address().bright_yellow(),
            format!("({})", tx.amount).bright_cyan()
        );
    }
    println!();
    Ok(())
}
