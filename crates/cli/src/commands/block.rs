//! Block operations command.

use super::{load_config, load_wallet, open_storage};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use itemchain_chain::Blockchain;
use itemchain_core::Hash;
use std::path::PathBuf;

#[derive(Args)]
pub struct BlockArgs {
    #[command(subcommand)]
    command: BlockCommand,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List recent blocks
    List {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
    /// Show detailed block information
    Info {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Block hash (hex format)
        block_hash: String,
    },
    /// Mine an empty block to earn introduction credit
    Mine {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Miner wallet name (key file without .json extension)
        #[arg(short, long)]
        wallet: String,
    },
}

pub fn run(args: BlockArgs) -> Result<()> {
    match args.command {
        BlockCommand::List { data_dir, count } => list_blocks(data_dir, count),
        BlockCommand::Info {
            data_dir,
            block_hash,
        } => show_block_info(data_dir, block_hash),
        BlockCommand::Mine { data_dir, wallet } => mine_block(data_dir, wallet),
    }
}

fn list_blocks(data_dir: PathBuf, count: usize) -> Result<()> {
    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    println!();
    println!("{}", "Recent Blocks:".bold().cyan());
    println!();

    for block in blockchain.last_n_blocks(count)? {
        println!(
            "  {} {} {}",
            format!("#{}", block.height()).bright_black(),
            block.hash().to_hex()[..16].bright_yellow(),
            format!("({} txs)", block.tx_count()).bright_black()
        );
    }

    println!();
    Ok(())
}

fn show_block_info(data_dir: PathBuf, block_hash: String) -> Result<()> {
    let hash = Hash::from_hex(&block_hash)
        .with_context(|| format!("Invalid block hash: {}", block_hash))?;

    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;
    let block = blockchain.get_block(&hash)?.context("Block not found")?;

    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Height:       {}", block.height().to_string().bright_cyan());
    println!("  Hash:         {}", block.hash().to_hex().bright_yellow());
    println!(
        "  Parent Hash:  {}",
        block
            .header
            .previous_hash
            .map(|h| h.to_hex())
            .unwrap_or_else(|| "-".into())
            .bright_black()
    );
    println!(
        "  Merkle Root:  {}",
        block
            .merkle_root()
            .map(|h| h.to_hex())
            .unwrap_or_else(|| "-".into())
            .bright_black()
    );
    println!(
        "  Miner:        {}",
        block
            .header
            .miner_pubkey_hash
            .map(|pkh| pkh.to_address())
            .unwrap_or_else(|| "-".into())
            .bright_black()
    );
    println!(
        "  Timestamp:    {}",
        block.header.timestamp.to_string().bright_black()
    );
    println!("  Nonce:        {}", block.header.nonce.to_string().bright_black());
    println!(
        "  Difficulty:   {}",
        block.header.difficulty.to_string().bright_cyan()
    );
    println!(
        "  Transactions: {}",
        block.tx_count().to_string().bright_cyan()
    );
    println!();

    if block.tx_count() > 0 {
        println!("{}", "Transactions:".bold());
        println!();
        for (i, tx) in block.transactions().iter().enumerate() {
            println!(
                "  {} {} item {}",
                format!("{}.", i + 1).bright_black(),
                tx.tx_id.to_hex()[..16].bright_yellow(),
                tx.item_hash.to_hex()[..16].bright_black()
            );
        }
        println!();
    }

    Ok(())
}

fn mine_block(data_dir: PathBuf, wallet_name: String) -> Result<()> {
    let wallet = load_wallet(&data_dir, &wallet_name)?;
    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    println!("{}", "Mining new block...".bold().cyan());
    println!();
    println!("  Miner: {}", wallet.address().bright_yellow());

    let block = blockchain
        .mine_block(Vec::new(), &wallet.pubkey_hash())
        .with_context(|| "Mining failed")?;
    blockchain
        .add_block(&block)
        .with_context(|| "Block was rejected")?;
    storage.flush()?;

    println!();
    println!(
        "{}  Block #{} {}",
        "✓".green().bold(),
        block.height(),
        block.hash().to_hex().bright_yellow()
    );
    println!("    Nonce:      {}", block.header.nonce.to_string().bright_black());
    println!(
        "    Difficulty: {}",
        block.header.difficulty.to_string().bright_cyan()
    );
    println!();

    Ok(())
}
