//! Wallet management command.

use super::{keys_dir, load_config, load_wallet, open_storage, save_wallet};
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use itemchain_chain::Blockchain;
use itemchain_core::{PubKeyHash, Wallet};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct WalletArgs {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand)]
enum WalletCommand {
    /// Generate a new wallet
    New {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Name for the key file
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List saved wallets
    List {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
    /// Show a saved wallet's keys
    Show {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Key file name (without .json extension)
        name: String,
    },
    /// Show what the chain records for an address
    Info {
        /// Directory to store blockchain data
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,

        /// Wallet address (base58)
        address: String,
    },
}

pub fn run(args: WalletArgs) -> Result<()> {
    match args.command {
        WalletCommand::New { data_dir, name } => new_wallet(data_dir, name),
        WalletCommand::List { data_dir } => list_wallets(data_dir),
        WalletCommand::Show { data_dir, name } => show_wallet(data_dir, name),
        WalletCommand::Info { data_dir, address } => show_info(data_dir, address),
    }
}

fn new_wallet(data_dir: PathBuf, name: Option<String>) -> Result<()> {
    let wallet = Wallet::generate();
    let address = wallet.address();

    println!("{}", "Generated new wallet:".bold().cyan());
    println!();
    println!("  Address:     {}", address.bright_yellow());
    println!("  Pubkey Hash: {}", wallet.pubkey_hash().to_hex().bright_black());
    println!("  Public Key:  {}", wallet.public_key.to_hex().bright_black());

    let name = name.unwrap_or_else(|| format!("wallet_{}", &address[..8]));
    let key_file = save_wallet(&data_dir, &name, &wallet)?;

    println!();
    println!(
        "{}  Saved to: {}",
        "✓".green().bold(),
        key_file.display().to_string().bright_black()
    );
    println!();
    println!("{}", "Keep your private key safe!".yellow().bold());

    Ok(())
}

fn list_wallets(data_dir: PathBuf) -> Result<()> {
    let keys_dir = keys_dir(&data_dir);
    if !keys_dir.exists() {
        bail!("No wallets found in {}", keys_dir.display());
    }

    println!();
    println!("{}", "Wallets:".bold().cyan());
    println!();

    let mut entries: Vec<_> = fs::read_dir(&keys_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    for path in entries {
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match load_wallet(&data_dir, name) {
            Ok(wallet) => println!(
                "  {} {}",
                format!("{:<20}", name).bright_cyan(),
                wallet.address().bright_yellow()
            ),
            Err(e) => println!("  {} {}", format!("{:<20}", name).bright_cyan(), e.to_string().red()),
        }
    }

    println!();
    Ok(())
}

fn show_wallet(data_dir: PathBuf, name: String) -> Result<()> {
    let wallet = load_wallet(&data_dir, &name)?;

    println!();
    println!("{}", "Wallet:".bold().cyan());
    println!();
    println!("  Name:        {}", name.bright_cyan());
    println!("  Address:     {}", wallet.address().bright_yellow());
    println!("  Pubkey Hash: {}", wallet.pubkey_hash().to_hex().bright_black());
    println!("  Public Key:  {}", wallet.public_key.to_hex().bright_black());
    println!();

    Ok(())
}

fn show_info(data_dir: PathBuf, address: String) -> Result<()> {
    let pubkey_hash = PubKeyHash::from_address(&address)
        .with_context(|| format!("Invalid address: {}", address))?;

    let storage = open_storage(&data_dir)?;
    let blockchain = Blockchain::init(&storage, load_config(&data_dir)?)?;

    let owned = blockchain.items_owned_by(&pubkey_hash)?;
    let mined = blockchain.blocks_mined_by(&pubkey_hash)?;
    let introduced = blockchain.introduction_txs_of(&pubkey_hash)?;
    let can_introduce = blockchain.check_funds(&pubkey_hash).is_ok();

    println!();
    println!("{}", "Wallet Information:".bold().cyan());
    println!();
    println!("  Address:        {}", address.bright_yellow());
    println!("  Pubkey Hash:    {}", pubkey_hash.to_hex().bright_black());
    println!("  Mined Blocks:   {}", mined.len().to_string().bright_cyan());
    println!("  Introductions:  {}", introduced.len().to_string().bright_cyan());
    println!(
        "  Can Introduce:  {}",
        if can_introduce {
            "yes".green()
        } else {
            "no (mine more blocks)".red()
        }
    );
    println!();

    if owned.is_empty() {
        println!("{}", "No items owned.".bright_black());
    } else {
        println!("{}", "Owned Items:".bold());
        println!();
        for item in &owned {
            println!("  {}", item.to_hex().bright_yellow());
        }
    }
    println!();

    Ok(())
}
