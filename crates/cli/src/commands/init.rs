//! Initialize chain command.

use super::{load_config, save_config, save_wallet};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use itemchain_chain::Blockchain;
use itemchain_consensus::DifficultyPolicy;
use itemchain_core::Wallet;
use itemchain_storage::Storage;
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to store blockchain data
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// Require a fixed number of leading zero hex digits instead of the
    /// height-based ramp
    #[arg(long)]
    difficulty: Option<u64>,

    /// Also generate a wallet with this name
    #[arg(short, long)]
    wallet: Option<String>,
}

pub fn run(args: InitArgs) -> Result<()> {
    println!("{}", "Initializing itemchain...".bold().cyan());
    println!();

    fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", args.data_dir))?;

    // Flags override a saved config.
    let mut config = load_config(&args.data_dir)?;
    if let Some(difficulty) = args.difficulty {
        config.difficulty = DifficultyPolicy::Fixed { difficulty };
    }

    let storage = Storage::open(&args.data_dir).with_context(|| "Failed to open storage")?;
    println!("{}  Opened data directory", "✓".green().bold());

    let blockchain =
        Blockchain::init(&storage, config.clone()).with_context(|| "Failed to initialize genesis block")?;
    let tip = blockchain.last_block()?;
    storage.flush()?;

    println!();
    println!("{}  Chain ready", "✓".green().bold());
    println!("    Tip:    {}", tip.hash().to_hex().bright_yellow());
    println!("    Height: {}", tip.height().to_string().bright_cyan());

    if let Some(height) = config
        .difficulty
        .first_unreachable_height(config.max_pow_iterations)
    {
        println!();
        println!(
            "{}  Blocks from height {} need more than {} nonce tries on average; mining will likely give up there.",
            "!".yellow().bold(),
            height.to_string().bright_cyan(),
            config.max_pow_iterations
        );
        println!(
            "    Re-run with {} for a fixed target.",
            "--difficulty <N>".bright_cyan()
        );
    }

    let config_file = save_config(&args.data_dir, &config)?;
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    if let Some(name) = args.wallet {
        let wallet = Wallet::generate();
        let key_file = save_wallet(&args.data_dir, &name, &wallet)?;
        println!(
            "{}  Saved wallet {} to: {}",
            "✓".green().bold(),
            wallet.address().bright_yellow(),
            key_file.display().to_string().bright_black()
        );
    }

    println!();
    println!("{}", "Chain initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  • Use {} to create wallets",
        "itemchain wallet new".bright_cyan()
    );
    println!(
        "  • Use {} to register an item",
        "itemchain item introduce".bright_cyan()
    );
    println!(
        "  • Use {} to explore blocks",
        "itemchain block list".bright_cyan()
    );

    Ok(())
}
