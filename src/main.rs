//! walletd - wallet backend CLI
//!
//! Prepares unsigned Solana transfers, submits externally signed ones,
//! and reads back balances and recorded trades. Signing never happens
//! here; transactions are signed by the caller's own tooling.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use walletd::cli::commands;
use walletd::config::Config;

/// Wallet backend for preparing, submitting and tracking transfers
#[derive(Parser)]
#[command(name = "walletd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare an unsigned transfer transaction
    Prepare {
        /// Sender address
        from: String,

        /// Recipient address
        to: String,

        /// Amount in human-readable units
        amount: f64,

        /// Mint address of the asset to transfer; omit for SOL
        #[arg(long, default_value = "")]
        token: String,
    },

    /// Submit an externally signed transfer
    Submit {
        /// Base64 unsigned transaction returned by prepare
        unsigned: String,

        /// Base64 signed transaction
        signed: String,

        /// Poll the ledger for finality after submitting
        #[arg(long)]
        watch: bool,
    },

    /// Show all positive balances of an address
    Balances {
        /// Wallet address
        address: String,
    },

    /// List recorded trades
    Trades {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("walletd=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Prepare {
            from,
            to,
            amount,
            token,
        } => commands::prepare(&config, from, to, token, amount).await,
        Commands::Submit {
            unsigned,
            signed,
            watch,
        } => commands::submit(&config, unsigned, signed, watch).await,
        Commands::Balances { address } => commands::balances(&config, address).await,
        Commands::Trades { limit } => commands::trades(&config, limit).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
