//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::commitment_config::CommitmentConfig;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Known SPL assets served by the asset directory
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Commitment level for reads and preflight: processed, confirmed, finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    /// Skip the preflight simulation when submitting
    #[serde(default)]
    pub skip_preflight: bool,

    /// RPC-side resubmission cap for sendTransaction. This bounds the RPC
    /// node's own rebroadcasts; the backend itself never resubmits.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Seconds between confirmation polls
    #[serde(default = "default_confirm_poll_secs")]
    pub confirm_poll_secs: u64,

    /// Hard ceiling on confirmation polling. When it elapses the trade is
    /// left in `submitted`, which is a valid resting state.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            max_retries: default_max_retries(),
            confirm_poll_secs: default_confirm_poll_secs(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the JSON trade store
    #[serde(default = "default_trades_path")]
    pub trades_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            trades_path: default_trades_path(),
        }
    }
}

/// One known asset in the directory
#[derive(Debug, Clone, Deserialize)]
pub struct AssetEntry {
    /// Mint address
    pub mint: String,
    /// Internal reference id used for bookkeeping
    pub asset_id: String,
    /// Display symbol
    pub symbol: String,
    /// Display decimals; transfers always read decimals from the mint
    pub decimals: u8,
}

fn default_rpc_endpoint() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_max_retries() -> usize {
    3
}

fn default_confirm_poll_secs() -> u64 {
    2
}

fn default_confirm_timeout_secs() -> u64 {
    300
}

fn default_trades_path() -> String {
    "trades.json".to_string()
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("rpc.endpoint", default_rpc_endpoint())?
            .set_default("rpc.timeout_ms", default_timeout_ms() as i64)?
            .set_default("rpc.commitment", default_commitment())?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix WALLETD_)
            .add_source(
                config::Environment::with_prefix("WALLETD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.rpc.endpoint.is_empty() {
            anyhow::bail!("rpc.endpoint must not be empty");
        }

        if !matches!(
            self.rpc.commitment.as_str(),
            "processed" | "confirmed" | "finalized"
        ) {
            anyhow::bail!(
                "rpc.commitment must be processed, confirmed or finalized, got {}",
                self.rpc.commitment
            );
        }

        if self.transfer.confirm_poll_secs == 0 {
            anyhow::bail!("transfer.confirm_poll_secs must be positive");
        }

        if self.transfer.confirm_timeout_secs < self.transfer.confirm_poll_secs {
            anyhow::bail!(
                "transfer.confirm_timeout_secs ({}) must not be below the poll interval ({})",
                self.transfer.confirm_timeout_secs,
                self.transfer.confirm_poll_secs
            );
        }

        for asset in &self.assets {
            if asset.mint.is_empty() || asset.symbol.is_empty() {
                anyhow::bail!("asset entries require a mint and a symbol");
            }
        }

        Ok(())
    }

    /// Commitment level as a solana-sdk config
    pub fn commitment(&self) -> CommitmentConfig {
        match self.rpc.commitment.as_str() {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        }
    }
}
