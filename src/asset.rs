//! Asset directory
//!
//! Maps externally supplied asset identifiers (mint addresses, or the
//! empty string for SOL) to the bookkeeping identity recorded on trades.
//! Decimals reported here are display-level metadata; the transfer
//! pipeline always takes decimals from the mint account itself.

use async_trait::async_trait;

use crate::config::AssetEntry;
use crate::error::{Error, Result};

/// Identifier of the native coin when callers spell it out
pub const NATIVE_SYMBOL: &str = "SOL";

/// Internal reference id of the native coin
pub const NATIVE_ASSET_ID: &str = "solana";

/// Resolved asset identity
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInfo {
    /// Internal reference id
    pub asset_id: String,
    /// Display symbol
    pub symbol: String,
    /// Display decimals
    pub decimals: u8,
}

/// Directory of assets the backend is willing to book trades for
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    /// Resolve an identifier; empty means the native coin
    async fn get_by_identifier(&self, identifier: &str) -> Result<AssetInfo>;
}

/// Directory backed by the static config asset list
pub struct StaticAssetDirectory {
    entries: Vec<AssetEntry>,
}

impl StaticAssetDirectory {
    pub fn new(entries: Vec<AssetEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl AssetDirectory for StaticAssetDirectory {
    async fn get_by_identifier(&self, identifier: &str) -> Result<AssetInfo> {
        if is_native(identifier) {
            return Ok(AssetInfo {
                asset_id: NATIVE_ASSET_ID.to_string(),
                symbol: NATIVE_SYMBOL.to_string(),
                decimals: 9,
            });
        }

        self.entries
            .iter()
            .find(|entry| entry.mint == identifier)
            .map(|entry| AssetInfo {
                asset_id: entry.asset_id.clone(),
                symbol: entry.symbol.clone(),
                decimals: entry.decimals,
            })
            .ok_or_else(|| Error::UnknownAsset(identifier.to_string()))
    }
}

/// Check whether an identifier refers to the native coin
pub fn is_native(identifier: &str) -> bool {
    identifier.is_empty() || identifier == NATIVE_SYMBOL
}
