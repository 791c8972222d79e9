//! Mint metadata resolution
//!
//! Reads token decimals from the mint account. Decimals decide how a human
//! amount maps to raw units, so a missing or malformed mint is a hard
//! error; there is deliberately no defaulting fallback here.

use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::state::Mint;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::ledger::client::{AccountLookup, LedgerClient};

// Cache for mint decimals to avoid repeated RPC calls
// Key: mint pubkey as string, Value: decimals
lazy_static::lazy_static! {
    static ref DECIMALS_CACHE: RwLock<HashMap<String, u8>> = RwLock::new(HashMap::new());
}

/// Get decimals for a mint, with caching
pub async fn decimals_of(ledger: &dyn LedgerClient, mint: &Pubkey) -> Result<u8> {
    let mint_str = mint.to_string();

    {
        let cache = DECIMALS_CACHE
            .read()
            .map_err(|e| Error::MintDecode(format!("cache lock poisoned: {}", e)))?;

        if let Some(&decimals) = cache.get(&mint_str) {
            return Ok(decimals);
        }
    }

    let decimals = fetch_decimals(ledger, mint).await?;

    {
        let mut cache = DECIMALS_CACHE
            .write()
            .map_err(|e| Error::MintDecode(format!("cache lock poisoned: {}", e)))?;

        cache.insert(mint_str, decimals);
    }

    Ok(decimals)
}

/// Fetch decimals directly from the ledger without caching
pub async fn fetch_decimals(ledger: &dyn LedgerClient, mint: &Pubkey) -> Result<u8> {
    let account = match ledger.get_account(mint).await? {
        AccountLookup::Found(account) => account,
        AccountLookup::NotFound => return Err(Error::MintNotFound(mint.to_string())),
    };

    if account.owner != spl_token::id() {
        return Err(Error::MintDecode(format!(
            "{} is not owned by the token program",
            mint
        )));
    }

    let state = Mint::unpack(&account.data)
        .map_err(|e| Error::MintDecode(format!("{}: {}", mint, e)))?;

    Ok(state.decimals)
}

/// Pre-populate the cache with known decimals (for tests or known mints)
pub fn set_cached_decimals(mint: &Pubkey, decimals: u8) {
    if let Ok(mut cache) = DECIMALS_CACHE.write() {
        cache.insert(mint.to_string(), decimals);
    }
}
