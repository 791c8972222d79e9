//! Balance aggregation
//!
//! Read-only path: native balance plus all positive token holdings of an
//! address, assembled fresh on every query. Partial data beats no data
//! for a balance display, so a failed holdings fetch degrades to
//! native-only instead of failing the call.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::address::parse_wallet_address;
use crate::asset::NATIVE_SYMBOL;
use crate::error::Result;
use crate::ledger::{AccountLookup, LedgerClient};
use crate::transfer::assembler::to_ui_amount;

/// One displayable holding of an address
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Balance {
    /// Mint address, or "SOL" for the native coin
    pub token: String,
    /// Human-readable amount
    pub amount: f64,
}

/// Aggregates the balances of a wallet address
pub struct BalanceAggregator {
    ledger: Arc<dyn LedgerClient>,
}

impl BalanceAggregator {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// All positive balances of an address, native first then holdings
    /// ordered by mint
    pub async fn get_balances(&self, address: &str) -> Result<Vec<Balance>> {
        // Balance queries walk a wallet's token accounts, so the address
        // must be curve-backed, not program-derived
        let owner = parse_wallet_address(address)?;

        // An address the chain has never seen has nothing to display
        if let AccountLookup::NotFound = self.ledger.get_account(&owner).await? {
            debug!("Address {} has no on-chain account", owner);
            return Ok(Vec::new());
        }

        let lamports = self.ledger.balance(&owner).await?;

        let mut balances = Vec::new();

        let native = to_ui_amount(lamports, 9);
        if native > 0.0 {
            balances.push(Balance {
                token: NATIVE_SYMBOL.to_string(),
                amount: native,
            });
        }

        match self.ledger.token_accounts_by_owner(&owner).await {
            Ok(mut holdings) => {
                holdings.sort_by(|a, b| a.mint.cmp(&b.mint));
                for holding in holdings {
                    if holding.amount > 0.0 {
                        balances.push(Balance {
                            token: holding.mint,
                            amount: holding.amount,
                        });
                    }
                }
            }
            Err(e) => {
                warn!(
                    "Token holdings fetch for {} failed: {} (returning native balance only)",
                    owner, e
                );
            }
        }

        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{system_account, FakeLedger};
    use crate::ledger::TokenHolding;
    use solana_sdk::signature::{Keypair, Signer};

    fn holding(mint: &str, amount: f64) -> TokenHolding {
        TokenHolding {
            mint: mint.to_string(),
            amount,
            decimals: 6,
        }
    }

    #[tokio::test]
    async fn test_unused_address_yields_empty_set() {
        let owner = Keypair::new().pubkey();
        let aggregator = BalanceAggregator::new(Arc::new(FakeLedger::new()));

        let balances = aggregator.get_balances(&owner.to_string()).await.unwrap();
        assert!(balances.is_empty());
    }

    #[tokio::test]
    async fn test_zero_native_balance_is_omitted() {
        let owner = Keypair::new().pubkey();
        let ledger = FakeLedger::new()
            .with_account(owner, system_account(0))
            .with_holding(holding("MintA", 10.5));
        let aggregator = BalanceAggregator::new(Arc::new(ledger));

        let balances = aggregator.get_balances(&owner.to_string()).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].token, "MintA");
        assert_eq!(balances[0].amount, 10.5);
    }

    #[tokio::test]
    async fn test_native_comes_first_then_holdings_by_mint() {
        let owner = Keypair::new().pubkey();
        let ledger = FakeLedger::new()
            .with_account(owner, system_account(2_500_000_000))
            .with_holding(holding("MintB", 3.0))
            .with_holding(holding("MintA", 1.0));
        let aggregator = BalanceAggregator::new(Arc::new(ledger));

        let balances = aggregator.get_balances(&owner.to_string()).await.unwrap();
        let tokens: Vec<&str> = balances.iter().map(|b| b.token.as_str()).collect();
        assert_eq!(tokens, vec![NATIVE_SYMBOL, "MintA", "MintB"]);
        assert_eq!(balances[0].amount, 2.5);
    }

    #[tokio::test]
    async fn test_zero_and_negative_holdings_are_filtered() {
        let owner = Keypair::new().pubkey();
        let ledger = FakeLedger::new()
            .with_account(owner, system_account(1_000_000_000))
            .with_holding(holding("Dust", 0.0));
        let aggregator = BalanceAggregator::new(Arc::new(ledger));

        let balances = aggregator.get_balances(&owner.to_string()).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].token, NATIVE_SYMBOL);
    }

    #[tokio::test]
    async fn test_holdings_failure_degrades_to_native_only() {
        let owner = Keypair::new().pubkey();
        let ledger = FakeLedger::new()
            .with_account(owner, system_account(1_000_000_000))
            .failing_holdings();
        let aggregator = BalanceAggregator::new(Arc::new(ledger));

        let balances = aggregator.get_balances(&owner.to_string()).await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].token, NATIVE_SYMBOL);
        assert_eq!(balances[0].amount, 1.0);
    }

    #[tokio::test]
    async fn test_program_derived_address_is_rejected() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let ata = spl_associated_token_account::get_associated_token_address(&owner, &mint);
        let aggregator = BalanceAggregator::new(Arc::new(FakeLedger::new()));

        let err = aggregator.get_balances(&ata.to_string()).await.unwrap_err();
        assert!(err.is_invalid_input());
    }
}
