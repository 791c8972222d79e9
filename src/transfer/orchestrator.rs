//! Transfer preparation
//!
//! Top of the pipeline: validates a transfer request, resolves everything
//! the transaction needs, persists the trade record and hands the unsigned
//! transaction back for external signing.

use solana_sdk::instruction::Instruction;
use std::sync::Arc;
use tracing::{info, warn};

use crate::address::parse_address;
use crate::asset::{is_native, AssetDirectory, NATIVE_SYMBOL};
use crate::error::{Error, Result};
use crate::ledger::{decimals_of, LedgerClient};
use crate::trade::{Trade, TradeRepository};
use crate::transfer::assembler::{
    native_transfer_instruction, to_raw_units, token_transfer_instruction, TransactionAssembler,
};
use crate::transfer::resolver;

/// A request to move value between two addresses
///
/// Ephemeral: validated once, never persisted as-is.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from_address: String,
    pub to_address: String,
    /// Mint address, or empty for the native coin
    pub token: String,
    /// Amount in human-readable units
    pub amount: f64,
}

/// Prepares transfers and creates their trade records
pub struct TransferOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    repository: Arc<dyn TradeRepository>,
    assets: Arc<dyn AssetDirectory>,
    assembler: TransactionAssembler,
}

impl TransferOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        repository: Arc<dyn TradeRepository>,
        assets: Arc<dyn AssetDirectory>,
    ) -> Self {
        let assembler = TransactionAssembler::new(Arc::clone(&ledger));
        Self {
            ledger,
            repository,
            assets,
            assembler,
        }
    }

    /// Prepare an unsigned transfer transaction
    ///
    /// Returns the base64 transaction the caller signs externally. The
    /// trade record exists, in `pending`, before this returns; a signed
    /// counterpart can therefore always be correlated.
    pub async fn prepare_transfer(&self, request: &TransferRequest) -> Result<String> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(Error::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                request.amount
            )));
        }

        // Format-only address validation is sufficient for transfers;
        // token accounts are legitimate recipients
        let from = parse_address(&request.from_address)?;
        let to = parse_address(&request.to_address)?;

        let token = request.token.trim();

        // Asset identity is bookkeeping; failure here is fatal and leaves
        // no trade behind
        let asset = self.assets.get_by_identifier(token).await?;

        let instructions = if is_native(token) {
            vec![native_transfer_instruction(&from, &to, request.amount)?]
        } else {
            self.token_instructions(token, &from, &to, request.amount)
                .await?
        };

        let unsigned = self.assembler.build(&from, &instructions).await?;
        let fee = self.assembler.network_fee();

        let token_label = if is_native(token) { NATIVE_SYMBOL } else { token };
        let trade = Trade::new_transfer(
            token_label,
            &asset.asset_id,
            &asset.symbol,
            request.amount,
            fee,
            unsigned.base64.clone(),
        );

        // The unsigned transaction is already usable; bookkeeping failure
        // must not withhold it from the caller
        if let Err(e) = self.repository.create(&trade).await {
            warn!(
                "Failed to persist trade {} for {} {}: {}",
                trade.id, request.amount, trade.symbol, e
            );
        } else {
            info!(
                "Prepared transfer {}: {} {} from {} to {}",
                trade.id, request.amount, trade.symbol, from, to
            );
        }

        Ok(unsigned.base64)
    }

    /// Instructions for an SPL token transfer: recipient account creation
    /// when needed, then one checked transfer
    async fn token_instructions(
        &self,
        token: &str,
        from: &solana_sdk::pubkey::Pubkey,
        to: &solana_sdk::pubkey::Pubkey,
        amount: f64,
    ) -> Result<Vec<Instruction>> {
        let mint = parse_address(token)?;

        let decimals = decimals_of(self.ledger.as_ref(), &mint).await?;
        let raw_amount = to_raw_units(amount, decimals)?;

        // The sender's account must already hold the asset being sent
        let source = resolver::derive_token_account(from, &mint);
        // The recipient's may not exist yet; the sender pays for creation
        let plan = resolver::resolve(self.ledger.as_ref(), to, &mint, from).await?;

        let mut instructions = plan.instructions;
        instructions.push(token_transfer_instruction(
            &source,
            &mint,
            &plan.account,
            from,
            raw_amount,
            decimals,
        )?);

        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::StaticAssetDirectory;
    use crate::config::AssetEntry;
    use crate::ledger::mint::set_cached_decimals;
    use crate::testing::{token_account, FakeLedger, MemoryTradeRepository};
    use crate::trade::TradeStatus;
    use crate::transfer::assembler::{decode_transaction, FEE_PER_SIGNATURE_LAMPORTS};
    use solana_sdk::native_token::LAMPORTS_PER_SOL;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signer};

    fn orchestrator(
        ledger: FakeLedger,
        entries: Vec<AssetEntry>,
    ) -> (TransferOrchestrator, Arc<MemoryTradeRepository>) {
        let repository = Arc::new(MemoryTradeRepository::new());
        let orchestrator = TransferOrchestrator::new(
            Arc::new(ledger),
            Arc::clone(&repository) as Arc<dyn TradeRepository>,
            Arc::new(StaticAssetDirectory::new(entries)),
        );
        (orchestrator, repository)
    }

    fn usdc_entry(mint: &Pubkey) -> AssetEntry {
        AssetEntry {
            mint: mint.to_string(),
            asset_id: "usd-coin".to_string(),
            symbol: "USDC".to_string(),
            decimals: 6,
        }
    }

    fn native_request(amount: f64) -> TransferRequest {
        TransferRequest {
            from_address: Keypair::new().pubkey().to_string(),
            to_address: Keypair::new().pubkey().to_string(),
            token: String::new(),
            amount,
        }
    }

    #[tokio::test]
    async fn test_native_transfer_creates_pending_trade() {
        let (orchestrator, repository) = orchestrator(FakeLedger::new(), Vec::new());

        let unsigned = orchestrator
            .prepare_transfer(&native_request(1.5))
            .await
            .unwrap();
        assert!(!unsigned.is_empty());

        let trades = repository.trades();
        assert_eq!(trades.len(), 1);
        let trade = &trades[0];
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.amount, 1.5);
        assert_eq!(trade.symbol, "SOL");
        assert_eq!(
            trade.fee,
            FEE_PER_SIGNATURE_LAMPORTS as f64 / LAMPORTS_PER_SOL as f64
        );
        assert_eq!(trade.unsigned_transaction, unsigned);

        let transaction = decode_transaction(&unsigned).unwrap();
        assert_eq!(transaction.message.instructions.len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_are_rejected_without_a_trade() {
        let (orchestrator, repository) = orchestrator(FakeLedger::new(), Vec::new());

        for amount in [0.0, -1.5, f64::NAN] {
            let err = orchestrator
                .prepare_transfer(&native_request(amount))
                .await
                .unwrap_err();
            assert!(err.is_invalid_input());
        }
        assert!(repository.trades().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_address_is_rejected_without_a_trade() {
        let (orchestrator, repository) = orchestrator(FakeLedger::new(), Vec::new());

        let mut request = native_request(1.0);
        request.to_address = "definitely-not-base58-0".to_string();

        let err = orchestrator.prepare_transfer(&request).await.unwrap_err();
        assert!(err.is_invalid_input());
        assert!(repository.trades().is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_asset_is_fatal_without_a_trade() {
        let mint = Keypair::new().pubkey();
        let (orchestrator, repository) = orchestrator(FakeLedger::new(), Vec::new());

        let mut request = native_request(2.0);
        request.token = mint.to_string();

        let err = orchestrator.prepare_transfer(&request).await.unwrap_err();
        assert!(matches!(err, Error::UnknownAsset(_)));
        assert!(repository.trades().is_empty());
    }

    #[tokio::test]
    async fn test_token_transfer_to_missing_account_prepends_creation() {
        let mint = Keypair::new().pubkey();
        set_cached_decimals(&mint, 6);

        let (orchestrator, repository) =
            orchestrator(FakeLedger::new(), vec![usdc_entry(&mint)]);

        let mut request = native_request(10.0);
        request.token = mint.to_string();

        let unsigned = orchestrator.prepare_transfer(&request).await.unwrap();
        let transaction = decode_transaction(&unsigned).unwrap();
        // Creation instruction plus the checked transfer
        assert_eq!(transaction.message.instructions.len(), 2);

        let trade = &repository.trades()[0];
        assert_eq!(trade.symbol, "USDC");
        assert_eq!(trade.from_asset_id, "usd-coin");
        assert_eq!(trade.from_token, mint.to_string());
    }

    #[tokio::test]
    async fn test_token_transfer_to_existing_account_is_single_instruction() {
        let mint = Keypair::new().pubkey();
        set_cached_decimals(&mint, 6);

        let recipient = Keypair::new();
        let ata = resolver::derive_token_account(&recipient.pubkey(), &mint);
        let ledger = FakeLedger::new().with_account(ata, token_account());

        let (orchestrator, _repository) = orchestrator(ledger, vec![usdc_entry(&mint)]);

        let mut request = native_request(10.0);
        request.to_address = recipient.pubkey().to_string();
        request.token = mint.to_string();

        let unsigned = orchestrator.prepare_transfer(&request).await.unwrap();
        let transaction = decode_transaction(&unsigned).unwrap();
        assert_eq!(transaction.message.instructions.len(), 1);
    }

    #[tokio::test]
    async fn test_bookkeeping_failure_still_returns_the_transaction() {
        let repository = Arc::new(MemoryTradeRepository::new().failing_writes());
        let orchestrator = TransferOrchestrator::new(
            Arc::new(FakeLedger::new()),
            Arc::clone(&repository) as Arc<dyn TradeRepository>,
            Arc::new(StaticAssetDirectory::new(Vec::new())),
        );

        let unsigned = orchestrator
            .prepare_transfer(&native_request(0.5))
            .await
            .unwrap();
        assert!(!unsigned.is_empty());
        assert!(repository.trades().is_empty());
    }
}
