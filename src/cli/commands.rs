//! CLI command implementations

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::asset::{AssetDirectory, StaticAssetDirectory};
use crate::balance::BalanceAggregator;
use crate::config::Config;
use crate::ledger::{LedgerClient, RpcLedgerClient};
use crate::trade::{JsonTradeStore, TradeRepository};
use crate::transfer::{
    ConfirmationObserver, SubmissionGateway, TransferOrchestrator, TransferRequest,
};

/// Shared wiring for the commands that touch both ledger and store
struct Backend {
    ledger: Arc<dyn LedgerClient>,
    repository: Arc<dyn TradeRepository>,
    assets: Arc<dyn AssetDirectory>,
}

impl Backend {
    async fn connect(config: &Config) -> Result<Self> {
        info!("Using RPC endpoint {}", config.rpc.endpoint);

        let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(config));
        let repository: Arc<dyn TradeRepository> = Arc::new(
            JsonTradeStore::open(&config.storage.trades_path)
                .await
                .context("Failed to open trade store")?,
        );
        let assets: Arc<dyn AssetDirectory> =
            Arc::new(StaticAssetDirectory::new(config.assets.clone()));

        Ok(Self {
            ledger,
            repository,
            assets,
        })
    }
}

/// Prepare an unsigned transfer and print its base64 encoding
pub async fn prepare(
    config: &Config,
    from: String,
    to: String,
    token: String,
    amount: f64,
) -> Result<()> {
    let backend = Backend::connect(config).await?;
    let orchestrator = TransferOrchestrator::new(
        backend.ledger,
        backend.repository,
        backend.assets,
    );

    let unsigned = orchestrator
        .prepare_transfer(&TransferRequest {
            from_address: from,
            to_address: to,
            token,
            amount,
        })
        .await?;

    println!("{}", unsigned);
    Ok(())
}

/// Submit a signed transfer and optionally watch it to finality
pub async fn submit(config: &Config, unsigned: String, signed: String, watch: bool) -> Result<()> {
    let backend = Backend::connect(config).await?;
    let gateway = SubmissionGateway::new(
        Arc::clone(&backend.ledger),
        Arc::clone(&backend.repository),
    );

    let hash = gateway.submit_transfer(&unsigned, &signed).await?;
    println!("{}", hash);

    if watch {
        let trade = backend
            .repository
            .get_by_unsigned_transaction(&unsigned)
            .await?
            .context("Submitted trade not found in store")?;

        let observer = ConfirmationObserver::new(
            backend.ledger,
            backend.repository,
            &config.transfer,
        );
        let watched = observer.watch(trade).await?;
        println!("status: {}", watched.status);
    }

    Ok(())
}

/// Print all positive balances of an address
pub async fn balances(config: &Config, address: String) -> Result<()> {
    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedgerClient::new(config));
    let aggregator = BalanceAggregator::new(ledger);

    let balances = aggregator.get_balances(&address).await?;
    if balances.is_empty() {
        println!("no balances");
        return Ok(());
    }

    for balance in balances {
        println!("{:<44} {}", balance.token, balance.amount);
    }
    Ok(())
}

/// List recorded trades, most recent first
pub async fn trades(config: &Config, limit: usize) -> Result<()> {
    let store = JsonTradeStore::open(&config.storage.trades_path)
        .await
        .context("Failed to open trade store")?;

    let trades = store.list().await?;
    if trades.is_empty() {
        println!("no trades recorded");
        return Ok(());
    }

    for trade in trades.into_iter().take(limit) {
        println!(
            "{} {} {:>12} {} {} {}",
            trade.created_at.format("%Y-%m-%d %H:%M:%S"),
            trade.id,
            trade.amount,
            trade.symbol,
            trade.status,
            trade.transaction_hash.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
