//! Transfer submission and confirmation tracking
//!
//! Accepts the externally signed counterpart of a prepared transfer,
//! submits it, and drives the trade record through
//! `submitted -> {finalized, failed}`. A transaction with no matching
//! trade is refused outright: an untracked submission could never be
//! reconciled later.

use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::ledger::{ConfirmationStatus, LedgerClient};
use crate::trade::{Trade, TradeRepository};
use crate::transfer::assembler::decode_transaction;

/// Submits signed transfers and records the outcome
pub struct SubmissionGateway {
    ledger: Arc<dyn LedgerClient>,
    repository: Arc<dyn TradeRepository>,
}

impl SubmissionGateway {
    pub fn new(ledger: Arc<dyn LedgerClient>, repository: Arc<dyn TradeRepository>) -> Self {
        Self { ledger, repository }
    }

    /// Submit a signed transaction, returning its on-chain signature
    ///
    /// `unsigned` is the exact base64 string returned by prepare; it is the
    /// join key locating the trade and is compared verbatim.
    pub async fn submit_transfer(&self, unsigned: &str, signed: &str) -> Result<String> {
        let transaction = decode_transaction(signed)?;

        if transaction.signatures.is_empty()
            || transaction
                .signatures
                .iter()
                .all(|signature| *signature == Signature::default())
        {
            return Err(Error::InvalidTransaction(
                "transaction carries no signatures".to_string(),
            ));
        }

        // Locate the trade before touching the network
        let mut trade = self
            .repository
            .get_by_unsigned_transaction(unsigned)
            .await?
            .ok_or(Error::TradeNotFound)?;

        match self.ledger.send_transaction(&transaction).await {
            Ok(hash) => {
                trade.mark_submitted(hash.clone());
                self.record(&trade).await;
                info!("Submitted trade {}: {}", trade.id, hash);
                Ok(hash)
            }
            Err(e) => {
                // Mirror the ledger's rejection text on the trade
                let message = match e {
                    Error::Rpc(message) => message,
                    other => other.to_string(),
                };
                trade.mark_failed(message.clone());
                self.record(&trade).await;
                warn!("Submission of trade {} rejected: {}", trade.id, message);
                Err(Error::SubmissionRejected(message))
            }
        }
    }

    /// Best-effort bookkeeping; the submission already happened
    async fn record(&self, trade: &Trade) {
        if let Err(e) = self.repository.update(trade).await {
            warn!("Failed to record trade {} transition: {}", trade.id, e);
        }
    }
}

/// Best-effort confirmation poller
///
/// Polls at a fixed interval until the ledger reports an irreversible
/// outcome, the deadline elapses, or the observer is cancelled. On
/// deadline or cancellation the trade is left in `submitted` - a valid
/// resting state, not a failure.
pub struct ConfirmationObserver {
    ledger: Arc<dyn LedgerClient>,
    repository: Arc<dyn TradeRepository>,
    poll_interval: Duration,
    timeout: Duration,
    shutdown: Notify,
}

impl ConfirmationObserver {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        repository: Arc<dyn TradeRepository>,
        config: &TransferConfig,
    ) -> Self {
        Self {
            ledger,
            repository,
            poll_interval: Duration::from_secs(config.confirm_poll_secs),
            timeout: Duration::from_secs(config.confirm_timeout_secs),
            shutdown: Notify::new(),
        }
    }

    /// Stop an in-flight `watch` call; safe to call repeatedly
    pub fn cancel(&self) {
        self.shutdown.notify_waiters();
    }

    /// Watch a submitted trade until it reaches a terminal state or the
    /// deadline elapses, returning the trade as last recorded
    pub async fn watch(&self, mut trade: Trade) -> Result<Trade> {
        let hash = trade.transaction_hash.clone().ok_or_else(|| {
            Error::InvalidTransaction(format!("trade {} has no transaction hash", trade.id))
        })?;

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!(
                        "Confirmation window elapsed for trade {}; leaving it submitted",
                        trade.id
                    );
                    return Ok(trade);
                }
                _ = self.shutdown.notified() => {
                    debug!("Confirmation watch for trade {} cancelled", trade.id);
                    return Ok(trade);
                }
                _ = ticker.tick() => {
                    match self.ledger.transaction_status(&hash).await {
                        Ok(ConfirmationStatus::Confirmed) => {
                            trade.mark_finalized();
                            self.record(&trade).await;
                            info!("Trade {} finalized: {}", trade.id, hash);
                            return Ok(trade);
                        }
                        Ok(ConfirmationStatus::Failed(err)) => {
                            trade.mark_failed(err.clone());
                            self.record(&trade).await;
                            warn!("Trade {} failed after submission: {}", trade.id, err);
                            return Ok(trade);
                        }
                        Ok(ConfirmationStatus::Pending) => {}
                        // Transient; the next tick retries the status read
                        Err(e) => warn!("Status poll for trade {} failed: {}", trade.id, e),
                    }
                }
            }
        }
    }

    /// Best-effort bookkeeping; the chain outcome is already decided
    async fn record(&self, trade: &Trade) {
        if let Err(e) = self.repository.update(trade).await {
            warn!("Failed to record trade {} transition: {}", trade.id, e);
        }
    }
}
