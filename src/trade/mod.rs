//! Trade records and persistence
//!
//! A Trade is the persisted unit of work for one accepted transfer. It is
//! created exactly once, in `pending`, before the unsigned transaction is
//! handed back to the caller; the unsigned transaction string is the join
//! key that later correlates the signed counterpart.

pub mod repository;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use repository::TradeRepository;
pub use store::JsonTradeStore;

/// Lifecycle state of a trade
///
/// `pending -> submitted -> {finalized, failed}`. `submitted` is a valid
/// resting state: an unconfirmed transaction is not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Pending,
    Submitted,
    Finalized,
    Failed,
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeStatus::Pending => write!(f, "pending"),
            TradeStatus::Submitted => write!(f, "submitted"),
            TradeStatus::Finalized => write!(f, "finalized"),
            TradeStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Kind of trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Transfer,
}

/// Persisted record of one transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier, generated at creation
    pub id: String,

    /// Asset identifier on the sending side (mint address, or "SOL")
    pub from_token: String,

    /// Asset identifier on the receiving side; equals `from_token` for transfers
    pub to_token: String,

    /// Internal asset reference, resolved once so display never re-resolves
    pub from_asset_id: String,

    /// Internal asset reference on the receiving side
    pub to_asset_id: String,

    /// Denormalized display symbol
    pub symbol: String,

    #[serde(rename = "type")]
    pub trade_type: TradeType,

    /// Human-readable amount
    pub amount: f64,

    /// Network fee in SOL
    pub fee: f64,

    pub status: TradeStatus,

    /// Base64 of the serialized unsigned transaction; unique per trade and
    /// byte-stable across prepare and submit
    pub unsigned_transaction: String,

    /// Signature returned by the ledger, set on submission
    pub transaction_hash: Option<String>,

    /// Last error recorded against this trade
    pub error: Option<String>,

    /// Set when the ledger reports irreversible inclusion
    pub completed_at: Option<DateTime<Utc>>,

    /// Redundant with `status` for fast filtering
    pub finalized: bool,

    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Create a pending transfer trade
    pub fn new_transfer(
        token: &str,
        asset_id: &str,
        symbol: &str,
        amount: f64,
        fee: f64,
        unsigned_transaction: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from_token: token.to_string(),
            to_token: token.to_string(),
            from_asset_id: asset_id.to_string(),
            to_asset_id: asset_id.to_string(),
            symbol: symbol.to_string(),
            trade_type: TradeType::Transfer,
            amount,
            fee,
            status: TradeStatus::Pending,
            unsigned_transaction,
            transaction_hash: None,
            error: None,
            completed_at: None,
            finalized: false,
            created_at: Utc::now(),
        }
    }

    /// Record a successful submission
    pub fn mark_submitted(&mut self, transaction_hash: String) {
        self.status = TradeStatus::Submitted;
        self.transaction_hash = Some(transaction_hash);
        self.error = None;
    }

    /// Record a ledger rejection or post-submission execution failure
    pub fn mark_failed(&mut self, error: String) {
        self.status = TradeStatus::Failed;
        self.error = Some(error);
        self.finalized = false;
    }

    /// Record irreversible inclusion
    pub fn mark_finalized(&mut self) {
        self.status = TradeStatus::Finalized;
        self.finalized = true;
        self.completed_at = Some(Utc::now());
    }

    /// Check whether the trade can still change state
    pub fn is_open(&self) -> bool {
        matches!(self.status, TradeStatus::Pending | TradeStatus::Submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade() -> Trade {
        Trade::new_transfer("SOL", "solana", "SOL", 1.5, 0.000005, "dW5zaWduZWQ=".to_string())
    }

    #[test]
    fn test_new_transfer_starts_pending() {
        let trade = trade();
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.from_token, trade.to_token);
        assert!(!trade.finalized);
        assert!(trade.transaction_hash.is_none());
        assert!(trade.completed_at.is_none());
        assert!(trade.is_open());
    }

    #[test]
    fn test_submission_clears_error() {
        let mut trade = trade();
        trade.mark_failed("preflight failure".to_string());
        trade.mark_submitted("5sig".to_string());

        assert_eq!(trade.status, TradeStatus::Submitted);
        assert_eq!(trade.transaction_hash.as_deref(), Some("5sig"));
        assert!(trade.error.is_none());
    }

    #[test]
    fn test_failure_keeps_completed_at_empty() {
        let mut trade = trade();
        trade.mark_submitted("5sig".to_string());
        trade.mark_failed("insufficient funds".to_string());

        assert_eq!(trade.status, TradeStatus::Failed);
        assert_eq!(trade.error.as_deref(), Some("insufficient funds"));
        assert!(!trade.finalized);
        assert!(trade.completed_at.is_none());
        assert!(!trade.is_open());
    }

    #[test]
    fn test_finalization_stamps_completion() {
        let mut trade = trade();
        trade.mark_submitted("5sig".to_string());
        trade.mark_finalized();

        assert_eq!(trade.status, TradeStatus::Finalized);
        assert!(trade.finalized);
        assert!(trade.completed_at.is_some());
    }

    #[test]
    fn test_status_serialization_is_snake_case() {
        let json = serde_json::to_string(&TradeStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");
    }
}
