//! Trade repository interface
//!
//! The backend consumes persistence through this narrow seam; only the
//! orchestrator creates trades and only the submission side updates them.

use async_trait::async_trait;

use crate::error::Result;
use crate::trade::Trade;

/// Persistence seam for trade records
#[async_trait]
pub trait TradeRepository: Send + Sync {
    /// Persist a newly created trade
    async fn create(&self, trade: &Trade) -> Result<()>;

    /// Persist a state transition of an existing trade
    async fn update(&self, trade: &Trade) -> Result<()>;

    /// Locate a trade by its unsigned-transaction join key
    async fn get_by_unsigned_transaction(&self, unsigned: &str) -> Result<Option<Trade>>;

    /// All trades, most recent first
    async fn list(&self) -> Result<Vec<Trade>>;
}
