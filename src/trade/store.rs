//! JSON file trade store
//!
//! File-backed implementation of [`TradeRepository`]: an in-memory map
//! flushed to pretty-printed JSON on every write. Suitable for a single
//! backend process; heavier deployments swap in their own repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::trade::{Trade, TradeRepository};

/// File-backed trade store
pub struct JsonTradeStore {
    trades: RwLock<HashMap<String, Trade>>,
    path: PathBuf,
}

impl JsonTradeStore {
    /// Open a store, loading any previously persisted trades
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let trades = if path.exists() {
            let data = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Storage(e.to_string()))?;

            let trades: HashMap<String, Trade> =
                serde_json::from_str(&data).map_err(|e| Error::Storage(e.to_string()))?;

            info!("Loaded {} trades from {}", trades.len(), path.display());
            trades
        } else {
            HashMap::new()
        };

        Ok(Self {
            trades: RwLock::new(trades),
            path,
        })
    }

    /// Flush the current map to disk
    async fn save(&self) -> Result<()> {
        let trades = self.trades.read().await;
        let data =
            serde_json::to_string_pretty(&*trades).map_err(|e| Error::Storage(e.to_string()))?;

        tokio::fs::write(&self.path, data)
            .await
            .map_err(|e| Error::Storage(e.to_string()))?;

        debug!("Saved {} trades to {}", trades.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl TradeRepository for JsonTradeStore {
    async fn create(&self, trade: &Trade) -> Result<()> {
        let mut trades = self.trades.write().await;
        if trades.contains_key(&trade.id) {
            return Err(Error::Storage(format!("duplicate trade id {}", trade.id)));
        }
        trades.insert(trade.id.clone(), trade.clone());
        drop(trades);

        self.save().await
    }

    async fn update(&self, trade: &Trade) -> Result<()> {
        let mut trades = self.trades.write().await;
        if !trades.contains_key(&trade.id) {
            return Err(Error::Storage(format!("unknown trade id {}", trade.id)));
        }
        trades.insert(trade.id.clone(), trade.clone());
        drop(trades);

        self.save().await
    }

    async fn get_by_unsigned_transaction(&self, unsigned: &str) -> Result<Option<Trade>> {
        let trades = self.trades.read().await;
        Ok(trades
            .values()
            .find(|trade| trade.unsigned_transaction == unsigned)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Trade>> {
        let trades = self.trades.read().await;
        let mut all: Vec<Trade> = trades.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}
