//! Shared fakes for exercising the pipeline without a ledger or database

use async_trait::async_trait;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::ledger::{AccountLookup, ConfirmationStatus, LedgerClient, TokenHolding};
use crate::trade::{Trade, TradeRepository};

/// A system-program account holding `lamports`
pub fn system_account(lamports: u64) -> Account {
    Account {
        lamports,
        data: Vec::new(),
        owner: solana_sdk::system_program::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// An initialized token account
pub fn token_account() -> Account {
    Account {
        lamports: 2_039_280,
        data: vec![0u8; 165],
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// In-memory ledger with scriptable behavior
pub struct FakeLedger {
    accounts: HashMap<Pubkey, Account>,
    holdings: Vec<TokenHolding>,
    blockhash: Hash,
    send_error: Option<String>,
    statuses: Mutex<VecDeque<ConfirmationStatus>>,
    sent: Arc<Mutex<usize>>,
    fail_lookups: bool,
    fail_holdings: bool,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            accounts: HashMap::new(),
            holdings: Vec::new(),
            blockhash: Hash::new_unique(),
            send_error: None,
            statuses: Mutex::new(VecDeque::new()),
            sent: Arc::new(Mutex::new(0)),
            fail_lookups: false,
            fail_holdings: false,
        }
    }

    pub fn with_account(mut self, address: Pubkey, account: Account) -> Self {
        self.accounts.insert(address, account);
        self
    }

    pub fn with_holding(mut self, holding: TokenHolding) -> Self {
        self.holdings.push(holding);
        self
    }

    pub fn with_send_error(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    /// Queue of statuses returned by successive polls; empty means pending
    pub fn with_statuses(self, statuses: Vec<ConfirmationStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn failing_holdings(mut self) -> Self {
        self.fail_holdings = true;
        self
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    /// Shared counter of transactions handed to `send_transaction`
    pub fn sent_transactions(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn get_account(&self, address: &Pubkey) -> Result<AccountLookup> {
        if self.fail_lookups {
            return Err(Error::Rpc("simulated lookup timeout".to_string()));
        }
        Ok(match self.accounts.get(address) {
            Some(account) => AccountLookup::Found(account.clone()),
            None => AccountLookup::NotFound,
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.blockhash)
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        if self.fail_lookups {
            return Err(Error::Rpc("simulated lookup timeout".to_string()));
        }
        Ok(self
            .accounts
            .get(address)
            .map(|account| account.lamports)
            .unwrap_or(0))
    }

    async fn token_accounts_by_owner(&self, _owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        if self.fail_holdings {
            return Err(Error::Rpc("simulated holdings failure".to_string()));
        }
        Ok(self.holdings.clone())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String> {
        *self.sent.lock().unwrap() += 1;
        match &self.send_error {
            Some(message) => Err(Error::Rpc(message.clone())),
            None => Ok(transaction.signatures[0].to_string()),
        }
    }

    async fn transaction_status(&self, _signature: &str) -> Result<ConfirmationStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ConfirmationStatus::Pending))
    }
}

/// In-memory trade repository
pub struct MemoryTradeRepository {
    trades: Mutex<Vec<Trade>>,
    fail_writes: bool,
}

impl MemoryTradeRepository {
    pub fn new() -> Self {
        Self {
            trades: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Snapshot of everything stored
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeRepository for MemoryTradeRepository {
    async fn create(&self, trade: &Trade) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Storage("simulated write failure".to_string()));
        }
        self.trades.lock().unwrap().push(trade.clone());
        Ok(())
    }

    async fn update(&self, trade: &Trade) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Storage("simulated write failure".to_string()));
        }
        let mut trades = self.trades.lock().unwrap();
        match trades.iter_mut().find(|existing| existing.id == trade.id) {
            Some(existing) => {
                *existing = trade.clone();
                Ok(())
            }
            None => Err(Error::Storage(format!("unknown trade id {}", trade.id))),
        }
    }

    async fn get_by_unsigned_transaction(&self, unsigned: &str) -> Result<Option<Trade>> {
        Ok(self
            .trades
            .lock()
            .unwrap()
            .iter()
            .find(|trade| trade.unsigned_transaction == unsigned)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Trade>> {
        let mut all = self.trades();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}
