//! Ledger RPC client abstraction

use async_trait::async_trait;
use solana_account_decoder::UiAccountData;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::TokenAccountsFilter;
use solana_sdk::account::Account;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::TransactionConfirmationStatus;
use std::str::FromStr;
use std::time::Duration;

use crate::config::{Config, TransferConfig};
use crate::error::{Error, Result};

/// Outcome of an account lookup
///
/// "Not found" is a normal condition here, not an error: downstream it
/// usually means an account still has to be provisioned. Transport
/// failures travel in the `Err` arm of the surrounding `Result` and must
/// never be collapsed into `NotFound`.
#[derive(Debug, Clone)]
pub enum AccountLookup {
    Found(Account),
    NotFound,
}

/// One SPL token holding of an owner
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHolding {
    /// Mint address
    pub mint: String,
    /// Human-readable amount (decimals applied)
    pub amount: f64,
    /// Mint decimals as reported by the ledger
    pub decimals: u8,
}

/// Confirmation state of a submitted transaction
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationStatus {
    /// Not yet visible, or visible but not irreversible
    Pending,
    /// Irreversibly included
    Confirmed,
    /// Included but execution failed
    Failed(String),
}

/// Chain access used by the transfer pipeline and the balance read path
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Look up an account by address
    async fn get_account(&self, address: &Pubkey) -> Result<AccountLookup>;

    /// Fetch the latest blockhash for transaction assembly
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Native balance of an address in lamports
    async fn balance(&self, address: &Pubkey) -> Result<u64>;

    /// All SPL token accounts owned by an address
    async fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>>;

    /// Submit a signed transaction, returning its signature
    async fn send_transaction(&self, transaction: &Transaction) -> Result<String>;

    /// Confirmation status of a previously submitted transaction
    async fn transaction_status(&self, signature: &str) -> Result<ConfirmationStatus>;
}

/// Production client backed by a Solana JSON-RPC node
pub struct RpcLedgerClient {
    rpc: RpcClient,
    commitment: CommitmentConfig,
    send_config: RpcSendTransactionConfig,
}

impl RpcLedgerClient {
    /// Build a client from configuration
    pub fn new(config: &Config) -> Self {
        let commitment = config.commitment();
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(
                config.rpc.endpoint.clone(),
                Duration::from_millis(config.rpc.timeout_ms),
                commitment,
            ),
            commitment,
            send_config: send_config(&config.transfer, commitment),
        }
    }
}

fn send_config(transfer: &TransferConfig, commitment: CommitmentConfig) -> RpcSendTransactionConfig {
    RpcSendTransactionConfig {
        skip_preflight: transfer.skip_preflight,
        preflight_commitment: Some(commitment.commitment),
        max_retries: Some(transfer.max_retries),
        ..Default::default()
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_account(&self, address: &Pubkey) -> Result<AccountLookup> {
        // get_account_with_commitment reports a missing account as
        // Ok(None), so existence never has to be guessed from error text
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| Error::Rpc(format!("account lookup for {}: {}", address, e)))?;

        Ok(match response.value {
            Some(account) => AccountLookup::Found(account),
            None => AccountLookup::NotFound,
        })
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::Rpc(format!("blockhash fetch: {}", e)))
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        self.rpc
            .get_balance(address)
            .await
            .map_err(|e| Error::Rpc(format!("balance fetch for {}: {}", address, e)))
    }

    async fn token_accounts_by_owner(&self, owner: &Pubkey) -> Result<Vec<TokenHolding>> {
        let accounts = self
            .rpc
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
            .await
            .map_err(|e| Error::Rpc(format!("token accounts for {}: {}", owner, e)))?;

        accounts
            .into_iter()
            .map(|keyed| parse_token_holding(&keyed.account.data))
            .collect()
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<String> {
        self.rpc
            .send_transaction_with_config(transaction, self.send_config)
            .await
            .map(|signature| signature.to_string())
            .map_err(|e| Error::Rpc(e.to_string()))
    }

    async fn transaction_status(&self, signature: &str) -> Result<ConfirmationStatus> {
        let signature = Signature::from_str(signature)
            .map_err(|e| Error::InvalidTransaction(format!("signature {}: {}", signature, e)))?;

        let response = self
            .rpc
            .get_signature_statuses(&[signature])
            .await
            .map_err(|e| Error::Rpc(format!("status fetch for {}: {}", signature, e)))?;

        let status = match response.value.into_iter().next().flatten() {
            Some(status) => status,
            None => return Ok(ConfirmationStatus::Pending),
        };

        if let Some(err) = &status.err {
            return Ok(ConfirmationStatus::Failed(err.to_string()));
        }

        match status.confirmation_status {
            Some(TransactionConfirmationStatus::Finalized) => Ok(ConfirmationStatus::Confirmed),
            _ => Ok(ConfirmationStatus::Pending),
        }
    }
}

/// Decode one jsonParsed token account into a holding
fn parse_token_holding(data: &UiAccountData) -> Result<TokenHolding> {
    let parsed = match data {
        UiAccountData::Json(parsed) => &parsed.parsed,
        _ => {
            return Err(Error::Rpc(
                "token account response not in jsonParsed encoding".to_string(),
            ))
        }
    };

    let info = &parsed["info"];
    let mint = info["mint"]
        .as_str()
        .ok_or_else(|| Error::Rpc("token account missing mint".to_string()))?
        .to_string();

    let token_amount = &info["tokenAmount"];
    let decimals = token_amount["decimals"]
        .as_u64()
        .ok_or_else(|| Error::Rpc(format!("token account {} missing decimals", mint)))?
        as u8;

    // uiAmount is null for amounts that overflow f64; fall back to the
    // string form the node always includes
    let amount = match token_amount["uiAmount"].as_f64() {
        Some(amount) => amount,
        None => token_amount["uiAmountString"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| Error::Rpc(format!("token account {} missing amount", mint)))?,
    };

    Ok(TokenHolding {
        mint,
        amount,
        decimals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_account_decoder::parse_account_data::ParsedAccount;

    fn json_account(value: serde_json::Value) -> UiAccountData {
        UiAccountData::Json(ParsedAccount {
            program: "spl-token".to_string(),
            parsed: value,
            space: 165,
        })
    }

    #[test]
    fn test_parse_token_holding() {
        let data = json_account(serde_json::json!({
            "type": "account",
            "info": {
                "mint": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
                "owner": "7UX2i7SucgLMQcfZ75s3VXmZZY4YRUyJN9X1RgfMoDUi",
                "tokenAmount": {
                    "amount": "10500000",
                    "decimals": 6,
                    "uiAmount": 10.5,
                    "uiAmountString": "10.5"
                }
            }
        }));

        let holding = parse_token_holding(&data).unwrap();
        assert_eq!(holding.mint, "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU");
        assert_eq!(holding.amount, 10.5);
        assert_eq!(holding.decimals, 6);
    }

    #[test]
    fn test_parse_token_holding_falls_back_to_string_amount() {
        let data = json_account(serde_json::json!({
            "type": "account",
            "info": {
                "mint": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
                "tokenAmount": {
                    "amount": "1",
                    "decimals": 0,
                    "uiAmount": null,
                    "uiAmountString": "1"
                }
            }
        }));

        assert_eq!(parse_token_holding(&data).unwrap().amount, 1.0);
    }

    #[test]
    fn test_parse_token_holding_rejects_malformed_entries() {
        let data = json_account(serde_json::json!({ "info": {} }));
        let err = parse_token_holding(&data).unwrap_err();
        assert!(err.is_transient());
    }
}
