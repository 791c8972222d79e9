//! Token account resolution
//!
//! The associated token account for an (owner, mint) pair is a pure
//! function of the two addresses. Whether it must still be created is a
//! chain-state question: a missing account and an allocated-but-unowned
//! slot both need a creation instruction, while a transport failure is a
//! hard error and never a "must create" signal.

use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account;
use tracing::debug;

use crate::error::Result;
use crate::ledger::{AccountLookup, LedgerClient};

/// What it takes to make a token account usable
#[derive(Debug, Clone)]
pub struct AccountProvisioningPlan {
    /// The derived associated token account
    pub account: Pubkey,
    /// Creation instructions; empty when the account already exists
    pub instructions: Vec<Instruction>,
}

impl AccountProvisioningPlan {
    /// Check whether the account still has to be created
    pub fn needs_creation(&self) -> bool {
        !self.instructions.is_empty()
    }
}

/// Derive the associated token account for an owner and mint
///
/// Deterministic, no network access.
pub fn derive_token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// Resolve the token account for `(owner, mint)` and decide provisioning
///
/// The creation instruction, when needed, is payable by `fee_payer`.
pub async fn resolve(
    ledger: &dyn LedgerClient,
    owner: &Pubkey,
    mint: &Pubkey,
    fee_payer: &Pubkey,
) -> Result<AccountProvisioningPlan> {
    let account = derive_token_account(owner, mint);

    let needs_creation = match ledger.get_account(&account).await? {
        AccountLookup::NotFound => true,
        // An account still owned by the system program is an empty slot
        // the token program has never initialized
        AccountLookup::Found(existing) => existing.owner == solana_sdk::system_program::id(),
    };

    let instructions = if needs_creation {
        debug!("Token account {} for owner {} needs creation", account, owner);
        vec![create_associated_token_account(
            fee_payer,
            owner,
            mint,
            &spl_token::id(),
        )]
    } else {
        Vec::new()
    };

    Ok(AccountProvisioningPlan {
        account,
        instructions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::FakeLedger;
    use solana_sdk::account::Account;
    use solana_sdk::signature::{Keypair, Signer};

    fn token_account() -> Account {
        Account {
            lamports: 2_039_280,
            data: vec![0u8; 165],
            owner: spl_token::id(),
            executable: false,
            rent_epoch: 0,
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();

        assert_eq!(
            derive_token_account(&owner, &mint),
            derive_token_account(&owner, &mint)
        );
    }

    #[tokio::test]
    async fn test_missing_account_plans_exactly_one_creation() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let payer = Keypair::new().pubkey();
        let ledger = FakeLedger::new();

        let plan = resolve(&ledger, &owner, &mint, &payer).await.unwrap();
        assert!(plan.needs_creation());
        assert_eq!(plan.instructions.len(), 1);
        assert_eq!(plan.account, derive_token_account(&owner, &mint));
    }

    #[tokio::test]
    async fn test_existing_account_plans_nothing() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let payer = Keypair::new().pubkey();
        let ata = derive_token_account(&owner, &mint);
        let ledger = FakeLedger::new().with_account(ata, token_account());

        let plan = resolve(&ledger, &owner, &mint, &payer).await.unwrap();
        assert!(!plan.needs_creation());
        assert!(plan.instructions.is_empty());
    }

    #[tokio::test]
    async fn test_system_owned_slot_still_needs_creation() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let payer = Keypair::new().pubkey();
        let ata = derive_token_account(&owner, &mint);
        let empty_slot = Account {
            lamports: 1,
            data: Vec::new(),
            owner: solana_sdk::system_program::id(),
            executable: false,
            rent_epoch: 0,
        };
        let ledger = FakeLedger::new().with_account(ata, empty_slot);

        let plan = resolve(&ledger, &owner, &mint, &payer).await.unwrap();
        assert!(plan.needs_creation());
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_a_create_signal() {
        let owner = Keypair::new().pubkey();
        let mint = Keypair::new().pubkey();
        let payer = Keypair::new().pubkey();
        let ledger = FakeLedger::new().failing_lookups();

        let err = resolve(&ledger, &owner, &mint, &payer).await.unwrap_err();
        assert!(matches!(err, Error::Rpc(_)));
    }
}
