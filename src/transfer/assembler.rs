//! Unsigned transaction assembly
//!
//! Attaches the latest blockhash and fee payer to an ordered instruction
//! list and serializes the result. The base64 string produced here is the
//! join key that later correlates the signed counterpart, so encoding must
//! stay byte-stable between prepare and submit.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ledger::LedgerClient;

/// Flat fee charged per signature, in lamports
///
/// The network fee recorded on a trade is approximated from this constant
/// rather than derived from the assembled transaction.
pub const FEE_PER_SIGNATURE_LAMPORTS: u64 = 5_000;

/// An assembled, not yet signed transaction
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub transaction: Transaction,
    /// bincode + base64 (STANDARD) encoding of `transaction`
    pub base64: String,
}

/// Builds unsigned transactions against current chain state
pub struct TransactionAssembler {
    ledger: Arc<dyn LedgerClient>,
}

impl TransactionAssembler {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Assemble an unsigned transaction from an ordered instruction list
    pub async fn build(
        &self,
        payer: &Pubkey,
        instructions: &[Instruction],
    ) -> Result<UnsignedTransaction> {
        let blockhash = self.ledger.latest_blockhash().await?;

        let message = Message::new_with_blockhash(instructions, Some(payer), &blockhash);
        let transaction = Transaction::new_unsigned(message);
        let base64 = encode_transaction(&transaction)?;

        debug!(
            "Assembled unsigned transaction: {} instructions, payer {}",
            instructions.len(),
            payer
        );

        Ok(UnsignedTransaction {
            transaction,
            base64,
        })
    }

    /// The flat network fee in SOL recorded on each trade
    pub fn network_fee(&self) -> f64 {
        to_ui_amount(FEE_PER_SIGNATURE_LAMPORTS, 9)
    }
}

/// Build a native SOL transfer instruction
pub fn native_transfer_instruction(
    from: &Pubkey,
    to: &Pubkey,
    amount_sol: f64,
) -> Result<Instruction> {
    let lamports = to_raw_units(amount_sol, 9)?;
    Ok(system_instruction::transfer(from, to, lamports))
}

/// Build a checked SPL token transfer instruction
///
/// `transfer_checked` carries the decimals value explicitly, so a decimals
/// mismatch between client and resolver fails on-chain instead of moving
/// the wrong amount.
pub fn token_transfer_instruction(
    source: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    raw_amount: u64,
    decimals: u8,
) -> Result<Instruction> {
    spl_token::instruction::transfer_checked(
        &spl_token::id(),
        source,
        mint,
        destination,
        owner,
        &[],
        raw_amount,
        decimals,
    )
    .map_err(|e| Error::InvalidTransaction(format!("transfer instruction: {}", e)))
}

/// Encode a transaction for transport and storage
pub fn encode_transaction(transaction: &Transaction) -> Result<String> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| Error::InvalidTransaction(format!("serialize: {}", e)))?;
    Ok(BASE64.encode(bytes))
}

/// Decode a transaction from its transport encoding
pub fn decode_transaction(encoded: &str) -> Result<Transaction> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::InvalidTransaction(format!("base64: {}", e)))?;
    bincode::deserialize(&bytes).map_err(|e| Error::InvalidTransaction(format!("decode: {}", e)))
}

/// Convert a human amount into raw base units, `round(amount * 10^decimals)`
///
/// Rounds to the nearest base unit; plain truncation would systematically
/// under-transfer dust amounts.
pub fn to_raw_units(amount: f64, decimals: u8) -> Result<u64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }

    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    if scaled > u64::MAX as f64 {
        return Err(Error::InvalidAmount(format!(
            "{} exceeds the raw unit range at {} decimals",
            amount, decimals
        )));
    }

    Ok(scaled as u64)
}

/// Convert raw base units back into a human amount
pub fn to_ui_amount(raw: u64, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}
