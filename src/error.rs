//! Error types for the wallet backend

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the wallet backend
#[derive(Error, Debug)]
pub enum Error {
    // Input validation errors - rejected before any state is created
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Invalid transaction payload: {0}")]
    InvalidTransaction(String),

    // Asset metadata errors - a wrong decimal count moves the wrong amount,
    // so these are never defaulted away
    #[error("Mint account not found: {0}")]
    MintNotFound(String),

    #[error("Mint account decode failed: {0}")]
    MintDecode(String),

    // RPC errors - transient transport failures, never a "must create" signal
    #[error("RPC error: {0}")]
    Rpc(String),

    // Trade lifecycle errors
    #[error("No trade matches the supplied unsigned transaction")]
    TradeNotFound,

    #[error("Transaction rejected by the ledger: {0}")]
    SubmissionRejected(String),

    #[error("Trade storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Check if this error is an input validation failure
    ///
    /// Input failures are rejected before any Trade exists or any network
    /// call is made, so callers may safely retry with corrected input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidAddress(_)
                | Error::InvalidAmount(_)
                | Error::UnknownAsset(_)
                | Error::InvalidTransaction(_)
        )
    }

    /// Check if this error is a transient transport failure
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Rpc(_))
    }
}

// Conversion from solana_client errors
impl From<solana_client::client_error::ClientError> for Error {
    fn from(e: solana_client::client_error::ClientError) -> Self {
        Error::Rpc(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
