//! Ledger access layer
//!
//! Everything the backend knows about chain state flows through the
//! [`LedgerClient`] trait, so the pipeline can be exercised against fakes.
//! The found/not-found/transport three-way split is decided once here, at
//! the RPC boundary, and never re-inferred from error text downstream.

pub mod client;
pub mod mint;

pub use client::{
    AccountLookup, ConfirmationStatus, LedgerClient, RpcLedgerClient, TokenHolding,
};
pub use mint::decimals_of;
