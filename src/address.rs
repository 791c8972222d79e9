//! Address parsing and validation
//!
//! Externally supplied account identifiers are rejected here, before any
//! network call is made on their behalf.

use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

/// Parse a base58 account identifier into a `Pubkey`
///
/// Format-only validation: the string must decode to exactly 32 bytes.
/// Sufficient for transfer endpoints, where program-derived addresses
/// (token accounts) are legitimate recipients.
pub fn parse_address(input: &str) -> Result<Pubkey> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAddress("empty address".to_string()));
    }

    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| Error::InvalidAddress(format!("{}: {}", trimmed, e)))?;

    let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        Error::InvalidAddress(format!("{}: expected 32 bytes, got {}", trimmed, v.len()))
    })?;

    Ok(Pubkey::new_from_array(bytes))
}

/// Parse a wallet address, additionally requiring ed25519 curve membership
///
/// Balance queries walk the owner's token accounts, so the address must be
/// a real keypair-backed wallet, not a program-derived account.
pub fn parse_wallet_address(input: &str) -> Result<Pubkey> {
    let pubkey = parse_address(input)?;

    if !pubkey.is_on_curve() {
        return Err(Error::InvalidAddress(format!(
            "{}: not on the ed25519 curve",
            input.trim()
        )));
    }

    Ok(pubkey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::{Keypair, Signer};
    use spl_associated_token_account::get_associated_token_address;

    #[test]
    fn test_parse_valid_address() {
        let pubkey = Keypair::new().pubkey();
        let parsed = parse_address(&pubkey.to_string()).unwrap();
        assert_eq!(parsed, pubkey);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let pubkey = Keypair::new().pubkey();
        let parsed = parse_address(&format!("  {}\n", pubkey)).unwrap();
        assert_eq!(parsed, pubkey);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_address("").is_err());
        assert!(parse_address("not-base58-0OIl").is_err());
        // Valid base58 but wrong length
        assert!(parse_address("abc").is_err());
    }

    #[test]
    fn test_wallet_address_requires_curve_membership() {
        // Keypair-backed addresses are always on the curve
        let wallet = Keypair::new().pubkey();
        assert!(parse_wallet_address(&wallet.to_string()).is_ok());

        // Associated token accounts are program-derived, guaranteed off-curve
        let ata = get_associated_token_address(&wallet, &Keypair::new().pubkey());
        let err = parse_wallet_address(&ata.to_string()).unwrap_err();
        assert!(err.is_invalid_input());

        // Format-only parsing still accepts it
        assert!(parse_address(&ata.to_string()).is_ok());
    }
}
