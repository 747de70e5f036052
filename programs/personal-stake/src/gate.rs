use anchor_lang::prelude::*;

use crate::ErrorCode;

/// Succeeds iff `expected` is set and appears in `signers`. An unset
/// authority (e.g. a mint with a fixed supply) can never be satisfied.
pub fn authorize(expected: Option<&Pubkey>, signers: &[Pubkey]) -> Result<()> {
    match expected {
        Some(authority) if signers.contains(authority) => Ok(()),
        _ => err!(ErrorCode::Unauthorized),
    }
}
