//! Vesting release: the `Staked -> Released` transition.

use anchor_lang::prelude::*;

use crate::clock::VestingClock;
use crate::gate;
use crate::ledger::{BalanceLedger, TokenAccountState};
use crate::proxy;
use crate::state::StakeAccount;
use crate::{treasury_address, ErrorCode};

/// Runs every release check in order and returns the amount to unlock.
/// Stake state is only read, so any rejection leaves it untouched.
pub fn check_release(
    stake: &StakeAccount,
    treasury_key: &Pubkey,
    treasury: &TokenAccountState,
    destination: &TokenAccountState,
    now: i64,
    signers: &[Pubkey],
) -> Result<u64> {
    gate::authorize(Some(&stake.owner), signers)?;
    let amount = stake.releasable_amount(now)?;

    require_keys_eq!(*treasury_key, stake.treasury, ErrorCode::InvalidTreasury);
    require_keys_eq!(destination.owner, stake.owner, ErrorCode::InvalidDestination);
    require_keys_eq!(destination.mint, treasury.mint, ErrorCode::MintMismatch);
    Ok(amount)
}

pub fn release_tokens<L: BalanceLedger, C: VestingClock>(
    ledger: &mut L,
    clock: &C,
    stake: &mut StakeAccount,
    treasury: &Pubkey,
    destination: &Pubkey,
    signers: &[Pubkey],
) -> Result<u64> {
    let now = clock.now()?;
    let treasury_state = ledger.token_account(treasury)?;
    let destination_state = ledger.token_account(destination)?;
    let amount = check_release(stake, treasury, &treasury_state, &destination_state, now, signers)?;

    // The treasury owns itself; the program signs for it like invoke_signed.
    let (custody, _) = treasury_address(&treasury_state.mint);
    proxy::transfer(ledger, amount, treasury, destination, &[custody])?;
    stake.mark_released();

    msg!("Released {} tokens to {}", amount, destination);
    Ok(amount)
}
