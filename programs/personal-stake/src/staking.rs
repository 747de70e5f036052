//! Stake account creation and deposits.

use anchor_lang::prelude::*;

use crate::clock::VestingClock;
use crate::gate;
use crate::ledger::{BalanceLedger, TokenAccountState};
use crate::proxy;
use crate::state::StakeAccount;
use crate::{treasury_address, ErrorCode};

pub fn create_staking_account(
    stake: &mut StakeAccount,
    owner: Pubkey,
    vesting_period: Option<u64>,
    signers: &[Pubkey],
) -> Result<()> {
    gate::authorize(Some(&owner), signers)?;
    stake.initialize(owner, vesting_period)?;

    msg!(
        "Created staking account for {} with {}s vesting",
        owner,
        stake.vesting_period
    );
    Ok(())
}

/// Signer must own both the stake and the funding account, and the
/// treasury must be the program custody account for the funding mint.
pub fn check_stake(
    stake: &StakeAccount,
    from: &TokenAccountState,
    treasury: &Pubkey,
    amount: u64,
    signers: &[Pubkey],
) -> Result<()> {
    gate::authorize(Some(&stake.owner), signers)?;
    require_keys_eq!(from.owner, stake.owner, ErrorCode::Unauthorized);
    stake.check_deposit(amount, treasury)?;

    let (expected, _) = treasury_address(&from.mint);
    require_keys_eq!(*treasury, expected, ErrorCode::InvalidTreasury);
    Ok(())
}

pub fn stake_tokens<L: BalanceLedger, C: VestingClock>(
    ledger: &mut L,
    clock: &C,
    stake: &mut StakeAccount,
    from: &Pubkey,
    treasury: &Pubkey,
    amount: u64,
    signers: &[Pubkey],
) -> Result<()> {
    let from_state = ledger.token_account(from)?;
    check_stake(stake, &from_state, treasury, amount, signers)?;

    proxy::transfer(ledger, amount, from, treasury, signers)?;
    stake.record_deposit(amount, *from, *treasury, clock.now()?)?;

    msg!(
        "Staked {} tokens into {} (total: {})",
        amount,
        treasury,
        stake.staked_amount
    );
    Ok(())
}
