//! Off-chain request execution.
//!
//! Mirrors the Solana execution model: requests are applied one at a time,
//! each against a scratch copy of the account store, and the copy replaces
//! the live store only when the whole request succeeded.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use crate::clock::VestingClock;
use crate::ledger::BalanceLedger;
use crate::state::{StakeAccount, StakeStatus};
use crate::{proxy, release, staking, AuthorityType, ErrorCode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    MintTo {
        amount: u64,
        mint: Pubkey,
        destination: Pubkey,
    },
    Transfer {
        amount: u64,
        from: Pubkey,
        to: Pubkey,
    },
    Burn {
        amount: u64,
        mint: Pubkey,
        from: Pubkey,
    },
    SetAuthority {
        kind: AuthorityType,
        new_authority: Option<Pubkey>,
        target: Pubkey,
    },
    CreateStakingAccount {
        stake_account: Pubkey,
        owner: Pubkey,
        vesting_period: Option<u64>,
    },
    StakeTokens {
        amount: u64,
        from: Pubkey,
        treasury: Pubkey,
        stake_account: Pubkey,
    },
    ReleaseTokens {
        stake_account: Pubkey,
        treasury: Pubkey,
        destination: Pubkey,
    },
}

#[derive(Clone, Debug)]
struct AccountStore<L> {
    ledger: L,
    stakes: BTreeMap<Pubkey, StakeAccount>,
}

/// Request executor over an in-memory account store.
///
/// Every request clones the whole store, so each call costs time linear in
/// the number of accounts. Meant for simulation and tests, not bulk replay.
pub struct Runtime<L, C> {
    store: AccountStore<L>,
    clock: C,
}

impl<L, C> Runtime<L, C>
where
    L: BalanceLedger + Clone,
    C: VestingClock,
{
    pub fn new(ledger: L, clock: C) -> Self {
        Self {
            store: AccountStore {
                ledger,
                stakes: BTreeMap::new(),
            },
            clock,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.store.ledger
    }

    /// Direct access for account setup, which is outside the request surface.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.store.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn stake_account(&self, key: &Pubkey) -> Result<&StakeAccount> {
        Ok(self.store.stakes.get(key).ok_or(ErrorCode::AccountNotFound)?)
    }

    pub fn stake_status(&self, key: &Pubkey) -> Result<StakeStatus> {
        self.stake_account(key)?.status(self.clock.now()?)
    }

    /// Executes `request` as one atomic unit. On error nothing is written.
    pub fn process(&mut self, request: Request, signers: &[Pubkey]) -> Result<()> {
        let mut draft = self.store.clone();
        match execute(&mut draft, &self.clock, &request, signers) {
            Ok(()) => {
                self.store = draft;
                Ok(())
            }
            Err(err) => {
                msg!("Request rejected: {}", err);
                Err(err)
            }
        }
    }
}

fn execute<L: BalanceLedger, C: VestingClock>(
    store: &mut AccountStore<L>,
    clock: &C,
    request: &Request,
    signers: &[Pubkey],
) -> Result<()> {
    match *request {
        Request::MintTo {
            amount,
            mint,
            destination,
        } => proxy::mint_to(&mut store.ledger, amount, &mint, &destination, signers),
        Request::Transfer { amount, from, to } => {
            proxy::transfer(&mut store.ledger, amount, &from, &to, signers)
        }
        Request::Burn { amount, mint, from } => {
            proxy::burn(&mut store.ledger, amount, &mint, &from, signers)
        }
        Request::SetAuthority {
            kind,
            new_authority,
            target,
        } => proxy::set_authority(&mut store.ledger, kind, new_authority, &target, signers),
        Request::CreateStakingAccount {
            stake_account,
            owner,
            vesting_period,
        } => {
            require!(
                !store.stakes.contains_key(&stake_account),
                ErrorCode::AlreadyInitialized
            );
            let mut stake = StakeAccount::default();
            staking::create_staking_account(&mut stake, owner, vesting_period, signers)?;
            store.stakes.insert(stake_account, stake);
            Ok(())
        }
        Request::StakeTokens {
            amount,
            from,
            treasury,
            stake_account,
        } => {
            let stake = store
                .stakes
                .get_mut(&stake_account)
                .ok_or(ErrorCode::AccountNotFound)?;
            staking::stake_tokens(
                &mut store.ledger,
                clock,
                stake,
                &from,
                &treasury,
                amount,
                signers,
            )
        }
        Request::ReleaseTokens {
            stake_account,
            treasury,
            destination,
        } => {
            let stake = store
                .stakes
                .get_mut(&stake_account)
                .ok_or(ErrorCode::AccountNotFound)?;
            release::release_tokens(&mut store.ledger, clock, stake, &treasury, &destination, signers)
                .map(|_| ())
        }
    }
}
