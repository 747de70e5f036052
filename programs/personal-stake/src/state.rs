//! Stake account layout and the vesting state machine.
//!
//! Both the on-chain handlers and the off-chain [`Runtime`](crate::runtime::Runtime)
//! drive stakes exclusively through the methods here, so the transitions
//! `Empty -> Staked -> Released` are enforced in one place.

use anchor_lang::prelude::*;

use crate::{ErrorCode, DEFAULT_VESTING_PERIOD, MAX_VESTING_PERIOD};

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum StakeState {
    Empty,
    Staked,
    Released,
}

#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct StakeAccount {
    pub owner: Pubkey,                // 32
    pub source: Pubkey,               // 32 - token account of the first deposit
    pub treasury: Pubkey,             // 32 - custody account bound at first deposit
    pub staked_amount: u64,           // 8
    pub stake_timestamp: Option<i64>, // 1 + 8 - set once, at first deposit
    pub vesting_period: u64,          // 8 - seconds
    pub released: bool,               // 1
}

impl StakeAccount {
    pub const SPACE: usize = 32 + 32 + 32 + 8 + (1 + 8) + 8 + 1;

    /// Fills an empty slot. `None` selects [`DEFAULT_VESTING_PERIOD`].
    pub fn initialize(&mut self, owner: Pubkey, vesting_period: Option<u64>) -> Result<()> {
        require!(
            self.owner == Pubkey::default() && self.stake_timestamp.is_none() && !self.released,
            ErrorCode::AlreadyInitialized
        );
        require!(owner != Pubkey::default(), ErrorCode::Unauthorized);

        let vesting_period = vesting_period.unwrap_or(DEFAULT_VESTING_PERIOD);
        require!(
            vesting_period > 0 && vesting_period <= MAX_VESTING_PERIOD,
            ErrorCode::InvalidVestingPeriod
        );

        self.owner = owner;
        self.staked_amount = 0;
        self.stake_timestamp = None;
        self.vesting_period = vesting_period;
        self.released = false;
        Ok(())
    }

    pub fn state(&self) -> StakeState {
        if self.released {
            StakeState::Released
        } else if self.stake_timestamp.is_some() && self.staked_amount > 0 {
            StakeState::Staked
        } else {
            StakeState::Empty
        }
    }

    pub fn unlock_at(&self) -> Result<Option<i64>> {
        let Some(staked_at) = self.stake_timestamp else {
            return Ok(None);
        };
        let period = i64::try_from(self.vesting_period).map_err(|_| ErrorCode::Overflow)?;
        let unlock_at = staked_at.checked_add(period).ok_or(ErrorCode::Overflow)?;
        Ok(Some(unlock_at))
    }

    /// Validates a deposit without applying it.
    pub fn check_deposit(&self, amount: u64, treasury: &Pubkey) -> Result<()> {
        require!(!self.released, ErrorCode::AlreadyReleased);
        require!(amount > 0, ErrorCode::InvalidAmount);
        if self.stake_timestamp.is_some() {
            require_keys_eq!(self.treasury, *treasury, ErrorCode::InvalidTreasury);
        }
        self.staked_amount
            .checked_add(amount)
            .ok_or(ErrorCode::Overflow)?;
        Ok(())
    }

    /// Accumulates a deposit. The vesting clock starts at the first deposit
    /// and is not restarted by later ones.
    pub fn record_deposit(
        &mut self,
        amount: u64,
        source: Pubkey,
        treasury: Pubkey,
        now: i64,
    ) -> Result<()> {
        self.check_deposit(amount, &treasury)?;

        self.staked_amount = self
            .staked_amount
            .checked_add(amount)
            .ok_or(ErrorCode::Overflow)?;

        if self.stake_timestamp.is_none() {
            self.stake_timestamp = Some(now);
            self.source = source;
            self.treasury = treasury;
        }
        Ok(())
    }

    /// Amount that may be released at `now`. Never mutates, so a
    /// `VestingNotComplete` rejection can be retried later.
    pub fn releasable_amount(&self, now: i64) -> Result<u64> {
        require!(!self.released, ErrorCode::AlreadyReleased);
        require!(
            self.staked_amount > 0 && self.stake_timestamp.is_some(),
            ErrorCode::NothingStaked
        );

        let unlock_at = self.unlock_at()?.ok_or(ErrorCode::NothingStaked)?;
        require!(now >= unlock_at, ErrorCode::VestingNotComplete);

        Ok(self.staked_amount)
    }

    /// Terminal transition. Returns the amount that left custody.
    pub fn mark_released(&mut self) -> u64 {
        let amount = self.staked_amount;
        self.staked_amount = 0;
        self.released = true;
        amount
    }

    pub fn status(&self, now: i64) -> Result<StakeStatus> {
        let unlock_at = self.unlock_at()?;
        let seconds_remaining = match (self.state(), unlock_at) {
            (StakeState::Staked, Some(unlock_at)) => unlock_at.saturating_sub(now).max(0),
            _ => 0,
        };

        Ok(StakeStatus {
            state: self.state(),
            staked_amount: self.staked_amount,
            unlock_at,
            seconds_remaining,
            releasable: self.releasable_amount(now).is_ok(),
        })
    }
}

/// Point-in-time view of a stake, as reported by `get_stake_status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeStatus {
    pub state: StakeState,
    pub staked_amount: u64,
    pub unlock_at: Option<i64>,
    pub seconds_remaining: i64,
    pub releasable: bool,
}
