use std::cell::Cell;

use anchor_lang::prelude::*;

use crate::ErrorCode;

/// Source of the current unix timestamp used for vesting decisions.
/// Implementations must be monotonically non-decreasing and side-effect free.
pub trait VestingClock {
    fn now(&self) -> Result<i64>;
}

/// Reads the `Clock` sysvar. Only available inside the Solana runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysvarClock;

impl VestingClock for SysvarClock {
    fn now(&self) -> Result<i64> {
        Ok(Clock::get()?.unix_timestamp)
    }
}

/// Clock that only moves when told to.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, seconds: u64) -> Result<i64> {
        let seconds = i64::try_from(seconds).map_err(|_| ErrorCode::Overflow)?;
        let now = self
            .now
            .get()
            .checked_add(seconds)
            .ok_or(ErrorCode::Overflow)?;
        self.now.set(now);
        Ok(now)
    }
}

impl VestingClock for ManualClock {
    fn now(&self) -> Result<i64> {
        Ok(self.now.get())
    }
}

impl<C: VestingClock + ?Sized> VestingClock for &C {
    fn now(&self) -> Result<i64> {
        (**self).now()
    }
}
