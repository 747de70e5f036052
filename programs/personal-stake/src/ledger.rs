//! Balance ledger capability consumed by the proxy and staking code.
//!
//! On chain the SPL token program is the ledger and is reached through CPI;
//! the plain-data views below let the shared checks read SPL accounts.
//! Off chain any [`BalanceLedger`] can back the [`Runtime`](crate::runtime::Runtime),
//! and [`MemoryLedger`] is the in-memory one used by simulations and tests.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_spl::token::{Mint, TokenAccount};

use crate::{AuthorityType, ErrorCode};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintState {
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
}

impl MintState {
    pub fn new(mint_authority: Pubkey, decimals: u8) -> Self {
        Self {
            mint_authority: Some(mint_authority),
            freeze_authority: None,
            supply: 0,
            decimals,
        }
    }

    pub fn authority(&self, kind: AuthorityType) -> Result<Option<Pubkey>> {
        match kind {
            AuthorityType::MintTokens => Ok(self.mint_authority),
            AuthorityType::FreezeAccount => Ok(self.freeze_authority),
            _ => err!(ErrorCode::UnsupportedAuthorityType),
        }
    }
}

impl From<&Mint> for MintState {
    fn from(mint: &Mint) -> Self {
        Self {
            mint_authority: key_of(&mint.mint_authority),
            freeze_authority: key_of(&mint.freeze_authority),
            supply: mint.supply,
            decimals: mint.decimals,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenAccountState {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub close_authority: Option<Pubkey>,
}

impl TokenAccountState {
    pub fn new(mint: Pubkey, owner: Pubkey) -> Self {
        Self {
            mint,
            owner,
            amount: 0,
            close_authority: None,
        }
    }

    pub fn authority(&self, kind: AuthorityType) -> Result<Option<Pubkey>> {
        match kind {
            AuthorityType::AccountOwner => Ok(Some(self.owner)),
            AuthorityType::CloseAccount => Ok(self.close_authority),
            _ => err!(ErrorCode::UnsupportedAuthorityType),
        }
    }
}

impl From<&TokenAccount> for TokenAccountState {
    fn from(account: &TokenAccount) -> Self {
        Self {
            mint: account.mint,
            owner: account.owner,
            amount: account.amount,
            close_authority: key_of(&account.close_authority),
        }
    }
}

fn key_of(key: &COption<Pubkey>) -> Option<Pubkey> {
    match key {
        COption::Some(key) => Some(*key),
        COption::None => None,
    }
}

/// Primitive balance operations. Implementations only do bookkeeping;
/// authority checks happen in [`crate::proxy`] before any of these run.
pub trait BalanceLedger {
    fn token_account(&self, key: &Pubkey) -> Result<TokenAccountState>;

    fn mint_account(&self, key: &Pubkey) -> Result<MintState>;

    fn debit(&mut self, account: &Pubkey, amount: u64) -> Result<()>;

    fn credit(&mut self, account: &Pubkey, amount: u64) -> Result<()>;

    fn mint(&mut self, mint: &Pubkey, account: &Pubkey, amount: u64) -> Result<()>;

    fn burn(&mut self, mint: &Pubkey, account: &Pubkey, amount: u64) -> Result<()>;

    fn set_authority(
        &mut self,
        target: &Pubkey,
        kind: AuthorityType,
        new_authority: Option<Pubkey>,
    ) -> Result<()>;
}

/// Mints and token accounts keyed by address.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    mints: BTreeMap<Pubkey, MintState>,
    accounts: BTreeMap<Pubkey, TokenAccountState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_mint(&mut self, key: Pubkey, mint_authority: Pubkey, decimals: u8) -> Result<()> {
        require!(!self.exists(&key), ErrorCode::AlreadyInitialized);
        self.mints.insert(key, MintState::new(mint_authority, decimals));
        Ok(())
    }

    pub fn create_token_account(&mut self, key: Pubkey, mint: Pubkey, owner: Pubkey) -> Result<()> {
        require!(!self.exists(&key), ErrorCode::AlreadyInitialized);
        require!(self.mints.contains_key(&mint), ErrorCode::AccountNotFound);
        self.accounts.insert(key, TokenAccountState::new(mint, owner));
        Ok(())
    }

    /// Creates the program treasury for `mint` at its derived address.
    pub fn create_treasury(&mut self, mint: Pubkey) -> Result<Pubkey> {
        let (treasury, _) = crate::treasury_address(&mint);
        self.create_token_account(treasury, mint, treasury)?;
        Ok(treasury)
    }

    pub fn balance(&self, key: &Pubkey) -> Result<u64> {
        Ok(self.account(key)?.amount)
    }

    pub fn supply(&self, mint: &Pubkey) -> Result<u64> {
        Ok(self.mints.get(mint).ok_or(ErrorCode::AccountNotFound)?.supply)
    }

    fn exists(&self, key: &Pubkey) -> bool {
        self.mints.contains_key(key) || self.accounts.contains_key(key)
    }

    fn account(&self, key: &Pubkey) -> Result<&TokenAccountState> {
        Ok(self.accounts.get(key).ok_or(ErrorCode::AccountNotFound)?)
    }

    fn account_mut(&mut self, key: &Pubkey) -> Result<&mut TokenAccountState> {
        Ok(self.accounts.get_mut(key).ok_or(ErrorCode::AccountNotFound)?)
    }

    fn mint_mut(&mut self, key: &Pubkey) -> Result<&mut MintState> {
        Ok(self.mints.get_mut(key).ok_or(ErrorCode::AccountNotFound)?)
    }
}

impl BalanceLedger for MemoryLedger {
    fn token_account(&self, key: &Pubkey) -> Result<TokenAccountState> {
        self.account(key).cloned()
    }

    fn mint_account(&self, key: &Pubkey) -> Result<MintState> {
        Ok(self.mints.get(key).ok_or(ErrorCode::AccountNotFound)?.clone())
    }

    fn debit(&mut self, account: &Pubkey, amount: u64) -> Result<()> {
        let account = self.account_mut(account)?;
        account.amount = account
            .amount
            .checked_sub(amount)
            .ok_or(ErrorCode::InsufficientFunds)?;
        Ok(())
    }

    fn credit(&mut self, account: &Pubkey, amount: u64) -> Result<()> {
        let account = self.account_mut(account)?;
        account.amount = account
            .amount
            .checked_add(amount)
            .ok_or(ErrorCode::Overflow)?;
        Ok(())
    }

    fn mint(&mut self, mint: &Pubkey, account: &Pubkey, amount: u64) -> Result<()> {
        require_keys_eq!(self.account(account)?.mint, *mint, ErrorCode::MintMismatch);

        let mint_state = self.mint_mut(mint)?;
        let supply = mint_state
            .supply
            .checked_add(amount)
            .ok_or(ErrorCode::Overflow)?;
        self.credit(account, amount)?;
        self.mint_mut(mint)?.supply = supply;
        Ok(())
    }

    fn burn(&mut self, mint: &Pubkey, account: &Pubkey, amount: u64) -> Result<()> {
        require_keys_eq!(self.account(account)?.mint, *mint, ErrorCode::MintMismatch);

        let mint_state = self.mint_mut(mint)?;
        let supply = mint_state
            .supply
            .checked_sub(amount)
            .ok_or(ErrorCode::Overflow)?;
        self.debit(account, amount)?;
        self.mint_mut(mint)?.supply = supply;
        Ok(())
    }

    fn set_authority(
        &mut self,
        target: &Pubkey,
        kind: AuthorityType,
        new_authority: Option<Pubkey>,
    ) -> Result<()> {
        match kind {
            AuthorityType::MintTokens => self.mint_mut(target)?.mint_authority = new_authority,
            AuthorityType::FreezeAccount => self.mint_mut(target)?.freeze_authority = new_authority,
            AuthorityType::AccountOwner => {
                let owner = new_authority.ok_or(ErrorCode::InvalidAuthority)?;
                self.account_mut(target)?.owner = owner;
            }
            AuthorityType::CloseAccount => self.account_mut(target)?.close_authority = new_authority,
        }
        Ok(())
    }
}
