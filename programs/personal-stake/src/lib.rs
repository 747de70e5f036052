#![allow(unexpected_cfgs)]

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Burn, Mint, MintTo, SetAuthority, Token, TokenAccount, Transfer};

pub mod clock;
pub mod gate;
pub mod ledger;
pub mod proxy;
pub mod release;
pub mod runtime;
pub mod staking;
pub mod state;

use crate::clock::{SysvarClock, VestingClock};
use crate::ledger::{MintState, TokenAccountState};
pub use crate::state::{StakeAccount, StakeState, StakeStatus};

declare_id!("GhjjYi6QpGm8Fe6Q6N9YNvqN2j1QKMczbke6yWUTYi7z");

// Constants
pub const TREASURY_SEED: &[u8] = b"treasury";

pub const SECONDS_PER_DAY: u64 = 86_400;
pub const DEFAULT_VESTING_PERIOD: u64 = 1_000; // seconds
pub const MAX_VESTING_PERIOD: u64 = 10 * 365 * SECONDS_PER_DAY; // 10 years

#[error_code]
pub enum ErrorCode {
    #[msg("Signer is not the required authority")]
    Unauthorized,
    #[msg("Invalid amount")]
    InvalidAmount,
    #[msg("Insufficient token balance")]
    InsufficientFunds,
    #[msg("Account already initialized")]
    AlreadyInitialized,
    #[msg("Nothing staked")]
    NothingStaked,
    #[msg("Vesting period has not elapsed")]
    VestingNotComplete,
    #[msg("Stake already released")]
    AlreadyReleased,
    #[msg("Arithmetic overflow")]
    Overflow,
    #[msg("Token accounts belong to different mints")]
    MintMismatch,
    #[msg("Treasury is not the custody account for this stake")]
    InvalidTreasury,
    #[msg("Destination is not owned by the stake owner")]
    InvalidDestination,
    #[msg("Invalid vesting period")]
    InvalidVestingPeriod,
    #[msg("Account not found")]
    AccountNotFound,
    #[msg("Authority type not supported by the target account")]
    UnsupportedAuthorityType,
    #[msg("Invalid new authority")]
    InvalidAuthority,
}

/// Derives the custody token account for `mint`. The treasury is its own
/// token-account owner, so only this program can sign transfers out of it.
pub fn treasury_address(mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TREASURY_SEED, mint.as_ref()], &crate::ID)
}

#[program]
pub mod personal_stake {
    use super::*;

    // =====================================================
    // TOKEN PROXY
    // =====================================================

    pub fn proxy_mint_to(ctx: Context<ProxyMintTo>, amount: u64) -> Result<()> {
        let signers = [ctx.accounts.authority.key()];
        proxy::check_mint_to(
            &MintState::from(&*ctx.accounts.mint),
            &ctx.accounts.mint.key(),
            &TokenAccountState::from(&*ctx.accounts.to),
            amount,
            &signers,
        )?;

        let cpi_ctx = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            MintTo {
                mint: ctx.accounts.mint.to_account_info(),
                to: ctx.accounts.to.to_account_info(),
                authority: ctx.accounts.authority.to_account_info(),
            },
        );
        token::mint_to(cpi_ctx, amount)?;

        msg!("Minted {} tokens to {}", amount, ctx.accounts.to.key());
        Ok(())
    }

    pub fn proxy_transfer(ctx: Context<ProxyTransfer>, amount: u64) -> Result<()> {
        let signers = [ctx.accounts.authority.key()];
        proxy::check_transfer(
            &TokenAccountState::from(&*ctx.accounts.from),
            &TokenAccountState::from(&*ctx.accounts.to),
            amount,
            &signers,
        )?;

        let cpi_ctx = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.from.to_account_info(),
                to: ctx.accounts.to.to_account_info(),
                authority: ctx.accounts.authority.to_account_info(),
            },
        );
        token::transfer(cpi_ctx, amount)?;

        msg!(
            "Transferred {} tokens from {} to {}",
            amount,
            ctx.accounts.from.key(),
            ctx.accounts.to.key()
        );
        Ok(())
    }

    pub fn proxy_burn(ctx: Context<ProxyBurn>, amount: u64) -> Result<()> {
        let signers = [ctx.accounts.authority.key()];
        proxy::check_burn(
            &ctx.accounts.mint.key(),
            &TokenAccountState::from(&*ctx.accounts.from),
            amount,
            &signers,
        )?;

        let cpi_ctx = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Burn {
                mint: ctx.accounts.mint.to_account_info(),
                from: ctx.accounts.from.to_account_info(),
                authority: ctx.accounts.authority.to_account_info(),
            },
        );
        token::burn(cpi_ctx, amount)?;

        msg!("Burned {} tokens from {}", amount, ctx.accounts.from.key());
        Ok(())
    }

    pub fn proxy_set_authority(
        ctx: Context<ProxySetAuthority>,
        authority_type: AuthorityType,
        new_authority: Option<Pubkey>,
    ) -> Result<()> {
        let signers = [ctx.accounts.current_authority.key()];

        // The target is either a mint or a token account depending on the
        // authority being changed, so it is decoded by hand.
        let current = {
            let target = &ctx.accounts.account_or_mint;
            require_keys_eq!(*target.owner, token::ID, ErrorCode::AccountNotFound);
            let data = target.try_borrow_data()?;
            if authority_type.targets_mint() {
                MintState::from(&Mint::try_deserialize(&mut &data[..])?).authority(authority_type)?
            } else {
                TokenAccountState::from(&TokenAccount::try_deserialize(&mut &data[..])?)
                    .authority(authority_type)?
            }
        };
        proxy::check_set_authority(current, authority_type, new_authority, &signers)?;

        let cpi_ctx = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            SetAuthority {
                current_authority: ctx.accounts.current_authority.to_account_info(),
                account_or_mint: ctx.accounts.account_or_mint.to_account_info(),
            },
        );
        token::set_authority(cpi_ctx, authority_type.into(), new_authority)?;

        msg!(
            "{:?} authority of {} set to {:?}",
            authority_type,
            ctx.accounts.account_or_mint.key(),
            new_authority
        );
        Ok(())
    }

    // =====================================================
    // STAKING
    // =====================================================

    /// Creates the program-owned custody account for `mint`. Anyone may pay
    /// for it; the address and authority are fixed by the seeds.
    pub fn initialize_treasury(ctx: Context<InitializeTreasury>) -> Result<()> {
        msg!(
            "Treasury {} initialized for mint {}",
            ctx.accounts.treasury.key(),
            ctx.accounts.mint.key()
        );
        Ok(())
    }

    pub fn create_staking_account(
        ctx: Context<CreateStakingAccount>,
        vesting_period: Option<u64>,
    ) -> Result<()> {
        let owner = ctx.accounts.owner.key();
        staking::create_staking_account(
            &mut ctx.accounts.stake_account,
            owner,
            vesting_period,
            &[owner],
        )
    }

    pub fn stake_tokens(ctx: Context<StakeTokens>, amount: u64) -> Result<()> {
        let signers = [ctx.accounts.authority.key()];
        let from_key = ctx.accounts.from.key();
        let treasury_key = ctx.accounts.treasury.key();
        let from = TokenAccountState::from(&*ctx.accounts.from);
        let treasury = TokenAccountState::from(&*ctx.accounts.treasury);

        // === CHECKS ===
        staking::check_stake(&ctx.accounts.stake_account, &from, &treasury_key, amount, &signers)?;
        proxy::check_transfer(&from, &treasury, amount, &signers)?;

        // === EFFECTS ===
        let now = SysvarClock.now()?;
        let stake_account = &mut ctx.accounts.stake_account;
        stake_account.record_deposit(amount, from_key, treasury_key, now)?;

        // === INTERACTIONS ===
        let cpi_ctx = CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.from.to_account_info(),
                to: ctx.accounts.treasury.to_account_info(),
                authority: ctx.accounts.authority.to_account_info(),
            },
        );
        token::transfer(cpi_ctx, amount)?;

        msg!(
            "Staked {} tokens into {} (total: {})",
            amount,
            treasury_key,
            ctx.accounts.stake_account.staked_amount
        );
        Ok(())
    }

    pub fn release_tokens(ctx: Context<ReleaseTokens>) -> Result<()> {
        let signers = [ctx.accounts.authority.key()];
        let now = SysvarClock.now()?;

        // === CHECKS ===
        let amount = release::check_release(
            &ctx.accounts.stake_account,
            &ctx.accounts.treasury.key(),
            &TokenAccountState::from(&*ctx.accounts.treasury),
            &TokenAccountState::from(&*ctx.accounts.destination),
            now,
            &signers,
        )?;

        // === EFFECTS ===
        ctx.accounts.stake_account.mark_released();

        // === INTERACTIONS ===
        let mint_key = ctx.accounts.mint.key();
        let bump_seed = [ctx.bumps.treasury];
        let seeds: &[&[u8]] = &[TREASURY_SEED, mint_key.as_ref(), &bump_seed];
        let signer = &[seeds];

        let cpi_ctx = CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.treasury.to_account_info(),
                to: ctx.accounts.destination.to_account_info(),
                authority: ctx.accounts.treasury.to_account_info(),
            },
            signer,
        );
        token::transfer(cpi_ctx, amount)?;

        msg!(
            "Released {} tokens to {}",
            amount,
            ctx.accounts.destination.key()
        );
        Ok(())
    }

    /// View instruction, anyone can call
    pub fn get_stake_status(ctx: Context<GetStakeStatus>) -> Result<()> {
        let now = SysvarClock.now()?;
        let status = ctx.accounts.stake_account.status(now)?;

        msg!(
            "Stake Status - Owner: {}, State: {:?}, Staked: {}, Unlock at: {:?}, Seconds remaining: {}, Releasable: {}",
            ctx.accounts.stake_account.owner,
            status.state,
            status.staked_amount,
            status.unlock_at,
            status.seconds_remaining,
            status.releasable
        );
        Ok(())
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum AuthorityType {
    MintTokens,
    FreezeAccount,
    AccountOwner,
    CloseAccount,
}

impl AuthorityType {
    /// Whether the authority lives on a mint rather than a token account.
    pub fn targets_mint(self) -> bool {
        matches!(self, AuthorityType::MintTokens | AuthorityType::FreezeAccount)
    }
}

impl From<AuthorityType> for token::spl_token::instruction::AuthorityType {
    fn from(authority_type: AuthorityType) -> Self {
        use token::spl_token::instruction::AuthorityType as SplAuthorityType;
        match authority_type {
            AuthorityType::MintTokens => SplAuthorityType::MintTokens,
            AuthorityType::FreezeAccount => SplAuthorityType::FreezeAccount,
            AuthorityType::AccountOwner => SplAuthorityType::AccountOwner,
            AuthorityType::CloseAccount => SplAuthorityType::CloseAccount,
        }
    }
}

// =====================================================
// ACCOUNT STRUCTURES
// =====================================================

#[derive(Accounts)]
pub struct ProxyMintTo<'info> {
    pub authority: Signer<'info>,
    #[account(mut)]
    pub mint: Account<'info, Mint>,
    #[account(mut)]
    pub to: Account<'info, TokenAccount>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ProxyTransfer<'info> {
    pub authority: Signer<'info>,
    #[account(mut)]
    pub from: Account<'info, TokenAccount>,
    #[account(mut)]
    pub to: Account<'info, TokenAccount>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ProxyBurn<'info> {
    pub authority: Signer<'info>,
    #[account(mut)]
    pub mint: Account<'info, Mint>,
    #[account(mut)]
    pub from: Account<'info, TokenAccount>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ProxySetAuthority<'info> {
    pub current_authority: Signer<'info>,
    /// CHECK: Mint or token account, decoded and validated in the handler
    #[account(mut)]
    pub account_or_mint: UncheckedAccount<'info>,
    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct InitializeTreasury<'info> {
    #[account(
        init,
        payer = payer,
        seeds = [TREASURY_SEED, mint.key().as_ref()],
        bump,
        token::mint = mint,
        token::authority = treasury,
    )]
    pub treasury: Account<'info, TokenAccount>,

    pub mint: Account<'info, Mint>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub token_program: Program<'info, Token>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct CreateStakingAccount<'info> {
    #[account(init, payer = owner, space = 8 + StakeAccount::SPACE)]
    pub stake_account: Account<'info, StakeAccount>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct StakeTokens<'info> {
    pub authority: Signer<'info>,

    #[account(mut)]
    pub stake_account: Account<'info, StakeAccount>,

    #[account(
        mut,
        constraint = from.mint == mint.key() @ ErrorCode::MintMismatch
    )]
    pub from: Account<'info, TokenAccount>,

    /// Program custody account, tokens are transferred INTO here
    #[account(
        mut,
        seeds = [TREASURY_SEED, mint.key().as_ref()],
        bump,
    )]
    pub treasury: Account<'info, TokenAccount>,

    pub mint: Account<'info, Mint>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct ReleaseTokens<'info> {
    pub authority: Signer<'info>,

    #[account(mut)]
    pub stake_account: Account<'info, StakeAccount>,

    /// Program custody account, tokens are transferred FROM here
    #[account(
        mut,
        seeds = [TREASURY_SEED, mint.key().as_ref()],
        bump,
    )]
    pub treasury: Account<'info, TokenAccount>,

    #[account(mut)]
    pub destination: Account<'info, TokenAccount>,

    pub mint: Account<'info, Mint>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct GetStakeStatus<'info> {
    pub stake_account: Account<'info, StakeAccount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_spl::token::spl_token::instruction::AuthorityType as SplAuthorityType;

    #[test]
    fn treasury_signer_seeds_rebuild_the_treasury_address() {
        let mint = Pubkey::new_unique();
        let (treasury, bump) = treasury_address(&mint);

        // Same seeds release_tokens hands to invoke_signed.
        let seeds: &[&[u8]] = &[TREASURY_SEED, mint.as_ref(), &[bump]];
        assert_eq!(Pubkey::create_program_address(seeds, &crate::ID).unwrap(), treasury);
        assert_ne!(treasury_address(&Pubkey::new_unique()).0, treasury);
    }

    #[test]
    fn authority_types_map_onto_spl() {
        let cases = [
            (AuthorityType::MintTokens, SplAuthorityType::MintTokens, true),
            (AuthorityType::FreezeAccount, SplAuthorityType::FreezeAccount, true),
            (AuthorityType::AccountOwner, SplAuthorityType::AccountOwner, false),
            (AuthorityType::CloseAccount, SplAuthorityType::CloseAccount, false),
        ];
        for (kind, spl, on_mint) in cases {
            assert_eq!(SplAuthorityType::from(kind), spl);
            assert_eq!(kind.targets_mint(), on_mint);
        }
    }
}
