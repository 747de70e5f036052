//! Authority-gated forwards onto a [`BalanceLedger`].
//!
//! The `check_*` functions hold all validation and are shared with the
//! on-chain handlers, which then forward through SPL token CPIs instead of a
//! ledger.

use anchor_lang::prelude::*;

use crate::gate;
use crate::ledger::{BalanceLedger, MintState, TokenAccountState};
use crate::{AuthorityType, ErrorCode};

pub fn check_mint_to(
    mint: &MintState,
    mint_key: &Pubkey,
    destination: &TokenAccountState,
    amount: u64,
    signers: &[Pubkey],
) -> Result<()> {
    gate::authorize(mint.mint_authority.as_ref(), signers)?;
    require!(amount > 0, ErrorCode::InvalidAmount);
    require_keys_eq!(destination.mint, *mint_key, ErrorCode::MintMismatch);
    mint.supply.checked_add(amount).ok_or(ErrorCode::Overflow)?;
    destination
        .amount
        .checked_add(amount)
        .ok_or(ErrorCode::Overflow)?;
    Ok(())
}

pub fn check_transfer(
    from: &TokenAccountState,
    to: &TokenAccountState,
    amount: u64,
    signers: &[Pubkey],
) -> Result<()> {
    gate::authorize(Some(&from.owner), signers)?;
    require!(amount > 0, ErrorCode::InvalidAmount);
    require_keys_eq!(from.mint, to.mint, ErrorCode::MintMismatch);
    require!(from.amount >= amount, ErrorCode::InsufficientFunds);
    Ok(())
}

pub fn check_burn(
    mint_key: &Pubkey,
    from: &TokenAccountState,
    amount: u64,
    signers: &[Pubkey],
) -> Result<()> {
    gate::authorize(Some(&from.owner), signers)?;
    require!(amount > 0, ErrorCode::InvalidAmount);
    require_keys_eq!(from.mint, *mint_key, ErrorCode::MintMismatch);
    require!(from.amount >= amount, ErrorCode::InsufficientFunds);
    Ok(())
}

/// `current` is the authority of `kind` presently recorded on the target.
pub fn check_set_authority(
    current: Option<Pubkey>,
    kind: AuthorityType,
    new_authority: Option<Pubkey>,
    signers: &[Pubkey],
) -> Result<()> {
    gate::authorize(current.as_ref(), signers)?;
    if kind == AuthorityType::AccountOwner {
        require!(new_authority.is_some(), ErrorCode::InvalidAuthority);
    }
    Ok(())
}

pub fn mint_to<L: BalanceLedger>(
    ledger: &mut L,
    amount: u64,
    mint: &Pubkey,
    destination: &Pubkey,
    signers: &[Pubkey],
) -> Result<()> {
    let mint_state = ledger.mint_account(mint)?;
    let destination_state = ledger.token_account(destination)?;
    check_mint_to(&mint_state, mint, &destination_state, amount, signers)?;

    ledger.mint(mint, destination, amount)?;
    msg!("Minted {} tokens to {}", amount, destination);
    Ok(())
}

pub fn transfer<L: BalanceLedger>(
    ledger: &mut L,
    amount: u64,
    from: &Pubkey,
    to: &Pubkey,
    signers: &[Pubkey],
) -> Result<()> {
    let from_state = ledger.token_account(from)?;
    let to_state = ledger.token_account(to)?;
    check_transfer(&from_state, &to_state, amount, signers)?;

    ledger.debit(from, amount)?;
    ledger.credit(to, amount)?;
    msg!("Transferred {} tokens from {} to {}", amount, from, to);
    Ok(())
}

pub fn burn<L: BalanceLedger>(
    ledger: &mut L,
    amount: u64,
    mint: &Pubkey,
    from: &Pubkey,
    signers: &[Pubkey],
) -> Result<()> {
    let from_state = ledger.token_account(from)?;
    check_burn(mint, &from_state, amount, signers)?;

    ledger.burn(mint, from, amount)?;
    msg!("Burned {} tokens from {}", amount, from);
    Ok(())
}

pub fn set_authority<L: BalanceLedger>(
    ledger: &mut L,
    kind: AuthorityType,
    new_authority: Option<Pubkey>,
    target: &Pubkey,
    signers: &[Pubkey],
) -> Result<()> {
    let current = if kind.targets_mint() {
        ledger.mint_account(target)?.authority(kind)?
    } else {
        ledger.token_account(target)?.authority(kind)?
    };
    check_set_authority(current, kind, new_authority, signers)?;

    ledger.set_authority(target, kind, new_authority)?;
    msg!("{:?} authority of {} set to {:?}", kind, target, new_authority);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::error::Error;
    use crate::ledger::MemoryLedger;

    struct Fixture {
        ledger: MemoryLedger,
        mint: Pubkey,
        mint_authority: Pubkey,
        alice: Pubkey,
        alice_tokens: Pubkey,
        bob_tokens: Pubkey,
    }

    fn fixture() -> Fixture {
        let mut ledger = MemoryLedger::new();
        let mint = Pubkey::new_unique();
        let mint_authority = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let alice_tokens = Pubkey::new_unique();
        let bob_tokens = Pubkey::new_unique();
        ledger.create_mint(mint, mint_authority, 9).unwrap();
        ledger.create_token_account(alice_tokens, mint, alice).unwrap();
        ledger
            .create_token_account(bob_tokens, mint, Pubkey::new_unique())
            .unwrap();
        Fixture {
            ledger,
            mint,
            mint_authority,
            alice,
            alice_tokens,
            bob_tokens,
        }
    }

    #[test]
    fn mint_transfer_burn() {
        let mut f = fixture();

        mint_to(&mut f.ledger, 1_000, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap();
        transfer(&mut f.ledger, 400, &f.alice_tokens, &f.bob_tokens, &[f.alice]).unwrap();
        burn(&mut f.ledger, 350, &f.mint, &f.alice_tokens, &[f.alice]).unwrap();

        assert_eq!(f.ledger.balance(&f.alice_tokens).unwrap(), 250);
        assert_eq!(f.ledger.balance(&f.bob_tokens).unwrap(), 400);
        assert_eq!(f.ledger.supply(&f.mint).unwrap(), 650);
    }

    #[test]
    fn mint_requires_mint_authority() {
        let mut f = fixture();

        let err = mint_to(&mut f.ledger, 5, &f.mint, &f.alice_tokens, &[f.alice]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::Unauthorized));
        assert_eq!(f.ledger.supply(&f.mint).unwrap(), 0);
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let mut f = fixture();
        mint_to(&mut f.ledger, 10, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap();

        let err = mint_to(&mut f.ledger, 0, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InvalidAmount));
        let err = transfer(&mut f.ledger, 0, &f.alice_tokens, &f.bob_tokens, &[f.alice]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InvalidAmount));
        let err = burn(&mut f.ledger, 0, &f.mint, &f.alice_tokens, &[f.alice]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InvalidAmount));
    }

    #[test]
    fn transfer_checks_balance_and_owner() {
        let mut f = fixture();
        mint_to(&mut f.ledger, 100, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap();

        let err = transfer(&mut f.ledger, 101, &f.alice_tokens, &f.bob_tokens, &[f.alice]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InsufficientFunds));

        let err = transfer(&mut f.ledger, 1, &f.alice_tokens, &f.bob_tokens, &[f.mint_authority])
            .unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::Unauthorized));

        assert_eq!(f.ledger.balance(&f.alice_tokens).unwrap(), 100);
        assert_eq!(f.ledger.balance(&f.bob_tokens).unwrap(), 0);
    }

    #[test]
    fn burn_checks_owner_and_balance() {
        let mut f = fixture();
        mint_to(&mut f.ledger, 100, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap();

        let err = burn(&mut f.ledger, 10, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::Unauthorized));
        let err = burn(&mut f.ledger, 101, &f.mint, &f.alice_tokens, &[f.alice]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InsufficientFunds));

        assert_eq!(f.ledger.balance(&f.alice_tokens).unwrap(), 100);
        assert_eq!(f.ledger.supply(&f.mint).unwrap(), 100);
    }

    #[test]
    fn transfer_across_mints_fails() {
        let mut f = fixture();
        let other_mint = Pubkey::new_unique();
        let foreign = Pubkey::new_unique();
        f.ledger.create_mint(other_mint, f.mint_authority, 9).unwrap();
        f.ledger.create_token_account(foreign, other_mint, f.alice).unwrap();
        mint_to(&mut f.ledger, 10, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap();

        let err = transfer(&mut f.ledger, 5, &f.alice_tokens, &foreign, &[f.alice]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::MintMismatch));
    }

    #[test]
    fn rotated_mint_authority_takes_over() {
        let mut f = fixture();
        let next = Pubkey::new_unique();

        let err = set_authority(&mut f.ledger, AuthorityType::MintTokens, Some(next), &f.mint, &[next])
            .unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::Unauthorized));

        set_authority(
            &mut f.ledger,
            AuthorityType::MintTokens,
            Some(next),
            &f.mint,
            &[f.mint_authority],
        )
        .unwrap();

        let err = mint_to(&mut f.ledger, 1, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::Unauthorized));
        mint_to(&mut f.ledger, 1, &f.mint, &f.alice_tokens, &[next]).unwrap();
    }

    #[test]
    fn cleared_mint_authority_fixes_supply() {
        let mut f = fixture();
        set_authority(&mut f.ledger, AuthorityType::MintTokens, None, &f.mint, &[f.mint_authority])
            .unwrap();

        let err = mint_to(&mut f.ledger, 1, &f.mint, &f.alice_tokens, &[f.mint_authority]).unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::Unauthorized));
    }

    #[test]
    fn account_owner_can_hand_over_account() {
        let mut f = fixture();
        let carol = Pubkey::new_unique();

        set_authority(
            &mut f.ledger,
            AuthorityType::AccountOwner,
            Some(carol),
            &f.alice_tokens,
            &[f.alice],
        )
        .unwrap();
        assert_eq!(f.ledger.token_account(&f.alice_tokens).unwrap().owner, carol);

        let err = set_authority(&mut f.ledger, AuthorityType::AccountOwner, None, &f.alice_tokens, &[carol])
            .unwrap_err();
        assert_eq!(err, Error::from(ErrorCode::InvalidAuthority));
    }
}
