//! # Stake and Fee Escrow
//!
//! The economics of issuance and revocation: how attached funds split into
//! jurisdiction fee, validator fee, and escrowed stake, and how stake
//! settles when a record is revoked.
//!
//! ## Settlement Rule
//!
//! The stake returns to whoever funded it, minus a rebate compensating a
//! third-party revoker for submitting the revocation:
//!
//! ```text
//! rebate = min(stake, fee_rate × REVOCATION_REBATE_UNITS)   (0 if self-revoked)
//! refund = stake − rebate
//! ```
//!
//! The rebate never exceeds the stake and the refund is never negative.
//! When the stake cannot cover the full rebate, the revoker takes the
//! whole stake and the funder receives nothing.
//!
//! Split and settlement are pure functions; the escrow struct itself only
//! tracks the held total. All policy checks happen before any mutation, so
//! [`StakeFeeEscrow::hold`] and [`StakeFeeEscrow::release`] are always the
//! first mutation of an operation's commit phase.

use serde::{Deserialize, Serialize};

use jur_core::{Address, Amount, RegistryError};

/// Unit count for the revocation rebate; multiplied by the caller's fee
/// rate to approximate the cost of submitting the revocation.
pub const REVOCATION_REBATE_UNITS: u128 = 37_700;

/// How attached funds divide on issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingSplit {
    /// Escrowed against the record.
    pub stake: Amount,
    /// Paid to the registry owner.
    pub jurisdiction_fee: Amount,
    /// Paid to the issuing validator (zero on the direct path).
    pub validator_fee: Amount,
}

/// How a revoked record's stake divides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Paid to the revoker.
    pub rebate: Amount,
    /// Returned to the original funder.
    pub refund: Amount,
}

/// Split funds for a direct validator issuance. No validator fee; the
/// issuer is paying, not being paid.
///
/// Requires `value ≥ minimum_stake + jurisdiction_fee`; everything above
/// the fee becomes stake.
pub fn split_direct(
    value: Amount,
    minimum_stake: Amount,
    jurisdiction_fee: Amount,
) -> Result<FundingSplit, RegistryError> {
    let floor = minimum_stake
        .checked_add(jurisdiction_fee)
        .ok_or_else(|| RegistryError::FundsMismatch("stake requirement overflows".into()))?;
    if value < floor {
        return Err(RegistryError::FundsMismatch(format!(
            "supplied {value}, issuance requires at least {floor}"
        )));
    }
    let stake = value
        .checked_sub(jurisdiction_fee)
        .ok_or_else(|| RegistryError::FundsMismatch("supplied funds below the fee".into()))?;
    Ok(FundingSplit {
        stake,
        jurisdiction_fee,
        validator_fee: Amount::ZERO,
    })
}

/// Split funds for a signed issuance.
///
/// The attached value must equal the approval's `funds_required` exactly
/// (the hash binds the terms), and `funds_required` must cover
/// `minimum_stake + jurisdiction_fee + validator_fee`. The remainder above
/// the two fees becomes stake.
pub fn split_signed(
    value: Amount,
    funds_required: Amount,
    validator_fee: Amount,
    minimum_stake: Amount,
    jurisdiction_fee: Amount,
) -> Result<FundingSplit, RegistryError> {
    if value != funds_required {
        return Err(RegistryError::FundsMismatch(format!(
            "supplied {value} does not match the approval's required {funds_required}"
        )));
    }
    let fees = jurisdiction_fee
        .checked_add(validator_fee)
        .ok_or_else(|| RegistryError::FundsMismatch("fee total overflows".into()))?;
    let floor = minimum_stake
        .checked_add(fees)
        .ok_or_else(|| RegistryError::FundsMismatch("stake requirement overflows".into()))?;
    if funds_required < floor {
        return Err(RegistryError::FundsMismatch(format!(
            "approval requires {funds_required}, below the type's floor of {floor}"
        )));
    }
    let stake = funds_required
        .checked_sub(fees)
        .ok_or_else(|| RegistryError::FundsMismatch("supplied funds below the fees".into()))?;
    Ok(FundingSplit {
        stake,
        jurisdiction_fee,
        validator_fee,
    })
}

/// Settle a revoked record's stake between revoker and funder.
pub fn settle_revocation(
    stake: Amount,
    fee_rate: Amount,
    revoker: Address,
    funded_by: Address,
) -> Settlement {
    if revoker == funded_by {
        return Settlement {
            rebate: Amount::ZERO,
            refund: stake,
        };
    }
    let rebate = std::cmp::min(stake, fee_rate.saturating_mul(REVOCATION_REBATE_UNITS));
    Settlement {
        rebate,
        refund: stake.saturating_sub(rebate),
    }
}

/// Running total of stake held against live records.
///
/// Invariant: equals the sum of every record's `stake` field. Maintained
/// by the registry's commit phases; `hold`/`release` failures mean the
/// invariant was about to break, and nothing is mutated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeFeeEscrow {
    held: Amount,
}

impl StakeFeeEscrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Amount {
        self.held
    }

    pub fn hold(&mut self, stake: Amount) -> Result<(), RegistryError> {
        self.held = self
            .held
            .checked_add(stake)
            .ok_or_else(|| RegistryError::FundsMismatch("escrow total would overflow".into()))?;
        Ok(())
    }

    pub fn release(&mut self, stake: Amount) -> Result<(), RegistryError> {
        self.held = self
            .held
            .checked_sub(stake)
            .ok_or_else(|| RegistryError::FundsMismatch("escrow released below zero".into()))?;
        Ok(())
    }
}
