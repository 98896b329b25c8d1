use crate::error::EngineError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default commission withheld from a developer's withdrawal, in percent.
pub const DEFAULT_WITHDRAWAL_FEE_PERCENTAGE: Decimal = Decimal::TEN;

/// A non-negative monetary value held by a user.
///
/// Wraps `rust_decimal::Decimal` so balances cannot be mixed up with raw
/// amounts. It only moves through [`Balance::checked_add`] and
/// [`Balance::checked_sub`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Balance(pub Decimal);

/// A strictly positive monetary amount moved by a ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, EngineError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(EngineError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Adds `amount`, or `None` if the result does not fit a `Decimal`.
    pub fn checked_add(self, amount: Amount) -> Option<Self> {
        self.0.checked_add(amount.value()).map(Self)
    }

    /// Subtracts `amount`, refusing to go below zero.
    pub fn checked_sub(self, amount: Amount) -> Option<Self> {
        if self.0 >= amount.value() {
            Some(Self(self.0 - amount.value()))
        } else {
            None
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The commission split of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalSplit {
    pub fee_amount: Decimal,
    pub net_amount: Decimal,
}

/// Splits `amount` into the platform fee and the developer's net payout.
///
/// The fee is rounded to `decimal_places` (midpoint away from zero) and the
/// net payout is whatever remains, so `fee_amount + net_amount == amount`
/// holds exactly.
pub fn compute_withdrawal_split(
    amount: Decimal,
    fee_percentage: Decimal,
    decimal_places: u32,
) -> Result<WithdrawalSplit, EngineError> {
    let amount = Amount::new(amount)?;
    if fee_percentage < Decimal::ZERO || fee_percentage > Decimal::ONE_HUNDRED {
        return Err(EngineError::Config(format!(
            "fee percentage must be within 0..=100, got {fee_percentage}"
        )));
    }

    let fee_amount = amount
        .value()
        .checked_mul(fee_percentage)
        .ok_or(EngineError::InvalidAmount(amount.value()))?
        / Decimal::ONE_HUNDRED;
    let fee_amount =
        fee_amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);

    Ok(WithdrawalSplit {
        fee_amount,
        net_amount: amount.value() - fee_amount,
    })
}

/// Sums `values`, or `None` if the total does not fit a `Decimal`.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
}
