//! Decimal precision rules for stock quantities.
//!
//! Every quantity comparison in the reservation engine goes through a
//! [`Precision`]: two quantities are equal when their difference rounds to
//! zero at the unit-of-measure rounding step. Plain `==` on quantities is never
//! used for business decisions.

use core::cmp::Ordering;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// How a value is brought onto the rounding grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMethod {
    /// Nearest step, ties away from zero.
    HalfUp,
    /// Toward zero.
    Down,
    /// Away from zero.
    Up,
}

impl RoundingMethod {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMethod::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMethod::Down => RoundingStrategy::ToZero,
            RoundingMethod::Up => RoundingStrategy::AwayFromZero,
        }
    }
}

/// A rounding step such as `0.01` (two decimals) or `1` (whole units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Precision {
    rounding: Decimal,
}

/// Finest rounding step accepted (ten decimal places).
pub const MIN_ROUNDING: Decimal = Decimal::from_parts(1, 0, 0, false, 10);

/// Most decimal places a precision may carry.
pub const MAX_DIGITS: u32 = 10;

impl Precision {
    /// Precision from a rounding step, between [`MIN_ROUNDING`] and any
    /// positive value.
    pub fn from_rounding(rounding: Decimal) -> DomainResult<Self> {
        if rounding <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "rounding step must be positive (got {rounding})"
            )));
        }
        if rounding < MIN_ROUNDING {
            return Err(DomainError::validation(format!(
                "rounding step {rounding} is finer than {MIN_ROUNDING}"
            )));
        }
        Ok(Self { rounding })
    }

    /// Precision of `digits` decimal places (`3` gives a step of `0.001`),
    /// capped at [`MAX_DIGITS`].
    pub fn from_digits(digits: u32) -> Self {
        Self {
            rounding: Decimal::new(1, digits.min(MAX_DIGITS)),
        }
    }

    /// Whole units.
    pub fn units() -> Self {
        Self {
            rounding: Decimal::ONE,
        }
    }

    pub fn rounding(&self) -> Decimal {
        self.rounding
    }

    /// Half-up rounding onto the grid.
    pub fn round(&self, value: Decimal) -> Decimal {
        self.round_with(value, RoundingMethod::HalfUp)
    }

    /// Values too large to divide by the step carry no digits below it and
    /// are returned as they are.
    pub fn round_with(&self, value: Decimal, method: RoundingMethod) -> Decimal {
        let Some(steps) = value.checked_div(self.rounding) else {
            return value;
        };
        let steps = steps.round_dp_with_strategy(0, method.strategy());
        steps.checked_mul(self.rounding).map_or(value, |v| v.normalize())
    }

    /// Compares `a` and `b` after rounding both onto the grid.
    pub fn compare(&self, a: Decimal, b: Decimal) -> Ordering {
        let delta = self.round(a) - self.round(b);
        if self.is_zero(delta) {
            Ordering::Equal
        } else {
            delta.cmp(&Decimal::ZERO)
        }
    }

    pub fn is_zero(&self, value: Decimal) -> bool {
        self.round(value).is_zero()
    }

    pub fn equals(&self, a: Decimal, b: Decimal) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    pub fn is_positive(&self, value: Decimal) -> bool {
        self.compare(value, Decimal::ZERO) == Ordering::Greater
    }

    pub fn is_negative(&self, value: Decimal) -> bool {
        self.compare(value, Decimal::ZERO) == Ordering::Less
    }

    /// True when `value` has no fractional part at this precision.
    pub fn is_whole(&self, value: Decimal) -> bool {
        self.equals(value, value.trunc())
    }
}

impl TryFrom<Decimal> for Precision {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_rounding(value)
    }
}

impl From<Precision> for Decimal {
    fn from(value: Precision) -> Self {
        value.rounding
    }
}
