//! Reservation configuration.

use serde::{Deserialize, Serialize};

use stockreloc_core::Precision;

use crate::removal::RemovalStrategy;

pub const PRECISION_DIGITS_ENV: &str = "STOCKRELOC_PRECISION_DIGITS";
pub const REMOVAL_STRATEGY_ENV: &str = "STOCKRELOC_REMOVAL_STRATEGY";

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationSettings {
    /// Decimal places of the "Product Unit of Measure" precision, used when
    /// folding allocations into existing reservation lines.
    pub precision_digits: u32,
    /// Strategy used when neither the product nor any location sets one.
    pub default_removal_strategy: RemovalStrategy,
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self {
            precision_digits: 3,
            default_removal_strategy: RemovalStrategy::Fifo,
        }
    }
}

impl ReservationSettings {
    /// Reads overrides from the environment, keeping defaults for anything
    /// unset or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup(PRECISION_DIGITS_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(digits) if digits <= 10 => settings.precision_digits = digits,
                _ => tracing::warn!(
                    value = %raw,
                    "{PRECISION_DIGITS_ENV} is not a digit count between 0 and 10; using {}",
                    settings.precision_digits
                ),
            }
        }

        if let Some(raw) = lookup(REMOVAL_STRATEGY_ENV) {
            match raw.parse() {
                Ok(strategy) => settings.default_removal_strategy = strategy,
                Err(err) => tracing::warn!(
                    value = %raw,
                    error = %err,
                    "{REMOVAL_STRATEGY_ENV} not understood; using {}",
                    settings.default_removal_strategy
                ),
            }
        }

        settings
    }

    pub fn precision(&self) -> Precision {
        Precision::from_digits(self.precision_digits)
    }
}
