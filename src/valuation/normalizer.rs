use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid conversion rate {value}: the USD rate must be greater than zero")]
pub struct InvalidRate {
    value: Decimal,
}

/// Fixed USD → reporting-currency rate. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ConversionRate(Decimal);

impl ConversionRate {
    pub fn new(value: Decimal) -> Result<Self, InvalidRate> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(InvalidRate { value })
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for ConversionRate {
    type Error = InvalidRate;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConversionRate> for Decimal {
    fn from(rate: ConversionRate) -> Self {
        rate.0
    }
}

impl fmt::Display for ConversionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An amount too large for `Decimal` came out of a valuation step.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("Amount overflowed while computing the {0}")]
pub struct AmountOverflow(pub &'static str);

/// Convert a USD amount into the reporting currency: `amount × rate`.
pub fn convert(amount_usd: Decimal, rate: ConversionRate) -> Result<Decimal, AmountOverflow> {
    amount_usd
        .checked_mul(rate.value())
        .ok_or(AmountOverflow("currency conversion"))
}
