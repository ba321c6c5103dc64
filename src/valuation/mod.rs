//! Composite net-worth valuation.
//!
//! The [`Aggregator`] pulls the three asset classes concurrently and combines
//! them under an asymmetric failure policy:
//!
//! - **Brokerage failure** is tolerated. The brokerage component becomes `0`,
//!   a warning is logged and the cycle continues, so an outage at the broker
//!   never blocks the notification about the rest of the portfolio.
//! - **Crypto or bullion failure** aborts the cycle. Both are computed from
//!   local holdings that should always be resolvable, so a failure there is a
//!   data problem that must surface instead of silently zeroing part of the
//!   net worth.
//!
//! Whether partial reporting on brokerage failure is the desired product
//! behavior is an open question; it is kept as-is and should be confirmed with
//! the operator before changing it.

mod aggregator;
mod normalizer;

pub use aggregator::{AggregateError, Aggregator, PortfolioValuer, ValuationCycle};
pub use normalizer::{convert, AmountOverflow, ConversionRate, InvalidRate};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One net-worth computation, all values in the reporting currency.
///
/// Constructed only through [`CompositeValuation::new`], which fixes
/// `total = brokerage + crypto + bullion` and refuses a total that does not
/// fit in a `Decimal`. Fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeValuation {
    timestamp: DateTime<Utc>,
    brokerage_value: Decimal,
    crypto_value: Decimal,
    bullion_value: Decimal,
    total_value: Decimal,
    conversion_rate: ConversionRate,
    reporting_currency: String,
}

impl CompositeValuation {
    pub fn new(
        timestamp: DateTime<Utc>,
        brokerage_value: Decimal,
        crypto_value: Decimal,
        bullion_value: Decimal,
        conversion_rate: ConversionRate,
        reporting_currency: impl Into<String>,
    ) -> Result<Self, AmountOverflow> {
        let total_value = brokerage_value
            .checked_add(crypto_value)
            .and_then(|sum| sum.checked_add(bullion_value))
            .ok_or(AmountOverflow("portfolio total"))?;

        Ok(Self {
            timestamp,
            brokerage_value,
            crypto_value,
            bullion_value,
            total_value,
            conversion_rate,
            reporting_currency: reporting_currency.into(),
        })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn brokerage_value(&self) -> Decimal {
        self.brokerage_value
    }

    pub fn crypto_value(&self) -> Decimal {
        self.crypto_value
    }

    pub fn bullion_value(&self) -> Decimal {
        self.bullion_value
    }

    pub fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub fn conversion_rate(&self) -> ConversionRate {
        self.conversion_rate
    }

    pub fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn total_is_sum_of_components() {
        let v = CompositeValuation::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            Decimal::from_str("500").unwrap(),
            Decimal::from_str("10407.6").unwrap(),
            Decimal::from_str("0.4").unwrap(),
            ConversionRate::new(Decimal::from_str("1.7346").unwrap()).unwrap(),
            "BGN",
        )
        .unwrap();

        assert_eq!(v.total_value(), Decimal::from_str("10908.0").unwrap());
        assert_eq!(
            v.total_value(),
            v.brokerage_value() + v.crypto_value() + v.bullion_value()
        );
    }

    #[test]
    fn total_that_does_not_fit_is_rejected() {
        let err = CompositeValuation::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
            Decimal::MAX,
            Decimal::ONE,
            Decimal::ZERO,
            ConversionRate::new(Decimal::ONE).unwrap(),
            "BGN",
        )
        .unwrap_err();

        assert_eq!(err, AmountOverflow("portfolio total"));
    }
}
