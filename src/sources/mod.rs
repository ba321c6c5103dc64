//! Valuation source adapters: one per asset class.
//!
//! Each adapter answers independently and may fail independently; the
//! aggregator decides what a failure means for the cycle.

pub mod coinmarketcap;
pub mod goldapi;
pub mod trading212;

pub use coinmarketcap::CoinMarketCapPriceSource;
pub use goldapi::GoldApiPriceSource;
pub use trading212::Trading212Source;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use tracing::warn;

use crate::holdings::HoldingsSet;

/// Currency every spot price is quoted in.
pub const QUOTE_CURRENCY: &str = "USD";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client with a whole-request timeout, shared by every adapter.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            warn!(error = %err, "Failed to build HTTP client with timeout; using defaults");
            reqwest::Client::new()
        })
}

/// Total brokerage account value, in the account's own currency.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerageValue {
    pub amount: Decimal,
    pub currency: String,
}

#[async_trait::async_trait]
pub trait BrokerageSource: Send + Sync {
    async fn fetch_value(&self) -> Result<BrokerageValue>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait CryptoPriceSource: Send + Sync {
    /// Current USD spot price for `symbol`, or `None` if the source does not
    /// know the symbol.
    async fn spot_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait BullionPriceSource: Send + Sync {
    /// Current spot price per unit of `metal`, quoted in `currency`.
    async fn spot_price(&self, metal: &str, currency: &str) -> Result<Option<Decimal>>;

    fn name(&self) -> &str;
}

/// USD value of all crypto holdings.
///
/// Any symbol without a price fails the whole sum; no symbol is skipped.
pub async fn sum_crypto_holdings(
    holdings: &HoldingsSet,
    prices: &dyn CryptoPriceSource,
) -> Result<Decimal> {
    let mut sum = Decimal::ZERO;

    for (symbol, quantity) in &holdings.crypto {
        let price = prices
            .spot_price(symbol)
            .await
            .with_context(|| format!("Could not price crypto holding {symbol}"))?
            .ok_or_else(|| anyhow!("{} returned no price for {symbol}", prices.name()))?;

        let value = quantity
            .checked_mul(price)
            .with_context(|| {
                format!("Value of {symbol} holding overflowed ({quantity} at {price})")
            })?;
        sum = sum
            .checked_add(value)
            .context("Crypto holdings total overflowed")?;
    }

    Ok(sum)
}

/// USD value of all bullion holdings. Same all-or-nothing policy as crypto.
pub async fn sum_bullion_holdings(
    holdings: &HoldingsSet,
    prices: &dyn BullionPriceSource,
) -> Result<Decimal> {
    let mut sum = Decimal::ZERO;

    for (metal, quantity) in &holdings.bullion {
        let price = prices
            .spot_price(metal, QUOTE_CURRENCY)
            .await
            .with_context(|| format!("Could not price bullion holding {metal}"))?
            .ok_or_else(|| anyhow!("{} returned no price for {metal}", prices.name()))?;

        let value = quantity
            .checked_mul(price)
            .with_context(|| {
                format!("Value of {metal} holding overflowed ({quantity} at {price})")
            })?;
        sum = sum
            .checked_add(value)
            .context("Bullion holdings total overflowed")?;
    }

    Ok(sum)
}

/// Stand-in for a source whose credentials are not configured.
///
/// Every call fails with the stored reason, so the aggregator's failure
/// policy applies exactly as it would to an outage.
#[derive(Debug, Clone)]
pub struct UnconfiguredSource {
    name: String,
    reason: String,
}

impl UnconfiguredSource {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }

    fn error(&self) -> anyhow::Error {
        anyhow!("{} is not configured: {}", self.name, self.reason)
    }
}

#[async_trait::async_trait]
impl BrokerageSource for UnconfiguredSource {
    async fn fetch_value(&self) -> Result<BrokerageValue> {
        Err(self.error())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait::async_trait]
impl CryptoPriceSource for UnconfiguredSource {
    async fn spot_price(&self, _symbol: &str) -> Result<Option<Decimal>> {
        Err(self.error())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait::async_trait]
impl BullionPriceSource for UnconfiguredSource {
    async fn spot_price(&self, _metal: &str, _currency: &str) -> Result<Option<Decimal>> {
        Err(self.error())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Convert a JSON float into a decimal through its shortest string form, so
/// `42850.12` stays `42850.12` instead of picking up binary noise.
pub(crate) fn decimal_from_f64(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        anyhow::bail!("Non-finite price: {value}");
    }
    Decimal::from_str(&value.to_string())
        .or_else(|_| Decimal::from_scientific(&format!("{value:e}")))
        .with_context(|| format!("Price out of range: {value}"))
}
