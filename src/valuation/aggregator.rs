use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{convert, AmountOverflow, CompositeValuation, ConversionRate};
use crate::clock::{Clock, SystemClock};
use crate::holdings::{HoldingsSet, HoldingsSource};
use crate::sources::{
    sum_bullion_holdings, sum_crypto_holdings, BrokerageSource, BullionPriceSource,
    CryptoPriceSource,
};

/// Failures that abort a valuation cycle. No partial valuation is produced.
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Failed to load holdings: {0:#}")]
    Holdings(anyhow::Error),

    #[error("Crypto valuation failed: {0:#}")]
    Crypto(anyhow::Error),

    #[error("Bullion valuation failed: {0:#}")]
    Bullion(anyhow::Error),

    #[error(transparent)]
    Overflow(#[from] AmountOverflow),
}

pub struct Aggregator {
    brokerage: Arc<dyn BrokerageSource>,
    crypto: Arc<dyn CryptoPriceSource>,
    bullion: Arc<dyn BullionPriceSource>,
    rate: ConversionRate,
    reporting_currency: String,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(
        brokerage: Arc<dyn BrokerageSource>,
        crypto: Arc<dyn CryptoPriceSource>,
        bullion: Arc<dyn BullionPriceSource>,
        rate: ConversionRate,
    ) -> Self {
        Self {
            brokerage,
            crypto,
            bullion,
            rate,
            reporting_currency: "BGN".to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_reporting_currency(mut self, currency: impl Into<String>) -> Self {
        self.reporting_currency = currency.into().to_uppercase();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn reporting_currency(&self) -> &str {
        &self.reporting_currency
    }

    /// Value `holdings` plus the brokerage account in the reporting currency.
    ///
    /// The three sources are queried concurrently and all of them are awaited
    /// before a result is produced. A brokerage failure is logged and counted
    /// as zero; a crypto or bullion failure is returned as an error.
    pub async fn aggregate(
        &self,
        holdings: &HoldingsSet,
    ) -> Result<CompositeValuation, AggregateError> {
        let (brokerage, crypto_usd, bullion_usd) = tokio::join!(
            self.brokerage.fetch_value(),
            sum_crypto_holdings(holdings, self.crypto.as_ref()),
            sum_bullion_holdings(holdings, self.bullion.as_ref()),
        );

        let crypto_usd = crypto_usd.map_err(AggregateError::Crypto)?;
        let bullion_usd = bullion_usd.map_err(AggregateError::Bullion)?;

        // Brokerage is reported in the deployment's reporting currency and is
        // added without conversion.
        let brokerage_value = match brokerage {
            Ok(value) => {
                if !value.currency.eq_ignore_ascii_case(&self.reporting_currency) {
                    warn!(
                        source = self.brokerage.name(),
                        account_currency = %value.currency,
                        reporting_currency = %self.reporting_currency,
                        "brokerage account currency differs from reporting currency; using value unconverted"
                    );
                }
                value.amount
            }
            Err(err) => {
                warn!(
                    source = self.brokerage.name(),
                    error = %format!("{err:#}"),
                    "brokerage value unavailable; counting it as zero"
                );
                Decimal::ZERO
            }
        };

        let crypto_value =
            convert(crypto_usd, self.rate).map_err(|err| AggregateError::Crypto(err.into()))?;
        let bullion_value =
            convert(bullion_usd, self.rate).map_err(|err| AggregateError::Bullion(err.into()))?;

        debug!(
            %brokerage_value,
            %crypto_usd,
            %bullion_usd,
            rate = %self.rate,
            "aggregated portfolio components"
        );

        Ok(CompositeValuation::new(
            self.clock.now(),
            brokerage_value,
            crypto_value,
            bullion_value,
            self.rate,
            self.reporting_currency.clone(),
        )?)
    }
}

/// One "produce a valuation" step, as driven by the scheduler.
#[async_trait::async_trait]
pub trait ValuationCycle: Send + Sync {
    async fn compute(&self) -> Result<CompositeValuation, AggregateError>;
}

/// Reloads holdings and aggregates them on every cycle.
pub struct PortfolioValuer {
    holdings: Arc<dyn HoldingsSource>,
    aggregator: Aggregator,
}

impl PortfolioValuer {
    pub fn new(holdings: Arc<dyn HoldingsSource>, aggregator: Aggregator) -> Self {
        Self {
            holdings,
            aggregator,
        }
    }
}

#[async_trait::async_trait]
impl ValuationCycle for PortfolioValuer {
    async fn compute(&self) -> Result<CompositeValuation, AggregateError> {
        let holdings = self
            .holdings
            .load()
            .await
            .map_err(AggregateError::Holdings)?;
        self.aggregator.aggregate(&holdings).await
    }
}
