//! Operations behind the `worthwatch` commands.
//!
//! [`App`] owns the fully wired valuation cycle, dispatcher and snapshot
//! store for one configuration. Each operation returns a serializable output
//! value; printing is left to the caller.

mod config;
mod factory;
mod history;
mod types;

pub use config::config_output;
pub use factory::{
    build_brokerage_source, build_bullion_source, build_channel, build_crypto_source,
    build_dispatcher, build_telegram_channel,
};
pub use types::{CleanupOutput, SendOutput, SnapshotOutput, StatsOutput, ValuationOutput};

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::holdings::HoldingsFile;
use crate::notify::Dispatcher;
use crate::scheduler::Scheduler;
use crate::storage::{JsonFileSnapshotStore, SnapshotRecorder, SnapshotStore};
use crate::valuation::{Aggregator, CompositeValuation, PortfolioValuer, ValuationCycle};

pub struct App {
    config: ResolvedConfig,
    cycle: Arc<dyn ValuationCycle>,
    dispatcher: Dispatcher,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Wire real sources, channels and file storage from `config`.
    pub fn from_config(config: ResolvedConfig) -> Result<Self> {
        let aggregator = Aggregator::new(
            build_brokerage_source(&config)?,
            build_crypto_source(&config)?,
            build_bullion_source(&config)?,
            config.usd_rate,
        )
        .with_reporting_currency(config.reporting_currency.clone());
        let cycle = Arc::new(PortfolioValuer::new(
            Arc::new(HoldingsFile::new(&config.holdings_path)),
            aggregator,
        ));
        let dispatcher = build_dispatcher(&config.notification_channels(), &config.notifications);
        let store = Arc::new(JsonFileSnapshotStore::new(&config.data_dir));

        Ok(Self::new(config, cycle, dispatcher, store))
    }

    pub fn new(
        config: ResolvedConfig,
        cycle: Arc<dyn ValuationCycle>,
        dispatcher: Dispatcher,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            config,
            cycle,
            dispatcher,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn cycle(&self) -> Arc<dyn ValuationCycle> {
        self.cycle.clone()
    }

    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        self.store.clone()
    }

    fn decimals(&self) -> u32 {
        self.config.display.currency_decimals
    }

    /// A scheduler over this app's channels that records a snapshot after
    /// every fully delivered notification.
    pub async fn scheduler(&self) -> Scheduler {
        let scheduler = Scheduler::new(self.dispatcher.clone()).with_clock(self.clock.clone());
        scheduler
            .set_on_notification_sent(Arc::new(SnapshotRecorder::new(self.store.clone())))
            .await;
        scheduler
    }

    /// Run one full cycle now: value, notify, record.
    pub async fn send_now(&self) -> Result<SendOutput> {
        let scheduler = self.scheduler().await;
        let valuation = scheduler
            .send_now(self.cycle.as_ref())
            .await
            .context("Notification cycle failed")?;

        Ok(SendOutput {
            channels: channel_names(&self.dispatcher),
            valuation: ValuationOutput::new(&valuation, self.decimals()),
        })
    }

    /// Compute the current valuation without notifying anyone.
    pub async fn value(&self) -> Result<ValuationOutput> {
        let valuation = self.cycle.compute().await?;
        Ok(ValuationOutput::new(&valuation, self.decimals()))
    }

    /// Fixed valuation used to verify channel setup.
    pub fn sample_valuation(&self) -> Result<CompositeValuation> {
        let valuation = CompositeValuation::new(
            self.clock.now(),
            Decimal::from(2000),
            Decimal::from(2000),
            Decimal::from(1000),
            self.config.usd_rate,
            self.config.reporting_currency.clone(),
        )?;
        Ok(valuation)
    }

    /// Send the sample valuation through every configured channel. Nothing is
    /// recorded.
    pub async fn send_test(&self) -> Result<SendOutput> {
        let valuation = self.sample_valuation()?;
        self.dispatcher.dispatch(&valuation).await?;

        Ok(SendOutput {
            channels: channel_names(&self.dispatcher),
            valuation: ValuationOutput::new(&valuation, self.decimals()),
        })
    }

    /// Verify the Telegram bot token and chat, sending a test message.
    pub async fn telegram_check(&self) -> Result<serde_json::Value> {
        let channel = build_telegram_channel(&self.config.notifications)?;
        channel.check_connection().await?;
        let chat = channel.chat_info().await?;
        Ok(serde_json::json!({
            "connection": "ok",
            "chat": chat,
        }))
    }
}

fn channel_names(dispatcher: &Dispatcher) -> Vec<String> {
    dispatcher
        .channel_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}
