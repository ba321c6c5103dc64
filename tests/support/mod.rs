#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use worthwatch::notify::NotificationChannel;
use worthwatch::scheduler::CycleListener;
use worthwatch::sources::{BrokerageSource, BrokerageValue, BullionPriceSource, CryptoPriceSource};
use worthwatch::valuation::{AggregateError, CompositeValuation, ConversionRate, ValuationCycle};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn bgn_rate() -> ConversionRate {
    ConversionRate::new(dec("1.7346")).unwrap()
}

pub fn valuation(brokerage: &str, crypto: &str, bullion: &str) -> CompositeValuation {
    CompositeValuation::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap(),
        dec(brokerage),
        dec(crypto),
        dec(bullion),
        bgn_rate(),
        "BGN",
    )
    .unwrap()
}

pub struct FakeBrokerage {
    result: Result<BrokerageValue, String>,
    pub calls: AtomicUsize,
}

impl FakeBrokerage {
    pub fn ok(amount: &str) -> Self {
        Self::ok_in(amount, "BGN")
    }

    pub fn ok_in(amount: &str, currency: &str) -> Self {
        Self {
            result: Ok(BrokerageValue {
                amount: dec(amount),
                currency: currency.to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BrokerageSource for FakeBrokerage {
    async fn fetch_value(&self) -> Result<BrokerageValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|e| anyhow!(e))
    }

    fn name(&self) -> &str {
        "fake-brokerage"
    }
}

/// Price table for both crypto and bullion fakes. Symbols listed in
/// `failing` return an error; unknown symbols return `None`.
#[derive(Default)]
pub struct FakePrices {
    prices: HashMap<String, Decimal>,
    failing: Vec<String>,
    pub calls: AtomicUsize,
}

impl FakePrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: &str) -> Self {
        self.prices.insert(symbol.to_string(), dec(price));
        self
    }

    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    fn lookup(&self, symbol: &str) -> Result<Option<Decimal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| s == symbol) {
            return Err(anyhow!("price feed unavailable for {symbol}"));
        }
        Ok(self.prices.get(symbol).copied())
    }
}

#[async_trait]
impl CryptoPriceSource for FakePrices {
    async fn spot_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        self.lookup(symbol)
    }

    fn name(&self) -> &str {
        "fake-crypto"
    }
}

#[async_trait]
impl BullionPriceSource for FakePrices {
    async fn spot_price(&self, metal: &str, currency: &str) -> Result<Option<Decimal>> {
        assert_eq!(currency, "USD");
        self.lookup(metal)
    }

    fn name(&self) -> &str {
        "fake-bullion"
    }
}

/// Notification channel that records every attempt.
pub struct RecordingChannel {
    name: String,
    fail_with: Option<String>,
    sent: Mutex<Vec<CompositeValuation>>,
}

impl RecordingChannel {
    pub fn ok(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_with: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_with: Some(message.to_string()),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<CompositeValuation> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, valuation: &CompositeValuation) -> Result<()> {
        self.sent.lock().unwrap().push(valuation.clone());
        match &self.fail_with {
            Some(message) => Err(anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct RecordingListener {
    fail: bool,
    received: Mutex<Vec<CompositeValuation>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            received: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl CycleListener for RecordingListener {
    async fn on_notification_sent(&self, valuation: &CompositeValuation) -> Result<()> {
        self.received.lock().unwrap().push(valuation.clone());
        if self.fail {
            Err(anyhow!("disk full"))
        } else {
            Ok(())
        }
    }
}

/// Cycle returning a fixed outcome and signalling each run.
pub struct ScriptedCycle {
    outcome: Result<CompositeValuation, String>,
    runs: mpsc::UnboundedSender<()>,
    pub count: AtomicUsize,
}

impl ScriptedCycle {
    pub fn ok(valuation: CompositeValuation) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        Self::with_outcome(Ok(valuation))
    }

    pub fn failing(message: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        Self::with_outcome(Err(message.to_string()))
    }

    fn with_outcome(
        outcome: Result<CompositeValuation, String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (runs, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                outcome,
                runs,
                count: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    pub fn runs(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ValuationCycle for ScriptedCycle {
    async fn compute(&self) -> Result<CompositeValuation, AggregateError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let _ = self.runs.send(());
        self.outcome
            .clone()
            .map_err(|e| AggregateError::Crypto(anyhow!(e)))
    }
}
