//! Daily portfolio snapshots.

mod json_file;
mod memory;
mod recorder;
mod stats;

pub use json_file::JsonFileSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use recorder::SnapshotRecorder;
pub use stats::SnapshotStats;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::valuation::CompositeValuation;

/// Persisted form of one day's valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub date: NaiveDate,
    pub brokerage_value: Decimal,
    pub crypto_value: Decimal,
    pub bullion_value: Decimal,
    pub total_value: Decimal,
    pub conversion_rate: Decimal,
    pub reporting_currency: String,
    pub created_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// Snapshot keyed by the local calendar day of the valuation.
    pub fn from_valuation(valuation: &CompositeValuation) -> Self {
        let timestamp = valuation.timestamp();
        Self {
            date: timestamp.with_timezone(&Local).date_naive(),
            brokerage_value: valuation.brokerage_value(),
            crypto_value: valuation.crypto_value(),
            bullion_value: valuation.bullion_value(),
            total_value: valuation.total_value(),
            conversion_rate: valuation.conversion_rate().value(),
            reporting_currency: valuation.reporting_currency().to_string(),
            created_at: timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Replaced,
}

/// Durable snapshot storage keyed by calendar day.
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert or replace the snapshot for `record.date`.
    async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<SaveOutcome>;

    async fn snapshot_for(&self, date: NaiveDate) -> Result<Option<SnapshotRecord>>;

    /// All snapshots, oldest first.
    async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>>;

    /// Remove snapshots strictly older than `cutoff`. Returns how many were removed.
    async fn delete_before(&self, cutoff: NaiveDate) -> Result<usize>;

    async fn latest_snapshot(&self) -> Result<Option<SnapshotRecord>> {
        Ok(self.list_snapshots().await?.pop())
    }

    /// Snapshots with `start <= date <= end`, oldest first.
    async fn snapshots_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SnapshotRecord>> {
        let mut snapshots = self.list_snapshots().await?;
        snapshots.retain(|s| s.date >= start && s.date <= end);
        Ok(snapshots)
    }
}
