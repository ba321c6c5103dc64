use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::{SaveOutcome, SnapshotRecord, SnapshotStore};
use crate::scheduler::CycleListener;
use crate::valuation::CompositeValuation;

/// Persists every successfully dispatched valuation as that day's snapshot.
pub struct SnapshotRecorder {
    store: Arc<dyn SnapshotStore>,
}

impl SnapshotRecorder {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl CycleListener for SnapshotRecorder {
    async fn on_notification_sent(&self, valuation: &CompositeValuation) -> Result<()> {
        let record = SnapshotRecord::from_valuation(valuation);
        let outcome = self
            .store
            .save_snapshot(&record)
            .await
            .with_context(|| format!("Failed to save snapshot for {}", record.date))?;

        match outcome {
            SaveOutcome::Created => info!(date = %record.date, total = %record.total_value, "snapshot saved"),
            SaveOutcome::Replaced => info!(date = %record.date, total = %record.total_value, "snapshot replaced"),
        }
        Ok(())
    }
}
