//! In-memory snapshot storage for testing.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::{SaveOutcome, SnapshotRecord, SnapshotStore};

#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<NaiveDate, SnapshotRecord>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save_snapshot(&self, record: &SnapshotRecord) -> Result<SaveOutcome> {
        let mut snapshots = self.snapshots.lock().await;
        Ok(match snapshots.insert(record.date, record.clone()) {
            Some(_) => SaveOutcome::Replaced,
            None => SaveOutcome::Created,
        })
    }

    async fn snapshot_for(&self, date: NaiveDate) -> Result<Option<SnapshotRecord>> {
        Ok(self.snapshots.lock().await.get(&date).cloned())
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        Ok(self.snapshots.lock().await.values().cloned().collect())
    }

    async fn delete_before(&self, cutoff: NaiveDate) -> Result<usize> {
        let mut snapshots = self.snapshots.lock().await;
        let kept = snapshots.split_off(&cutoff);
        let removed = snapshots.len();
        *snapshots = kept;
        Ok(removed)
    }
}
