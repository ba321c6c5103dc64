use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

use super::{App, CleanupOutput, SnapshotOutput, StatsOutput};
use crate::storage::SnapshotStats;

impl App {
    fn today(&self) -> NaiveDate {
        self.clock.local_now().date_naive()
    }

    /// Snapshots for the last `days` calendar days, today included, oldest
    /// first.
    pub async fn history_recent(&self, days: u32) -> Result<Vec<SnapshotOutput>> {
        let today = self.today();
        let start = today
            .checked_sub_days(Days::new(u64::from(days.max(1)) - 1))
            .context("History window is out of range")?;

        let snapshots = self.store.snapshots_between(start, today).await?;
        Ok(snapshots
            .iter()
            .map(|s| SnapshotOutput::new(s, self.decimals()))
            .collect())
    }

    pub async fn history_today(&self) -> Result<Option<SnapshotOutput>> {
        let snapshot = self.store.snapshot_for(self.today()).await?;
        Ok(snapshot.map(|s| SnapshotOutput::new(&s, self.decimals())))
    }

    pub async fn history_latest(&self) -> Result<Option<SnapshotOutput>> {
        let snapshot = self.store.latest_snapshot().await?;
        Ok(snapshot.map(|s| SnapshotOutput::new(&s, self.decimals())))
    }

    /// Statistics over every stored snapshot. `None` when nothing is stored.
    pub async fn history_stats(&self) -> Result<Option<StatsOutput>> {
        let snapshots = self.store.list_snapshots().await?;
        Ok(SnapshotStats::from_snapshots(&snapshots)
            .map(|stats| StatsOutput::new(&stats, self.decimals())))
    }

    /// Delete snapshots older than `keep_days` days.
    pub async fn history_cleanup(&self, keep_days: u32) -> Result<CleanupOutput> {
        let cutoff = self
            .today()
            .checked_sub_days(Days::new(u64::from(keep_days)))
            .context("Cleanup window is out of range")?;

        let deleted = self.store.delete_before(cutoff).await?;
        tracing::info!(%cutoff, deleted, "old snapshots removed");

        Ok(CleanupOutput {
            cutoff: cutoff.to_string(),
            deleted,
        })
    }
}
