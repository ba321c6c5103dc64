use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::SnapshotRecord;

/// Summary statistics over a run of daily snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub days_tracked: usize,
    pub average_total: Decimal,
    pub best_day: NaiveDate,
    pub best_total: Decimal,
    pub worst_day: NaiveDate,
    pub worst_total: Decimal,
    /// Last total minus first total.
    pub growth: Decimal,
    /// Growth relative to the first total, in percent. Zero when the first
    /// total is zero or only one snapshot exists.
    pub growth_percentage: Decimal,
}

impl SnapshotStats {
    /// Returns `None` for an empty slice. Snapshots must be oldest first.
    pub fn from_snapshots(snapshots: &[SnapshotRecord]) -> Option<Self> {
        let first = snapshots.first()?;
        let last = snapshots.last()?;

        let mut best = first;
        let mut worst = first;
        let mut sum = Decimal::ZERO;

        for snapshot in snapshots {
            sum += snapshot.total_value;
            if snapshot.total_value > best.total_value {
                best = snapshot;
            }
            if snapshot.total_value < worst.total_value {
                worst = snapshot;
            }
        }

        let growth = last.total_value - first.total_value;
        let growth_percentage = if snapshots.len() > 1 && !first.total_value.is_zero() {
            growth / first.total_value * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        Some(Self {
            days_tracked: snapshots.len(),
            average_total: sum / Decimal::from(snapshots.len()),
            best_day: best.date,
            best_total: best.total_value,
            worst_day: worst.date,
            worst_total: worst.total_value,
            growth,
            growth_percentage,
        })
    }
}
