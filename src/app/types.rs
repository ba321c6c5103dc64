use serde::Serialize;

use crate::format::format_decimal;
use crate::storage::{SnapshotRecord, SnapshotStats};
use crate::valuation::CompositeValuation;

/// JSON output for one valuation
#[derive(Debug, Serialize)]
pub struct ValuationOutput {
    pub timestamp: String,
    pub reporting_currency: String,
    pub conversion_rate: String,
    pub brokerage_value: String,
    pub crypto_value: String,
    pub bullion_value: String,
    pub total_value: String,
}

impl ValuationOutput {
    pub fn new(valuation: &CompositeValuation, decimals: u32) -> Self {
        Self {
            timestamp: valuation.timestamp().to_rfc3339(),
            reporting_currency: valuation.reporting_currency().to_string(),
            conversion_rate: valuation.conversion_rate().to_string(),
            brokerage_value: format_decimal(valuation.brokerage_value(), decimals),
            crypto_value: format_decimal(valuation.crypto_value(), decimals),
            bullion_value: format_decimal(valuation.bullion_value(), decimals),
            total_value: format_decimal(valuation.total_value(), decimals),
        }
    }
}

/// JSON output for a completed notification
#[derive(Debug, Serialize)]
pub struct SendOutput {
    pub channels: Vec<String>,
    pub valuation: ValuationOutput,
}

/// JSON output for a stored snapshot
#[derive(Debug, Serialize)]
pub struct SnapshotOutput {
    pub date: String,
    pub reporting_currency: String,
    pub brokerage_value: String,
    pub crypto_value: String,
    pub bullion_value: String,
    pub total_value: String,
    pub created_at: String,
}

impl SnapshotOutput {
    pub fn new(record: &SnapshotRecord, decimals: u32) -> Self {
        Self {
            date: record.date.to_string(),
            reporting_currency: record.reporting_currency.clone(),
            brokerage_value: format_decimal(record.brokerage_value, decimals),
            crypto_value: format_decimal(record.crypto_value, decimals),
            bullion_value: format_decimal(record.bullion_value, decimals),
            total_value: format_decimal(record.total_value, decimals),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// JSON output for history statistics
#[derive(Debug, Serialize)]
pub struct StatsOutput {
    pub days_tracked: usize,
    pub average_total: String,
    pub best_day: String,
    pub best_total: String,
    pub worst_day: String,
    pub worst_total: String,
    pub growth: String,
    pub growth_percentage: String,
}

impl StatsOutput {
    pub fn new(stats: &SnapshotStats, decimals: u32) -> Self {
        Self {
            days_tracked: stats.days_tracked,
            average_total: format_decimal(stats.average_total, decimals),
            best_day: stats.best_day.to_string(),
            best_total: format_decimal(stats.best_total, decimals),
            worst_day: stats.worst_day.to_string(),
            worst_total: format_decimal(stats.worst_total, decimals),
            growth: format_decimal(stats.growth, decimals),
            growth_percentage: format_decimal(stats.growth_percentage, 2),
        }
    }
}

/// JSON output for history cleanup
#[derive(Debug, Serialize)]
pub struct CleanupOutput {
    pub cutoff: String,
    pub deleted: usize,
}
