use std::path::Path;

use crate::config::ResolvedConfig;

pub fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "holdings_file": config.holdings_path.display().to_string(),
        "reporting_currency": config.reporting_currency,
        "usd_rate": config.usd_rate.to_string(),
        "schedule": format!("{:02}:{:02}", config.schedule.hour, config.schedule.minute),
        "notification_channels": config.notification_channels(),
        "sources": {
            "brokerage_live": config.sources.brokerage.live,
            "request_timeout": crate::duration::format_duration(config.sources.request_timeout),
        }
    })
}
