//! Trading212 brokerage account value.
//!
//! Uses the account cash endpoint, whose `total` covers both free cash and
//! the current value of invested positions.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{
    decimal_from_f64, http_client, BrokerageSource, BrokerageValue, DEFAULT_REQUEST_TIMEOUT,
};

pub const DEMO_API_BASE: &str = "https://demo.trading212.com/api/v0";
pub const LIVE_API_BASE: &str = "https://live.trading212.com/api/v0";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountCash {
    #[serde(default)]
    free: f64,
    #[serde(default)]
    invested: f64,
    total: f64,
    #[serde(default)]
    currency_code: Option<String>,
}

pub struct Trading212Source {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    /// Currency assumed when the API omits `currencyCode`.
    account_currency: String,
}

impl Trading212Source {
    /// Creates a client against the demo environment.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            base_url: DEMO_API_BASE.to_string(),
            account_currency: "BGN".to_string(),
        }
    }

    pub fn live(mut self, live: bool) -> Self {
        self.base_url = if live { LIVE_API_BASE } else { DEMO_API_BASE }.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn with_account_currency(mut self, currency: impl Into<String>) -> Self {
        self.account_currency = currency.into().to_uppercase();
        self
    }

    async fn account_cash(&self) -> Result<AccountCash> {
        let url = format!("{}/equity/account/cash", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("Trading212 request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Trading212 API error: {} - {}", status, body));
        }

        response
            .json()
            .await
            .context("Failed to parse Trading212 account cash")
    }
}

#[async_trait::async_trait]
impl BrokerageSource for Trading212Source {
    async fn fetch_value(&self) -> Result<BrokerageValue> {
        let cash = self.account_cash().await?;
        let currency = cash
            .currency_code
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| self.account_currency.clone());

        tracing::debug!(
            free = cash.free,
            invested = cash.invested,
            total = cash.total,
            currency = %currency,
            "fetched Trading212 account cash"
        );

        Ok(BrokerageValue {
            amount: decimal_from_f64(cash.total)?,
            currency,
        })
    }

    fn name(&self) -> &str {
        "trading212"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_cash_response() {
        let body = r#"{
            "blocked": 0,
            "free": 120.5,
            "invested": 4300.25,
            "pieCash": 0,
            "ppl": 80.1,
            "result": 12.3,
            "total": 4500.85,
            "currencyCode": "BGN"
        }"#;

        let cash: AccountCash = serde_json::from_str(body).unwrap();
        assert_eq!(cash.total, 4500.85);
        assert_eq!(cash.currency_code.as_deref(), Some("BGN"));
    }

    #[test]
    fn live_switches_base_url() {
        let source = Trading212Source::new(SecretString::new("k".into())).live(true);
        assert_eq!(source.base_url, LIVE_API_BASE);
        let source = source.live(false);
        assert_eq!(source.base_url, DEMO_API_BASE);
    }
}
