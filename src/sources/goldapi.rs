//! goldapi.io bullion spot prices (`GET <base>/<metal>/<currency>`).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{decimal_from_f64, http_client, BullionPriceSource, DEFAULT_REQUEST_TIMEOUT};

const GOLDAPI_BASE: &str = "https://www.goldapi.io/api";

#[derive(Debug, Deserialize)]
struct MetalPriceResponse {
    price: Option<f64>,
}

pub struct GoldApiPriceSource {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GoldApiPriceSource {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            base_url: GOLDAPI_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }
}

#[async_trait::async_trait]
impl BullionPriceSource for GoldApiPriceSource {
    async fn spot_price(&self, metal: &str, currency: &str) -> Result<Option<Decimal>> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            metal.to_uppercase(),
            currency.to_uppercase()
        );

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("x-access-token", self.api_key.expose_secret())
            .send()
            .await
            .context("goldapi.io request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("goldapi.io API error: {} - {}", status, body));
        }

        let data: MetalPriceResponse = response
            .json()
            .await
            .context("Failed to parse goldapi.io response")?;

        data.price.map(decimal_from_f64).transpose()
    }

    fn name(&self) -> &str {
        "goldapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metal_price_response() {
        let body = r#"{
            "timestamp": 1718000000,
            "metal": "XAU",
            "currency": "USD",
            "exchange": "FOREXCOM",
            "symbol": "FOREXCOM:XAUUSD",
            "prev_close_price": 2301.1,
            "price": 2312.45,
            "ch": 11.35,
            "chp": 0.49,
            "price_gram_24k": 74.35
        }"#;

        let data: MetalPriceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(data.price, Some(2312.45));
    }
}
