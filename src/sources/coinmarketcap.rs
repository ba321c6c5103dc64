//! CoinMarketCap crypto spot prices.
//!
//! Uses the `/v1/cryptocurrency/quotes/latest` endpoint, which keys results
//! by the requested symbol and reports a quote per convert currency.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{
    decimal_from_f64, http_client, CryptoPriceSource, DEFAULT_REQUEST_TIMEOUT, QUOTE_CURRENCY,
};

const CMC_API_BASE: &str = "https://pro-api.coinmarketcap.com";

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    data: HashMap<String, CoinEntry>,
}

#[derive(Debug, Deserialize)]
struct CoinEntry {
    #[serde(default)]
    quote: HashMap<String, Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    price: Option<f64>,
}

pub struct CoinMarketCapPriceSource {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl CoinMarketCapPriceSource {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: http_client(DEFAULT_REQUEST_TIMEOUT),
            api_key,
            base_url: CMC_API_BASE.to_string(),
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
impl CryptoPriceSource for CoinMarketCapPriceSource {
    async fn spot_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        let symbol = symbol.to_uppercase();
        let url = format!("{}/v1/cryptocurrency/quotes/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str())])
            .header("Accept", "application/json")
            .header("X-CMC_PRO_API_KEY", self.api_key.expose_secret())
            .send()
            .await
            .context("CoinMarketCap request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("CoinMarketCap API error: {} - {}", status, body));
        }

        let data: QuotesResponse = response
            .json()
            .await
            .context("Failed to parse CoinMarketCap response")?;

        let price = data
            .data
            .get(&symbol)
            .and_then(|coin| coin.quote.get(QUOTE_CURRENCY))
            .and_then(|quote| quote.price);

        price.map(decimal_from_f64).transpose()
    }

    fn name(&self) -> &str {
        "coinmarketcap"
    }
}
