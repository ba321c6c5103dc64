//! SMS through the Twilio Messages API.

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};

use super::{NotificationChannel, UpdateLines};
use crate::valuation::CompositeValuation;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

pub struct SmsChannel {
    client: reqwest::Client,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    to_number: String,
    base_url: String,
}

impl SmsChannel {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from_number: impl Into<String>,
        to_number: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
            to_number: to_number.into(),
            base_url: TWILIO_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn format_update(valuation: &CompositeValuation) -> String {
        let lines = UpdateLines::from_valuation(valuation);
        format!(
            "Daily Investment Update\n\n\
             Brokerage: {}\n\
             Crypto: {}\n\
             Bullion: {}\n\n\
             Total: {}",
            lines.brokerage, lines.crypto, lines.bullion, lines.total
        )
    }

    pub async fn send_sms(&self, body: &str) -> Result<()> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );
        let form = [
            ("To", self.to_number.as_str()),
            ("From", self.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .context("Failed to send SMS")?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Twilio API error: {} - {}", status, body));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> &str {
        "sms"
    }

    async fn send(&self, valuation: &CompositeValuation) -> Result<()> {
        self.send_sms(&Self::format_update(valuation)).await
    }
}
