//! Telegram Bot API transport.

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::{NotificationChannel, UpdateLines};
use crate::valuation::CompositeValuation;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_notification: bool,
    disable_web_page_preview: bool,
}

pub struct TelegramChannel {
    client: reqwest::Client,
    bot_token: SecretString,
    chat_id: String,
    base_url: String,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
            chat_id: chat_id.into(),
            base_url: TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        )
    }

    /// Markdown body for a daily update.
    pub fn format_update(valuation: &CompositeValuation) -> String {
        let lines = UpdateLines::from_valuation(valuation);
        format!(
            "*Daily Investment Update*\n\n\
             - Brokerage: `{}`\n\
             - Crypto: `{}`\n\
             - Bullion: `{}`\n\n\
             *Total: {}*\n",
            lines.brokerage, lines.crypto, lines.bullion, lines.total
        )
    }

    pub async fn send_text(&self, text: &str) -> Result<()> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_notification: false,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .context("Failed to send Telegram message")?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram API error: {} - {}", status, body));
        }

        Ok(())
    }

    /// Verify the bot token with `getMe`, then send a short test message.
    pub async fn check_connection(&self) -> Result<()> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .context("Failed to get Telegram bot info")?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram getMe failed: {} - {}", status, body));
        }

        self.send_text(
            "*Test Notification*\n\nThis is a test message to check if notifications are working.",
        )
        .await
    }

    /// Raw `getChat` payload for the configured chat.
    pub async fn chat_info(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(self.method_url("getChat"))
            .json(&serde_json::json!({ "chat_id": self.chat_id }))
            .send()
            .await
            .context("Failed to get Telegram chat info")?;

        if response.status() != reqwest::StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram getChat failed: {} - {}", status, body));
        }

        response
            .json()
            .await
            .context("Failed to parse Telegram chat info")
    }
}

#[async_trait::async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, valuation: &CompositeValuation) -> Result<()> {
        self.send_text(&Self::format_update(valuation)).await
    }
}
