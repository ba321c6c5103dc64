use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::config::{EmailConfig, NotificationsConfig, ResolvedConfig};
use crate::notify::{
    ChannelSlot, Dispatcher, EmailChannel, NotificationChannel, SmsChannel, SmtpMailer,
    TelegramChannel,
};
use crate::notify::email::DEFAULT_SMTP_PORT;
use crate::secrets::{env_secret, require_env_secret};
use crate::sources::{
    BrokerageSource, BullionPriceSource, CoinMarketCapPriceSource, CryptoPriceSource,
    GoldApiPriceSource, Trading212Source, UnconfiguredSource,
};

/// A file setting, falling back to the environment variable `var`.
fn setting(value: &Option<String>, var: &str) -> Option<String> {
    value
        .clone()
        .or_else(|| std::env::var(var).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_setting(value: &Option<String>, var: &str, key: &str) -> Result<String> {
    setting(value, var).ok_or_else(|| anyhow!("{key} is not configured (or set {var})"))
}

pub fn build_brokerage_source(config: &ResolvedConfig) -> Result<Arc<dyn BrokerageSource>> {
    let brokerage = &config.sources.brokerage;
    let Some(api_key) = env_secret(&brokerage.api_key_env)? else {
        return Ok(Arc::new(UnconfiguredSource::new(
            "trading212",
            format!("{} is not set", brokerage.api_key_env),
        )));
    };

    let mut source = Trading212Source::new(api_key)
        .live(brokerage.live)
        .with_timeout(config.sources.request_timeout)
        .with_account_currency(
            brokerage
                .account_currency
                .clone()
                .unwrap_or_else(|| config.reporting_currency.clone()),
        );
    if let Some(base_url) = &brokerage.base_url {
        source = source.with_base_url(base_url.clone());
    }
    Ok(Arc::new(source))
}

pub fn build_crypto_source(config: &ResolvedConfig) -> Result<Arc<dyn CryptoPriceSource>> {
    let crypto = &config.sources.crypto;
    let Some(api_key) = env_secret(&crypto.api_key_env)? else {
        return Ok(Arc::new(UnconfiguredSource::new(
            "coinmarketcap",
            format!("{} is not set", crypto.api_key_env),
        )));
    };

    let mut source =
        CoinMarketCapPriceSource::new(api_key).with_timeout(config.sources.request_timeout);
    if let Some(base_url) = &crypto.base_url {
        source = source.with_base_url(base_url.clone());
    }
    Ok(Arc::new(source))
}

pub fn build_bullion_source(config: &ResolvedConfig) -> Result<Arc<dyn BullionPriceSource>> {
    let bullion = &config.sources.bullion;
    let Some(api_key) = env_secret(&bullion.api_key_env)? else {
        return Ok(Arc::new(UnconfiguredSource::new(
            "goldapi",
            format!("{} is not set", bullion.api_key_env),
        )));
    };

    let mut source = GoldApiPriceSource::new(api_key).with_timeout(config.sources.request_timeout);
    if let Some(base_url) = &bullion.base_url {
        source = source.with_base_url(base_url.clone());
    }
    Ok(Arc::new(source))
}

pub fn build_telegram_channel(config: &NotificationsConfig) -> Result<TelegramChannel> {
    let telegram = &config.telegram;
    let token = require_env_secret(&telegram.bot_token_env)?;
    let chat_id = required_setting(&telegram.chat_id, "TELEGRAM_CHAT_ID", "telegram.chat_id")?;

    let mut channel = TelegramChannel::new(token, chat_id);
    if let Some(base_url) = &telegram.base_url {
        channel = channel.with_base_url(base_url.clone());
    }
    Ok(channel)
}

fn build_sms_channel(config: &NotificationsConfig) -> Result<SmsChannel> {
    let sms = &config.sms;
    let token = require_env_secret(&sms.auth_token_env)?;
    let sid = required_setting(&sms.account_sid, "TWILIO_ACCOUNT_SID", "sms.account_sid")?;
    let from = required_setting(&sms.from, "TWILIO_FROM_NUMBER", "sms.from")?;
    let to = required_setting(&sms.to, "TWILIO_TO_NUMBER", "sms.to")?;

    let mut channel = SmsChannel::new(sid, token, from, to);
    if let Some(base_url) = &sms.base_url {
        channel = channel.with_base_url(base_url.clone());
    }
    Ok(channel)
}

fn smtp_port(config: &EmailConfig) -> Result<u16> {
    if let Some(port) = config.port {
        return Ok(port);
    }
    match setting(&None, "SMTP_PORT") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid SMTP_PORT {raw:?}")),
        None => Ok(DEFAULT_SMTP_PORT),
    }
}

fn build_email_channel(config: &NotificationsConfig) -> Result<EmailChannel> {
    let email = &config.email;
    let host = required_setting(&email.host, "SMTP_HOST", "email.host")?;
    let username = required_setting(&email.username, "SMTP_USERNAME", "email.username")?;
    let password = require_env_secret(&email.password_env)?;
    let port = smtp_port(email)?;
    let from = setting(&email.from, "FROM_EMAIL").unwrap_or_else(|| username.clone());
    let to = setting(&email.to, "TO_EMAIL");

    let mailer = SmtpMailer::new(&host, port, &username, &password)?;
    EmailChannel::new(Arc::new(mailer), &from, to.as_deref())
}

/// Build the transport for one configured channel name.
pub fn build_channel(
    name: &str,
    config: &NotificationsConfig,
) -> Result<Arc<dyn NotificationChannel>> {
    let channel: Arc<dyn NotificationChannel> = match name {
        "telegram" => Arc::new(build_telegram_channel(config)?),
        "sms" => Arc::new(build_sms_channel(config)?),
        "email" => Arc::new(build_email_channel(config)?),
        other => return Err(anyhow!("Unknown notification method: {other}")),
    };
    Ok(channel)
}

/// Build a dispatcher over `names`, in order.
///
/// A name that cannot be built keeps its slot as an unresolved channel, so it
/// is reported on every dispatch instead of being dropped.
pub fn build_dispatcher(names: &[String], config: &NotificationsConfig) -> Dispatcher {
    let slots = names
        .iter()
        .map(|name| match build_channel(name, config) {
            Ok(channel) => ChannelSlot::Ready(channel),
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(channel = %name, error = %reason, "notification channel unavailable");
                ChannelSlot::unresolved(name.clone(), reason)
            }
        })
        .collect();
    Dispatcher::new(slots)
}
