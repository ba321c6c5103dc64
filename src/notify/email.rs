//! Email over SMTP.
//!
//! Port 465 uses implicit TLS; any other port (587 by default) upgrades with
//! STARTTLS before authenticating.

use std::sync::Arc;

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};

use super::{NotificationChannel, UpdateLines};
use crate::valuation::CompositeValuation;

pub const UPDATE_SUBJECT: &str = "Daily Investment Update";
pub const DEFAULT_SMTP_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

/// Hands a finished message to a mail server.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<()>;
}

/// Authenticated SMTP submission.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, username: &str, password: &SecretString) -> Result<Self> {
        let builder = if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .with_context(|| format!("Invalid SMTP host {host}"))?;

        let credentials = Credentials::new(
            username.to_string(),
            password.expose_secret().to_string(),
        );

        Ok(Self {
            transport: builder.port(port).credentials(credentials).build(),
        })
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: Message) -> Result<()> {
        self.transport
            .send(message)
            .await
            .context("Failed to send email")?;
        Ok(())
    }
}

pub struct EmailChannel {
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    /// `to` falls back to `from` when not given, which sends the update to
    /// the operator's own mailbox.
    pub fn new(transport: Arc<dyn MailTransport>, from: &str, to: Option<&str>) -> Result<Self> {
        let from: Mailbox = from
            .trim()
            .parse()
            .with_context(|| format!("Invalid sender address {from:?}"))?;
        let to = match to.map(str::trim).filter(|t| !t.is_empty()) {
            Some(to) => to
                .parse()
                .with_context(|| format!("Invalid recipient address {to:?}"))?,
            None => from.clone(),
        };

        Ok(Self {
            transport,
            from,
            to,
        })
    }

    pub fn recipient(&self) -> &Mailbox {
        &self.to
    }

    pub fn format_update(valuation: &CompositeValuation) -> String {
        let lines = UpdateLines::from_valuation(valuation);
        format!(
            "Good morning! Here's your daily portfolio update:\n\n\
             Portfolio Breakdown:\n\
             Brokerage: {}\n\
             Crypto: {}\n\
             Bullion: {}\n\n\
             Total Investment Worth: {}\n\n\
             ---\n\
             This is an automated daily update from worthwatch.",
            lines.brokerage, lines.crypto, lines.bullion, lines.total
        )
    }

    pub async fn send_email(&self, subject: &str, text: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(text.to_string())
            .context("Failed to build email")?;

        self.transport.deliver(message).await
    }
}

#[async_trait::async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, valuation: &CompositeValuation) -> Result<()> {
        self.send_email(UPDATE_SUBJECT, &Self::format_update(valuation))
            .await
    }
}
