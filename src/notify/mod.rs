//! Notification fan-out.
//!
//! A [`Dispatcher`] owns an ordered list of channel slots and delivers one
//! message per slot for every valuation. Channels are attempted sequentially
//! in configured order; a failing channel never stops the others. All
//! failures of one dispatch are reported together in a [`DispatchError`].

pub mod email;
pub(crate) mod message;
pub mod sms;
pub mod telegram;

pub use email::{EmailChannel, MailTransport, SmtpMailer};
pub use message::{UpdateLines, MESSAGE_DECIMALS};
pub use sms::SmsChannel;
pub use telegram::TelegramChannel;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::valuation::CompositeValuation;

/// Channel used when none is configured.
pub const DEFAULT_CHANNEL: &str = "telegram";

/// A notification backend able to deliver a valuation summary.
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Identifier used in configuration and error reports (e.g. "telegram").
    fn name(&self) -> &str;

    async fn send(&self, valuation: &CompositeValuation) -> Result<()>;
}

/// One position in the configured channel order.
#[derive(Clone)]
pub enum ChannelSlot {
    Ready(Arc<dyn NotificationChannel>),
    /// A configured name that could not be turned into a channel (unknown
    /// identifier or missing credentials). Fails on every dispatch.
    Unresolved { name: String, reason: String },
}

impl ChannelSlot {
    pub fn unresolved(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unresolved {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Ready(channel) => channel.name(),
            Self::Unresolved { name, .. } => name,
        }
    }
}

impl fmt::Debug for ChannelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(channel) => f.debug_tuple("Ready").field(&channel.name()).finish(),
            Self::Unresolved { name, reason } => f
                .debug_struct("Unresolved")
                .field("name", name)
                .field("reason", reason)
                .finish(),
        }
    }
}

impl From<Arc<dyn NotificationChannel>> for ChannelSlot {
    fn from(channel: Arc<dyn NotificationChannel>) -> Self {
        Self::Ready(channel)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: String,
    pub message: String,
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.channel, self.message)
    }
}

/// Every channel that failed during one dispatch, in configured order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Notification errors: {}", join_failures(.failures))]
pub struct DispatchError {
    pub failures: Vec<ChannelFailure>,
}

impl DispatchError {
    pub fn failed_channels(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.channel.as_str()).collect()
    }
}

fn join_failures(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split a comma-separated channel list (as in `NOTIFICATION_METHODS`) into
/// lowercase identifiers. Blank input yields the default channel.
pub fn parse_channel_list(raw: &str) -> Vec<String> {
    let names: Vec<String> = raw
        .split(',')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        vec![DEFAULT_CHANNEL.to_string()]
    } else {
        names
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    slots: Vec<ChannelSlot>,
}

impl Dispatcher {
    pub fn new(slots: Vec<ChannelSlot>) -> Self {
        Self { slots }
    }

    pub fn from_channels(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self::new(channels.into_iter().map(ChannelSlot::Ready).collect())
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.slots.iter().map(ChannelSlot::name).collect()
    }

    pub fn slots(&self) -> &[ChannelSlot] {
        &self.slots
    }

    /// Send `valuation` through every configured channel.
    ///
    /// Returns `Ok(())` only if every channel succeeded.
    pub async fn dispatch(&self, valuation: &CompositeValuation) -> Result<(), DispatchError> {
        let mut failures = Vec::new();

        for slot in &self.slots {
            let outcome = match slot {
                ChannelSlot::Ready(channel) => channel
                    .send(valuation)
                    .await
                    .map_err(|err| format!("{err:#}")),
                ChannelSlot::Unresolved { reason, .. } => Err(reason.clone()),
            };

            match outcome {
                Ok(()) => info!(channel = slot.name(), "notification sent"),
                Err(message) => {
                    warn!(channel = slot.name(), error = %message, "notification failed");
                    failures.push(ChannelFailure {
                        channel: slot.name().to_string(),
                        message,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_channel_list_normalizes_names() {
        assert_eq!(
            parse_channel_list(" Telegram, SMS ,,email "),
            vec!["telegram", "sms", "email"]
        );
    }

    #[test]
    fn parse_channel_list_defaults_to_telegram() {
        assert_eq!(parse_channel_list(""), vec!["telegram"]);
        assert_eq!(parse_channel_list(" , "), vec!["telegram"]);
    }

    #[test]
    fn dispatch_error_lists_every_failure() {
        let err = DispatchError {
            failures: vec![
                ChannelFailure {
                    channel: "sms".to_string(),
                    message: "HTTP 401".to_string(),
                },
                ChannelFailure {
                    channel: "pager".to_string(),
                    message: "Unknown notification channel".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "Notification errors: sms: HTTP 401; pager: Unknown notification channel"
        );
        assert_eq!(err.failed_channels(), vec!["sms", "pager"]);
    }

    #[tokio::test]
    async fn unresolved_slot_fails_without_stopping_dispatch() {
        let dispatcher = Dispatcher::new(vec![
            ChannelSlot::unresolved("pager", "Unknown notification channel: pager"),
            ChannelSlot::unresolved("fax", "Unknown notification channel: fax"),
        ]);
        let valuation = message::tests::sample_valuation();

        let err = dispatcher.dispatch(&valuation).await.unwrap_err();
        assert_eq!(err.failed_channels(), vec!["pager", "fax"]);
    }

    #[tokio::test]
    async fn empty_dispatcher_succeeds() {
        let dispatcher = Dispatcher::default();
        let valuation = message::tests::sample_valuation();
        assert!(dispatcher.dispatch(&valuation).await.is_ok());
    }
}
