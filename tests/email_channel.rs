mod support;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lettre::Message;
use support::valuation;
use worthwatch::notify::{ChannelSlot, Dispatcher, EmailChannel, MailTransport, NotificationChannel};

/// Transport that keeps every message instead of talking to a server.
#[derive(Default)]
struct RecordingMailer {
    fail: bool,
    messages: Mutex<Vec<Message>>,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn deliver(&self, message: Message) -> Result<()> {
        self.messages.lock().unwrap().push(message);
        if self.fail {
            Err(anyhow!("Failed to send email: 535 authentication failed"))
        } else {
            Ok(())
        }
    }
}

#[tokio::test]
async fn sends_daily_update_to_recipient() -> Result<()> {
    let mailer = Arc::new(RecordingMailer::default());
    let channel = EmailChannel::new(mailer.clone(), "me@example.com", Some("family@example.com"))?;

    channel.send(&valuation("500", "10407.6", "0")).await?;

    let messages = mailer.messages();
    assert_eq!(messages.len(), 1);

    let envelope = messages[0].envelope();
    assert_eq!(envelope.from().unwrap().to_string(), "me@example.com");
    assert_eq!(envelope.to()[0].to_string(), "family@example.com");

    let raw = String::from_utf8(messages[0].formatted())?;
    assert!(raw.contains("Subject: Daily Investment Update"), "message was: {raw}");
    assert!(raw.contains("Total Investment Worth: 10907.60 BGN"), "message was: {raw}");
    assert!(raw.contains("Brokerage: 500.00 BGN"), "message was: {raw}");

    Ok(())
}

#[tokio::test]
async fn sends_to_self_without_recipient() -> Result<()> {
    let mailer = Arc::new(RecordingMailer::default());
    let channel = EmailChannel::new(mailer.clone(), "me@example.com", None)?;

    channel.send(&valuation("1", "2", "3")).await?;

    let envelope = mailer.messages()[0].envelope().clone();
    assert_eq!(envelope.to()[0].to_string(), "me@example.com");

    Ok(())
}

#[tokio::test]
async fn transport_failure_is_a_channel_failure() {
    let mailer = Arc::new(RecordingMailer::failing());
    let email = EmailChannel::new(mailer.clone(), "me@example.com", None).unwrap();
    let dispatcher = Dispatcher::new(vec![ChannelSlot::Ready(
        Arc::new(email) as Arc<dyn NotificationChannel>
    )]);

    let err = dispatcher
        .dispatch(&valuation("1", "2", "3"))
        .await
        .unwrap_err();

    assert_eq!(err.failed_channels(), vec!["email"]);
    assert!(err.to_string().contains("535 authentication failed"));
    assert_eq!(mailer.messages().len(), 1);
}
