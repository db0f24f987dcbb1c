use crate::config::EmailSettings;
use crate::domain::model::{ExpiryAlert, NotificationTarget};
use crate::domain::ports::NotificationSink;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

fn dispatch_err(target: &str, err: impl std::fmt::Display) -> TrackerError {
    TrackerError::DispatchFailure {
        target: target.to_string(),
        message: err.to_string(),
    }
}

/// Builds the alert email. Split out so it can be checked without a relay.
pub fn compose(from: &str, to: &str, alert: &ExpiryAlert) -> Result<Message> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| dispatch_err(from, format!("bad sender address: {}", e)))?;
    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| dispatch_err(to, format!("bad recipient address: {}", e)))?;

    Message::builder()
        .from(from)
        .to(to_mailbox)
        .subject(alert.subject())
        .header(ContentType::TEXT_PLAIN)
        .body(alert.body())
        .map_err(|e| dispatch_err(to, e))
}

/// Sends alerts over authenticated SMTP (STARTTLS/TLS relay).
pub struct SmtpEmailSink {
    sender: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSink {
    pub fn new(settings: &EmailSettings) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| TrackerError::ConfigError {
                message: format!("SMTP relay {}: {}", settings.smtp_host, e),
            })?
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            sender: settings.user.clone(),
            transport,
        })
    }
}

#[async_trait]
impl NotificationSink for SmtpEmailSink {
    fn accepts(&self, target: &NotificationTarget) -> bool {
        matches!(target, NotificationTarget::Email(_))
    }

    async fn deliver(&self, target: &NotificationTarget, alert: &ExpiryAlert) -> Result<()> {
        let NotificationTarget::Email(address) = target else {
            return Err(dispatch_err(&target.label(), "not an email target"));
        };

        let message = compose(&self.sender, address, alert)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| dispatch_err(&target.label(), e))?;

        tracing::info!("📧 Sent expiry alert for {} to {}", alert.product_name, address);
        Ok(())
    }
}
