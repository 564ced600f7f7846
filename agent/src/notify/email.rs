//! SMTP delivery of deployment notices

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::errors::AgentError;
use crate::notify::{DeploymentNotice, Notifier};
use crate::storage::settings::NotifySettings;

/// Sends notices by email through an SMTP relay
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    on_success: bool,
    on_error: bool,
}

impl EmailNotifier {
    pub fn new(settings: &NotifySettings) -> Result<Self, AgentError> {
        let from = parse_mailbox("notify.from", &settings.from)?;
        let to = parse_mailbox("notify.email", &settings.email)?;

        let host = settings
            .smtp_host
            .as_deref()
            .ok_or_else(|| AgentError::ConfigError("notify.smtp_host is not set".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| AgentError::ConfigError(format!("invalid SMTP relay {}: {}", host, e)))?
            .port(settings.smtp_port);
        if let (Some(user), Some(password)) = (&settings.smtp_user, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            to,
            on_success: settings.on_success,
            on_error: settings.on_error,
        })
    }

    fn wants(&self, notice: &DeploymentNotice) -> bool {
        if notice.is_success() {
            self.on_success
        } else {
            self.on_error
        }
    }
}

fn parse_mailbox(field: &str, value: &str) -> Result<Mailbox, AgentError> {
    value
        .parse()
        .map_err(|e| AgentError::ConfigError(format!("invalid {} address {}: {}", field, value, e)))
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notice: &DeploymentNotice) -> Result<(), AgentError> {
        if !self.wants(notice) {
            debug!("Notification for this outcome is disabled");
            return Ok(());
        }

        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notice.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body())
            .map_err(|e| AgentError::NotifyError(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AgentError::NotifyError(format!("failed to send email: {}", e)))?;
        Ok(())
    }
}
