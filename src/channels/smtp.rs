//! Outbound mail: SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::config::MailConfig;
use crate::error::ChannelError;
use crate::workflow::ports::Notifier;

/// STARTTLS SMTP notifier. One delivery attempt per call, no retries.
pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn build_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<Message, ChannelError> {
        let from = self
            .config
            .address
            .parse()
            .map_err(|e| ChannelError::InvalidAddress(format!("{}: {e}", self.config.address)))?;
        let to = recipient
            .parse()
            .map_err(|e| ChannelError::InvalidAddress(format!("{recipient}: {e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ChannelError::SendFailed(format!("failed to build email: {e}")))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        let email = self.build_message(recipient, subject, body)?;

        let creds = Credentials::new(
            self.config.address.clone(),
            self.config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::starttls_relay(&self.config.smtp_host)
            .map_err(|e| ChannelError::SendFailed(format!("SMTP relay error: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        transport
            .send(&email)
            .map_err(|e| ChannelError::SendFailed(format!("SMTP send failed: {e}")))?;

        info!(recipient = %recipient, "Response email sent");
        Ok(())
    }
}
