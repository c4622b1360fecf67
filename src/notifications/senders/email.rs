use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{NotificationSender, SenderError};
use crate::server::config::SmtpConfig;

const IMPLICIT_TLS_PORT: u16 = 465;

/// Sends plain-text mail through an SMTP relay.
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn new(config: &SmtpConfig) -> Result<Self, SenderError> {
        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| SenderError::InvalidConfiguration(format!("SMTP relay: {e}")))?
        .port(config.port);

        let builder = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => {
                builder.credentials(Credentials::new(user.clone(), pass.clone()))
            }
            _ => builder,
        };

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| SenderError::InvalidConfiguration(format!("SMTP_FROM: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|e| SenderError::InvalidConfiguration(format!("recipient {recipient}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| SenderError::SendFailed(format!("building message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| SenderError::SendFailed(e.to_string()))?;
        Ok(())
    }
}
