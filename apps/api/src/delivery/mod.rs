//! Outbound delivery of composed emails over SMTP.
//! Uses lettre's async transport; port 465 is implicit TLS, any other port STARTTLS.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::SmtpConfig;

/// Subject line of every delivered email.
pub const SUBJECT: &str = "Your Personalized Cold Email";

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("SMTP credentials are not configured (set SMTP_SENDER and SMTP_PASSWORD)")]
    NotConfigured,

    #[error("Invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

pub struct Mailer {
    config: SmtpConfig,
}

impl Mailer {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Whether both sender address and password are present.
    pub fn is_configured(&self) -> bool {
        self.config.sender.is_some() && self.config.password.is_some()
    }

    /// Builds the plain-text message from the configured sender to `to`.
    pub fn build_message(&self, to: &str, body: &str) -> Result<Message, DeliveryError> {
        let sender = self.config.sender.as_deref().ok_or(DeliveryError::NotConfigured)?;

        Ok(Message::builder()
            .from(parse_mailbox(sender)?)
            .to(parse_mailbox(to)?)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?)
    }

    pub async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
        let (Some(sender), Some(password)) = (&self.config.sender, &self.config.password) else {
            return Err(DeliveryError::NotConfigured);
        };

        let message = self.build_message(to, body)?;
        let credentials = Credentials::new(sender.clone(), password.clone());

        let builder = if self.config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
        };
        let transport = builder
            .port(self.config.port)
            .credentials(credentials)
            .build();

        transport.send(message).await?;

        info!("Email sent to {} via {}:{}", to, self.config.host, self.config.port);
        Ok(())
    }
}

/// Parses and validates a single address.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| DeliveryError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
