use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::SmtpConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    bcc: Vec<Mailbox>,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self> {
        let sender: Mailbox = config
            .sender
            .parse()
            .with_context(|| format!("invalid SMTP sender '{}'", config.sender))?;
        let bcc = config
            .bcc_recipients
            .iter()
            .map(|raw| {
                raw.parse::<Mailbox>()
                    .with_context(|| format!("invalid BCC recipient '{raw}'"))
            })
            .collect::<Result<Vec<_>>>()?;

        let _ = rustls::crypto::ring::default_provider().install_default();
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .with_context(|| format!("failed to configure SMTP relay {}", config.host))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder
                .credentials(Credentials::new(
                    config.username.clone(),
                    config.password.clone(),
                ))
                .authentication(vec![Mechanism::Plain]);
        }

        Ok(Self {
            transport: builder.build(),
            sender,
            bcc,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let recipient: Mailbox = email
            .to
            .parse()
            .with_context(|| format!("invalid recipient '{}'", email.to))?;

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML);
        for bcc in &self.bcc {
            builder = builder.bcc(bcc.clone());
        }
        let message = builder
            .body(email.html_body)
            .context("failed to build email message")?;

        self.transport
            .send(message)
            .await
            .context("failed to deliver email over SMTP")?;
        Ok(())
    }
}

/// Used when no SMTP relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "smtp disabled, email not sent");
        Ok(())
    }
}
