//! Outbound mail — SMTP via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::info;

use crate::error::MailError;
use crate::mail::MailConfig;

/// Outbound email seam. The human gate and the post-reply task only see this.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// SMTP mailer. lettre's `SmtpTransport` is blocking, so each send runs in
/// `spawn_blocking`.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if to.trim().is_empty() || subject.trim().is_empty() || body.trim().is_empty() {
            return Err(MailError::InvalidMessage(
                "empty to/subject/body".to_string(),
            ));
        }

        let config = self.config.clone();
        let to = to.to_string();
        let subject = subject.to_string();
        let body = body.to_string();

        let result = tokio::task::spawn_blocking(move || send_smtp(&config, &to, &subject, &body))
            .await
            .map_err(|e| MailError::SendFailed(format!("send task panicked: {e}")))?;
        result
    }
}

fn send_smtp(config: &MailConfig, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
    let creds = Credentials::new(
        config.username.clone(),
        config.password.expose_secret().to_string(),
    );

    let transport = SmtpTransport::relay(&config.smtp_host)
        .map_err(|e| MailError::SendFailed(format!("SMTP relay error: {e}")))?
        .port(config.smtp_port)
        .credentials(creds)
        .build();

    let email = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e| MailError::InvalidMessage(format!("from address: {e}")))?,
        )
        .to(to
            .parse()
            .map_err(|e| MailError::InvalidMessage(format!("to address: {e}")))?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| MailError::InvalidMessage(format!("message build: {e}")))?;

    transport.send(&email).map_err(|e| map_send_error(to, &e))?;

    info!("Email sent to {to}");
    Ok(())
}

fn map_send_error(to: &str, e: &lettre::transport::smtp::Error) -> MailError {
    let text = e.to_string();
    let lower = text.to_lowercase();
    if text.contains("535") || lower.contains("authentication") {
        MailError::AuthFailed
    } else if text.contains("550") || text.contains("553") {
        MailError::RecipientRejected(to.to_string())
    } else if lower.contains("timed out") || lower.contains("timeout") {
        MailError::Timeout
    } else if lower.contains("connection") {
        MailError::Disconnected(text)
    } else {
        MailError::SendFailed(text)
    }
}
