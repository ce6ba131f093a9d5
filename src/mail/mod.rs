//! Mail transport — SMTP outbound and IMAP inbound.

pub mod inbound;
pub mod outbound;

use secrecy::SecretString;

pub use inbound::{ImapInbox, Inbox, InboundEmail, strip_quoted_reply};
pub use outbound::{Mailer, SmtpMailer};

/// Mail server configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl MailConfig {
    /// Build config from environment variables.
    /// Returns `None` if `OUTREACH_IMAP_HOST` is not set (mail disabled).
    pub fn from_env() -> Option<Self> {
        let imap_host = std::env::var("OUTREACH_IMAP_HOST").ok()?;

        let imap_port: u16 = std::env::var("OUTREACH_IMAP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(993);

        let smtp_host = std::env::var("OUTREACH_SMTP_HOST")
            .unwrap_or_else(|_| imap_host.replace("imap", "smtp"));

        let smtp_port: u16 = std::env::var("OUTREACH_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("OUTREACH_MAIL_USERNAME").unwrap_or_default();
        let password = std::env::var("OUTREACH_MAIL_PASSWORD")
            .unwrap_or_default()
            .into();
        let from_address =
            std::env::var("OUTREACH_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        Some(Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
        })
    }
}
