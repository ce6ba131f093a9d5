//! Inbound mail — unseen-message fetch over raw IMAP/TLS.
//!
//! Fetches use `BODY.PEEK[]` so a message stays unseen until the caller has
//! committed its effects and explicitly calls `mark_seen`. A crash between
//! fetch and mark leaves the message unseen for the next poll (at-least-once
//! processing).

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mail_parser::{MessageParser, MimeHeaders};
use secrecy::ExposeSecret;

use crate::error::MailError;
use crate::mail::MailConfig;

/// One unseen message, reduced to what the reply ingestor needs.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    /// IMAP UID, stable across sessions. Pass back to `mark_seen`.
    pub uid: String,
    pub sender: String,
    pub subject: String,
    /// Plain-text body with the quoted trailer already stripped.
    pub body: String,
}

/// Inbound mailbox seam.
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Fetch unseen messages without changing their flags.
    async fn fetch_unseen(&self) -> Result<Vec<InboundEmail>, MailError>;

    /// Mark one message seen. Called only after its effects are committed.
    async fn mark_seen(&self, uid: &str) -> Result<(), MailError>;
}

/// IMAP inbox over rustls. All socket work is blocking and runs in
/// `spawn_blocking`.
pub struct ImapInbox {
    config: MailConfig,
}

impl ImapInbox {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Inbox for ImapInbox {
    async fn fetch_unseen(&self) -> Result<Vec<InboundEmail>, MailError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || fetch_unseen_imap(&config))
            .await
            .map_err(|e| MailError::FetchFailed(format!("fetch task panicked: {e}")))?
    }

    async fn mark_seen(&self, uid: &str) -> Result<(), MailError> {
        let config = self.config.clone();
        let uid = uid.to_string();
        tokio::task::spawn_blocking(move || mark_seen_imap(&config, &uid))
            .await
            .map_err(|e| MailError::FetchFailed(format!("mark task panicked: {e}")))?
    }
}

/// Cut off the quoted trailer a mail client appends below the typed reply.
///
/// Everything from the first `"\nOn "` (Gmail-style attribution line) or
/// `"\n>"` (quote marker) onward is dropped.
pub fn strip_quoted_reply(body: &str) -> String {
    let mut text = body;
    for sep in ["\nOn ", "\n>"] {
        if let Some(pos) = text.find(sep) {
            text = &text[..pos];
        }
    }
    text.trim().to_string()
}

/// Strip HTML tags and normalize whitespace (basic).
fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_sender(parsed: &mail_parser::Message) -> Option<String> {
    parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    for part in parsed.attachments() {
        let part: &mail_parser::MessagePart = part;
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return text.to_string();
        }
    }
    String::new()
}

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

fn connect_tls(config: &MailConfig) -> Result<TlsStream, MailError> {
    let tcp = TcpStream::connect((&*config.imap_host, config.imap_port))
        .map_err(|e| MailError::Disconnected(format!("IMAP connect: {e}")))?;
    tcp.set_read_timeout(Some(Duration::from_secs(30)))
        .map_err(|e| MailError::Disconnected(format!("IMAP socket: {e}")))?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name: rustls::pki_types::ServerName<'_> =
        rustls::pki_types::ServerName::try_from(config.imap_host.clone())
            .map_err(|e| MailError::Disconnected(format!("IMAP server name: {e}")))?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)
        .map_err(|e| MailError::Disconnected(format!("TLS setup: {e}")))?;
    Ok(rustls::StreamOwned::new(conn, tcp))
}

fn read_line(tls: &mut TlsStream) -> Result<String, MailError> {
    let mut buf = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match std::io::Read::read(tls, &mut byte) {
            Ok(0) => return Err(MailError::Disconnected("IMAP connection closed".into())),
            Ok(_) => {
                buf.push(byte[0]);
                if buf.ends_with(b"\r\n") {
                    return Ok(String::from_utf8_lossy(&buf).to_string());
                }
            }
            Err(e) => return Err(MailError::Disconnected(format!("IMAP read: {e}"))),
        }
    }
}

fn send_cmd(tls: &mut TlsStream, tag: &str, cmd: &str) -> Result<Vec<String>, MailError> {
    let full = format!("{tag} {cmd}\r\n");
    IoWrite::write_all(tls, full.as_bytes())
        .map_err(|e| MailError::Disconnected(format!("IMAP write: {e}")))?;
    IoWrite::flush(tls).map_err(|e| MailError::Disconnected(format!("IMAP flush: {e}")))?;
    let mut lines = Vec::new();
    loop {
        let line = read_line(tls)?;
        let done = line.starts_with(tag);
        lines.push(line);
        if done {
            break;
        }
    }
    Ok(lines)
}

/// Log in and select INBOX. Returns the stream ready for commands.
fn open_inbox(config: &MailConfig) -> Result<TlsStream, MailError> {
    let mut tls = connect_tls(config)?;
    let _greeting = read_line(&mut tls)?;

    let login_resp = send_cmd(
        &mut tls,
        "A1",
        &format!(
            "LOGIN \"{}\" \"{}\"",
            config.username,
            config.password.expose_secret()
        ),
    )?;
    if !login_resp.last().is_some_and(|l| l.contains("OK")) {
        return Err(MailError::AuthFailed);
    }

    let _select = send_cmd(&mut tls, "A2", "SELECT \"INBOX\"")?;
    Ok(tls)
}

/// Fetch unseen messages (blocking). Uses UID commands and `BODY.PEEK[]` so
/// flags are untouched.
fn fetch_unseen_imap(config: &MailConfig) -> Result<Vec<InboundEmail>, MailError> {
    let mut tls = open_inbox(config)?;

    let search_resp = send_cmd(&mut tls, "A3", "UID SEARCH UNSEEN")?;
    let mut uids: Vec<String> = Vec::new();
    for line in &search_resp {
        if line.starts_with("* SEARCH") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() > 2 {
                uids.extend(parts[2..].iter().map(|s| s.to_string()));
            }
        }
    }

    let mut results = Vec::new();
    let mut tag_counter = 4_u32;

    for uid in &uids {
        let fetch_tag = format!("A{tag_counter}");
        tag_counter += 1;
        let fetch_resp = send_cmd(&mut tls, &fetch_tag, &format!("UID FETCH {uid} (BODY.PEEK[])"))?;

        let raw: String = fetch_resp
            .iter()
            .skip(1)
            .take(fetch_resp.len().saturating_sub(2))
            .cloned()
            .collect();

        if let Some(parsed) = MessageParser::default().parse(raw.as_bytes()) {
            let Some(sender) = extract_sender(&parsed) else {
                continue;
            };
            let subject = parsed.subject().unwrap_or("(no subject)").to_string();
            let body = strip_quoted_reply(&extract_text(&parsed));

            results.push(InboundEmail {
                uid: uid.clone(),
                sender,
                subject,
                body,
            });
        }
    }

    let logout_tag = format!("A{tag_counter}");
    let _ = send_cmd(&mut tls, &logout_tag, "LOGOUT");

    Ok(results)
}

/// Set `\Seen` on one message (blocking).
fn mark_seen_imap(config: &MailConfig, uid: &str) -> Result<(), MailError> {
    let mut tls = open_inbox(config)?;

    let store_resp = send_cmd(&mut tls, "A3", &format!("UID STORE {uid} +FLAGS (\\Seen)"))?;
    if !store_resp.last().is_some_and(|l| l.contains("OK")) {
        return Err(MailError::FetchFailed(format!(
            "failed to mark uid {uid} seen"
        )));
    }

    let _ = send_cmd(&mut tls, "A4", "LOGOUT");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_gmail_attribution_trailer() {
        let body = "Sounds interesting, tell me more.\nOn Mon, Aug 24, 2026 at 9:00 AM Alex wrote:\n> original text";
        assert_eq!(strip_quoted_reply(body), "Sounds interesting, tell me more.");
    }

    #[test]
    fn strips_quote_marker_trailer() {
        let body = "Not for us, thanks.\n\n> Hi there,\n> quick note";
        assert_eq!(strip_quoted_reply(body), "Not for us, thanks.");
    }

    #[test]
    fn plain_reply_passes_through_trimmed() {
        assert_eq!(strip_quoted_reply("  Just the reply.  \n"), "Just the reply.");
    }

    #[test]
    fn fully_quoted_reply_becomes_empty() {
        assert_eq!(strip_quoted_reply("\n> everything quoted"), "");
    }

    #[test]
    fn earliest_separator_wins() {
        let body = "Reply.\n> quoted\nOn Mon someone wrote:";
        assert_eq!(strip_quoted_reply(body), "Reply.");
    }

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html("plain"), "plain");
    }
}
