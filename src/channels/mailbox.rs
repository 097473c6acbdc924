//! Inbound mail: IMAP-over-TLS polling and MIME decoding.
//!
//! The IMAP session is a minimal blocking client (LOGIN, SELECT, SEARCH
//! UNSEEN, FETCH RFC822, STORE \Seen, LOGOUT) over rustls, run inside
//! `spawn_blocking`. Fetched messages are decoded with mail-parser into
//! [`InboundEmail`] — already-decoded text only, so the workflow engine
//! never sees transport-level formats.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use secrecy::ExposeSecret;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MailConfig;
use crate::error::ChannelError;

/// Read timeout on the IMAP socket.
const IMAP_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// One decoded inbound email.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    /// Message-ID header, or a generated UUID when absent.
    pub id: String,
    pub sender: String,
    pub subject: String,
    /// Plain-text body; empty when the message had no readable part.
    pub body: String,
    pub received_at: DateTime<Utc>,
}

/// IMAP mailbox poller.
pub struct ImapMailbox {
    config: MailConfig,
}

impl ImapMailbox {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    /// Fetch all unseen messages and mark them \Seen.
    pub async fn fetch_unread(&self) -> Result<Vec<InboundEmail>, ChannelError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || fetch_unread_blocking(&config))
            .await
            .map_err(|e| ChannelError::Fetch(format!("fetch task panicked: {e}")))?
    }
}

// ── Blocking IMAP session ───────────────────────────────────────────

struct ImapSession {
    stream: rustls::StreamOwned<rustls::ClientConnection, TcpStream>,
    next_tag: u32,
}

impl ImapSession {
    fn connect(host: &str, port: u16) -> Result<Self, ChannelError> {
        let connect_err = |reason: String| ChannelError::Connect {
            host: host.to_string(),
            reason,
        };

        let tcp = TcpStream::connect((host, port)).map_err(|e| connect_err(e.to_string()))?;
        tcp.set_read_timeout(Some(IMAP_READ_TIMEOUT))
            .map_err(|e| connect_err(e.to_string()))?;

        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        );
        let server_name: rustls::pki_types::ServerName<'_> =
            rustls::pki_types::ServerName::try_from(host.to_string())
                .map_err(|e| connect_err(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| connect_err(e.to_string()))?;

        let mut session = Self {
            stream: rustls::StreamOwned::new(conn, tcp),
            next_tag: 1,
        };
        // Server greeting.
        session.read_line()?;
        Ok(session)
    }

    fn read_line(&mut self) -> Result<String, ChannelError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.stream.read(&mut byte) {
                Ok(0) => return Err(ChannelError::Fetch("IMAP connection closed".into())),
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(ChannelError::Fetch(e.to_string())),
            }
        }
    }

    /// Send a tagged command and read until the tagged completion line.
    fn command(&mut self, cmd: &str) -> Result<Vec<String>, ChannelError> {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;

        self.stream
            .write_all(format!("{tag} {cmd}\r\n").as_bytes())
            .and_then(|()| self.stream.flush())
            .map_err(|e| ChannelError::Fetch(e.to_string()))?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = line.starts_with(&tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    fn login(&mut self, username: &str, password: &str) -> Result<(), ChannelError> {
        let resp = self.command(&format!("LOGIN \"{username}\" \"{password}\""))?;
        if resp.last().is_some_and(|l| l.contains("OK")) {
            Ok(())
        } else {
            Err(ChannelError::Fetch("IMAP login failed".into()))
        }
    }

    fn select_inbox(&mut self) -> Result<(), ChannelError> {
        self.command("SELECT \"INBOX\"")?;
        Ok(())
    }

    fn search_unseen(&mut self) -> Result<Vec<String>, ChannelError> {
        let resp = self.command("SEARCH UNSEEN")?;
        let mut uids = Vec::new();
        for line in &resp {
            if line.starts_with("* SEARCH") {
                uids.extend(
                    line.split_whitespace()
                        .skip(2)
                        .map(str::to_string),
                );
            }
        }
        Ok(uids)
    }

    /// Fetch the raw RFC822 text of one message.
    fn fetch_raw(&mut self, uid: &str) -> Result<String, ChannelError> {
        let resp = self.command(&format!("FETCH {uid} RFC822"))?;
        // Drop the untagged FETCH header line, the closing paren line and
        // the tagged completion line; the rest is the literal.
        let raw: String = resp
            .iter()
            .skip(1)
            .take(resp.len().saturating_sub(3))
            .cloned()
            .collect();
        Ok(raw)
    }

    fn mark_seen(&mut self, uid: &str) {
        let _ = self.command(&format!("STORE {uid} +FLAGS (\\Seen)"));
    }

    fn logout(&mut self) {
        let _ = self.command("LOGOUT");
    }
}

fn fetch_unread_blocking(config: &MailConfig) -> Result<Vec<InboundEmail>, ChannelError> {
    let mut session = ImapSession::connect(&config.imap_host, config.imap_port)?;
    session.login(&config.address, config.password.expose_secret())?;
    session.select_inbox()?;

    let uids = session.search_unseen()?;
    if uids.is_empty() {
        session.logout();
        return Ok(Vec::new());
    }
    debug!(count = uids.len(), "Unseen messages found");

    let mut emails = Vec::new();
    for uid in &uids {
        let raw = session.fetch_raw(uid)?;
        if let Some(email) = parse_email(raw.as_bytes()) {
            emails.push(email);
        }
        session.mark_seen(uid);
    }
    session.logout();

    info!(fetched = emails.len(), "Fetched new email(s)");
    Ok(emails)
}

// ── MIME decoding ───────────────────────────────────────────────────

/// Decode a raw RFC822 message into an [`InboundEmail`].
///
/// Returns `None` only when the bytes are not parseable as a message at
/// all; a message without a readable body yields an empty `body`.
pub fn parse_email(raw: &[u8]) -> Option<InboundEmail> {
    let parsed = MessageParser::default().parse(raw)?;

    let sender = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".into());

    let subject = parsed.subject().unwrap_or("(no subject)").to_string();

    let body = if let Some(text) = parsed.body_text(0) {
        text.trim().to_string()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(html.as_ref())
    } else {
        String::new()
    };

    let id = parsed
        .message_id()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("gen-{}", Uuid::new_v4()));

    let received_at = parsed
        .date()
        .and_then(|d| {
            chrono::NaiveDate::from_ymd_opt(
                i32::from(d.year),
                u32::from(d.month),
                u32::from(d.day),
            )
            .and_then(|date| {
                date.and_hms_opt(u32::from(d.hour), u32::from(d.minute), u32::from(d.second))
            })
            .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(Utc::now);

    Some(InboundEmail {
        id,
        sender,
        subject,
        body,
        received_at,
    })
}

/// Strip HTML tags from content and normalize whitespace (basic).
pub fn strip_html(html: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"From: Alice <alice@example.com>\r\n\
To: support@shop.example\r\n\
Subject: Where is my order?\r\n\
Message-ID: <abc123@example.com>\r\n\
Date: Tue, 12 Aug 2025 10:30:00 +0000\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hi, could you tell me the shipping status of order 4711?\r\n";

    #[test]
    fn parse_plain_text_email() {
        let email = parse_email(SAMPLE).unwrap();
        assert_eq!(email.sender, "alice@example.com");
        assert_eq!(email.subject, "Where is my order?");
        assert_eq!(email.id, "abc123@example.com");
        assert!(email.body.contains("order 4711"));
        assert_eq!(email.received_at.to_rfc3339(), "2025-08-12T10:30:00+00:00");
    }

    #[test]
    fn parse_html_only_email_strips_tags() {
        let raw = b"From: bob@example.com\r\n\
Subject: Hours\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body><p>Are you <b>open</b> on Sunday?</p></body></html>\r\n";
        let email = parse_email(raw).unwrap();
        assert_eq!(email.body, "Are you open on Sunday?");
    }

    #[test]
    fn parse_email_without_message_id_generates_one() {
        let raw = b"From: bob@example.com\r\n\
Subject: Hi\r\n\
\r\n\
hello\r\n";
        let email = parse_email(raw).unwrap();
        assert!(email.id.starts_with("gen-"));
    }

    #[test]
    fn parse_email_missing_subject_gets_placeholder() {
        let raw = b"From: bob@example.com\r\n\r\njust a body\r\n";
        let email = parse_email(raw).unwrap();
        assert_eq!(email.subject, "(no subject)");
    }

    #[test]
    fn strip_html_basic() {
        assert_eq!(strip_html("<p>Hello</p>"), "Hello");
    }

    #[test]
    fn strip_html_nested_and_attributes() {
        assert_eq!(
            strip_html(r#"<div><a href="https://x.example">A <b>link</b></a></div>"#),
            "A link"
        );
    }

    #[test]
    fn strip_html_normalizes_whitespace() {
        assert_eq!(strip_html("<p>  Hello   World  </p>"), "Hello World");
    }

    #[test]
    fn strip_html_plain_text_passthrough() {
        assert_eq!(strip_html("No HTML here"), "No HTML here");
    }
}
