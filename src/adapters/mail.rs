//! Outbound mail transport
//!
//! The email persistence sink composes an [`EmailMessage`] and hands it to a
//! [`MailTransport`]. The bundled [`PickupDirTransport`] drops RFC 5322
//! files into a directory that an MTA (Postfix `maildrop`, IIS/Exchange
//! pickup, etc.) collects and delivers.

use crate::domain::SinkError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::Local;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const BASE64_LINE_LEN: usize = 76;

/// File attached to an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Fully interpolated outbound email
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: Option<String>,
    pub attachment: Option<EmailAttachment>,
}

impl EmailMessage {
    /// Splits a comma- or semicolon-separated address list
    pub fn parse_addresses(list: &str) -> Vec<String> {
        list.split([',', ';'])
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Renders the message as RFC 5322 text with MIME parts
    pub fn to_rfc5322(&self, message_id: &str) -> String {
        let mut out = String::new();
        push_line(&mut out, &format!("From: {}", self.from));
        push_line(&mut out, &format!("To: {}", self.to.join(", ")));
        if !self.cc.is_empty() {
            push_line(&mut out, &format!("Cc: {}", self.cc.join(", ")));
        }
        if !self.bcc.is_empty() {
            push_line(&mut out, &format!("Bcc: {}", self.bcc.join(", ")));
        }
        push_line(&mut out, &format!("Subject: {}", self.subject));
        push_line(&mut out, &format!("Date: {}", Local::now().to_rfc2822()));
        push_line(&mut out, &format!("Message-ID: <{message_id}>"));
        push_line(&mut out, "MIME-Version: 1.0");

        let body = self.body.as_deref().unwrap_or_default();
        match &self.attachment {
            None => {
                push_line(&mut out, "Content-Type: text/plain; charset=utf-8");
                push_line(&mut out, "Content-Transfer-Encoding: 8bit");
                push_line(&mut out, "");
                push_line(&mut out, body);
            }
            Some(attachment) => {
                let boundary = format!("=_nexus_{}", Uuid::new_v4().simple());
                push_line(
                    &mut out,
                    &format!("Content-Type: multipart/mixed; boundary=\"{boundary}\""),
                );
                push_line(&mut out, "");
                push_line(&mut out, &format!("--{boundary}"));
                push_line(&mut out, "Content-Type: text/plain; charset=utf-8");
                push_line(&mut out, "Content-Transfer-Encoding: 8bit");
                push_line(&mut out, "");
                push_line(&mut out, body);
                push_line(&mut out, &format!("--{boundary}"));
                push_line(
                    &mut out,
                    &format!(
                        "Content-Type: {}; name=\"{}\"",
                        attachment.content_type, attachment.file_name
                    ),
                );
                push_line(
                    &mut out,
                    &format!(
                        "Content-Disposition: attachment; filename=\"{}\"",
                        attachment.file_name
                    ),
                );
                push_line(&mut out, "Content-Transfer-Encoding: base64");
                push_line(&mut out, "");
                let encoded = STANDARD.encode(&attachment.data);
                for chunk in encoded.as_bytes().chunks(BASE64_LINE_LEN) {
                    push_line(&mut out, &String::from_utf8_lossy(chunk));
                }
                push_line(&mut out, &format!("--{boundary}--"));
            }
        }
        out
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

/// Sends composed emails
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hands the message to the transport and returns its message id
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Mail`] if the message is rejected or cannot be
    /// handed over.
    async fn send(&self, message: &EmailMessage) -> Result<String, SinkError>;

    /// Short transport name for logs
    fn name(&self) -> &str;
}

/// Writes `.eml` files into a pickup directory
#[derive(Debug, Clone)]
pub struct PickupDirTransport {
    dir: PathBuf,
}

impl PickupDirTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MailTransport for PickupDirTransport {
    async fn send(&self, message: &EmailMessage) -> Result<String, SinkError> {
        if message.from.trim().is_empty() {
            return Err(SinkError::Mail("sender address is empty".to_string()));
        }
        if message.to.is_empty() {
            return Err(SinkError::Mail("no recipients".to_string()));
        }

        let id = Uuid::new_v4();
        let message_id = format!("{id}@nexus-ingest");
        let text = message.to_rfc5322(&message_id);

        let io_err = |path: &Path, e: std::io::Error| SinkError::Mail(format!(
            "cannot write {}: {e}",
            path.display()
        ));

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_err(&self.dir, e))?;

        // MTAs pick up anything matching *.eml, so write under a temporary name first
        let staging = self.dir.join(format!("{id}.tmp"));
        let target = self.dir.join(format!("{id}.eml"));
        tokio::fs::write(&staging, text.as_bytes())
            .await
            .map_err(|e| io_err(&staging, e))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| io_err(&target, e))?;

        tracing::debug!(
            transport = self.name(),
            message_id = %message_id,
            path = %target.display(),
            "Email placed in pickup directory"
        );
        Ok(message_id)
    }

    fn name(&self) -> &str {
        "pickup-dir"
    }
}
