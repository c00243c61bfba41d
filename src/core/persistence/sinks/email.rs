//! Email sink (`nature: "email"`)
//!
//! Descriptor fields: `from`, `to`, `subject` (required), `cc`, `bcc`,
//! `body`, `attachmentName` (optional). Every field is interpolated. With an
//! `attachmentName` the artifact is zipped as `<artifactId>.json` and
//! attached; otherwise the artifact content is the message body.

use super::SinkReceipt;
use crate::adapters::mail::{EmailAttachment, EmailMessage, MailTransport};
use crate::core::persistence::strategy::SinkStrategy;
use crate::domain::{Artifact, SinkError};
use bytes::Bytes;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARG_FROM: &str = "from";
pub const ARG_TO: &str = "to";
pub const ARG_CC: &str = "cc";
pub const ARG_BCC: &str = "bcc";
pub const ARG_SUBJECT: &str = "subject";
pub const ARG_BODY: &str = "body";
pub const ARG_ATTACHMENT_NAME: &str = "attachmentName";

const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Composes and sends the artifact by email
pub async fn send(
    transport: Option<&dyn MailTransport>,
    sink: &SinkStrategy,
    artifact: &Artifact,
) -> Result<SinkReceipt, SinkError> {
    let transport = transport.ok_or_else(|| {
        SinkError::Misconfigured("No mail transport configured for email persistence".to_string())
    })?;

    let (Some(from), Some(to), Some(subject)) =
        (sink.arg(ARG_FROM), sink.arg(ARG_TO), sink.arg(ARG_SUBJECT))
    else {
        return Err(SinkError::Misconfigured(
            "'from', 'to' and 'subject' arguments required to send emails".to_string(),
        ));
    };

    let engine = sink.engine_for(artifact);
    let interpolate_list = |key: &str| {
        sink.arg(key)
            .map(|list| EmailMessage::parse_addresses(&engine.interpolate(&list)))
            .unwrap_or_default()
    };

    let mut message = EmailMessage {
        from: engine.interpolate(&from),
        to: EmailMessage::parse_addresses(&engine.interpolate(&to)),
        cc: interpolate_list(ARG_CC),
        bcc: interpolate_list(ARG_BCC),
        subject: engine.interpolate(&subject),
        body: None,
        attachment: None,
    };

    let attachment_name = sink
        .arg(ARG_ATTACHMENT_NAME)
        .map(|name| engine.interpolate(&name));

    match &attachment_name {
        Some(name) => {
            message.body = sink.arg(ARG_BODY).map(|body| engine.interpolate(&body));
            message.attachment = Some(EmailAttachment {
                file_name: name.clone(),
                content_type: ZIP_CONTENT_TYPE.to_string(),
                data: zip_artifact(artifact)?,
            });
        }
        None => message.body = Some(artifact.text().into_owned()),
    }

    let message_id = transport.send(&message).await?;

    let recipients = message.to.join(", ");
    let report = match attachment_name {
        Some(name) => format!(
            "Email with attachment {name} sent successfully from {} to {recipients}",
            message.from
        ),
        None => format!(
            "Email sent successfully from {} to {recipients}",
            message.from
        ),
    };

    tracing::debug!(
        artifact_id = %artifact.id(),
        transport = transport.name(),
        message_id = %message_id,
        "Artifact sent by email"
    );

    Ok(SinkReceipt {
        location: report.clone(),
        message: report,
    })
}

/// Zips the artifact content as a single `<artifactId>.json` entry
pub fn zip_artifact(artifact: &Artifact) -> Result<Bytes, SinkError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(format!("{}.json", artifact.id()), options)?;
    zip.write_all(artifact.content())
        .map_err(|e| SinkError::ArtifactRead(e.to_string()))?;
    let cursor = zip.finish()?;

    Ok(Bytes::from(cursor.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persistence::strategy::SinkKind;
    use crate::domain::ArtifactId;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::io::Read;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: &EmailMessage) -> Result<String, SinkError> {
            self.sent.lock().push(message.clone());
            Ok("id@test".to_string())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn sink(args: serde_json::Value) -> SinkStrategy {
        SinkStrategy::new(SinkKind::Email, args.as_object().unwrap().clone())
    }

    fn artifact() -> Artifact {
        Artifact::new(ArtifactId::new("mail-1").unwrap(), "unit-test", "{\"k\":\"v\"}", None)
    }

    #[tokio::test]
    async fn test_body_only_email() {
        let transport = RecordingTransport::default();
        let sink = sink(json!({
            "nature": "email",
            "from": "gw@example.org",
            "to": "a@example.org, b@example.org",
            "subject": "Artifact ${artifactId}",
            "cc": "c@example.org"
        }));

        let receipt = send(Some(&transport), &sink, &artifact()).await.unwrap();
        assert_eq!(
            receipt.message,
            "Email sent successfully from gw@example.org to a@example.org, b@example.org"
        );

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Artifact mail-1");
        assert_eq!(sent[0].cc, vec!["c@example.org"]);
        assert_eq!(sent[0].body.as_deref(), Some("{\"k\":\"v\"}"));
        assert!(sent[0].attachment.is_none());
    }

    #[tokio::test]
    async fn test_attachment_is_zipped() {
        let transport = RecordingTransport::default();
        let sink = sink(json!({
            "nature": "email",
            "from": "gw@example.org",
            "to": "a@example.org",
            "subject": "s",
            "body": "see ${artifactId}.zip",
            "attachmentName": "${artifactId}.zip"
        }));

        let receipt = send(Some(&transport), &sink, &artifact()).await.unwrap();
        assert!(receipt.message.starts_with("Email with attachment mail-1.zip sent successfully"));

        let sent = transport.sent.lock();
        assert_eq!(sent[0].body.as_deref(), Some("see mail-1.zip"));
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.file_name, "mail-1.zip");

        let mut archive = zip::ZipArchive::new(Cursor::new(attachment.data.to_vec())).unwrap();
        let mut entry = archive.by_name("mail-1.json").unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "{\"k\":\"v\"}");
    }

    #[tokio::test]
    async fn test_missing_required_fields() {
        let transport = RecordingTransport::default();
        let sink = sink(json!({"nature": "email", "from": "gw@example.org", "to": "a@example.org"}));

        let err = send(Some(&transport), &sink, &artifact()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "'from', 'to' and 'subject' arguments required to send emails"
        );
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_transport() {
        let sink = sink(json!({"nature": "email", "from": "a", "to": "b", "subject": "c"}));
        let err = send(None, &sink, &artifact()).await.unwrap_err();
        assert!(matches!(err, SinkError::Misconfigured(_)));
    }
}
