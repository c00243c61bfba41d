//! Per-interaction processing
//!
//! Takes the raw bytes of one interaction as read from a socket and drives
//! them through proxy decoding, group assignment and persistence, returning
//! the bytes to send back to the client.

use super::mllp::{self, ZntFields};
use crate::config::{GatewayConfig, ListenerConfig, ListenerKind};
use crate::core::persistence::{ArtifactStore, CollectingReporter, PersistenceReport};
use crate::core::proxy;
use crate::core::routing::MessageGroupService;
use crate::domain::{
    Artifact, ArtifactId, ConnectionInfo, GatewayError, InteractionContext, InteractionId,
    MessageSourceType, Result,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

/// File name recorded for MLLP payloads
const MLLP_FILE_NAME: &str = "hl7-message.hl7";
/// File name recorded for raw TCP payloads
const TCP_FILE_NAME: &str = "tcp-message.dat";

/// Where an interaction came from
#[derive(Debug, Clone)]
pub struct ConnectionMeta {
    pub listener: Arc<ListenerConfig>,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    /// Addresses decoded from an earlier message on the same connection
    pub proxied: Option<ConnectionInfo>,
}

impl ConnectionMeta {
    pub fn new(listener: Arc<ListenerConfig>) -> Self {
        Self {
            listener,
            remote_addr: None,
            local_addr: None,
            proxied: None,
        }
    }

    pub fn with_addresses(
        mut self,
        remote_addr: Option<SocketAddr>,
        local_addr: Option<SocketAddr>,
    ) -> Self {
        self.remote_addr = remote_addr;
        self.local_addr = local_addr;
        self
    }

    fn source_type(&self) -> MessageSourceType {
        match self.listener.kind {
            ListenerKind::Mllp => MessageSourceType::Mllp,
            ListenerKind::Tcp => MessageSourceType::Tcp,
        }
    }
}

/// Result of handling one interaction
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub interaction_id: InteractionId,
    pub message_group_id: Option<String>,
    /// Proxied client/server addresses, when a header was seen
    pub connection: Option<ConnectionInfo>,
    /// Bytes to write back to the client (MLLP-framed for MLLP listeners)
    pub response: Vec<u8>,
    /// Everything the persistence reporter saw
    pub report: PersistenceReport,
    /// False when a NACK or error line was produced
    pub acknowledged: bool,
}

/// JSON record persisted for each interaction
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InteractionRecord<'a> {
    #[serde(flatten)]
    context: &'a InteractionContext,
    listener: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxied_connection: Option<&'a ConnectionInfo>,
    payload: Cow<'a, str>,
    payload_sha256: String,
}

/// Orchestrates one interaction from raw bytes to response
pub struct IngestPipeline {
    store: Arc<ArtifactStore>,
    groups: MessageGroupService,
    default_descriptor: Option<String>,
}

impl IngestPipeline {
    pub fn new(store: Arc<ArtifactStore>, default_descriptor: Option<String>) -> Self {
        Self {
            store,
            groups: MessageGroupService::new(),
            default_descriptor,
        }
    }

    /// Builds the pipeline and its artifact store from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a persistence backend cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let store = ArtifactStore::from_config(&config.persistence)?;
        Ok(Self::new(
            Arc::new(store),
            config.persistence.default_descriptor.clone(),
        ))
    }

    pub fn with_group_service(mut self, groups: MessageGroupService) -> Self {
        self.groups = groups;
        self
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Handles one interaction
    ///
    /// Never fails. Persistence problems end up in the outcome's report;
    /// anything that prevents building an artifact or an acknowledgement
    /// yields a NACK (MLLP) or an error line (TCP).
    pub async fn handle(&self, raw: &[u8], meta: &ConnectionMeta) -> IngestOutcome {
        let listener = &meta.listener;
        let mut ctx = InteractionContext::new(meta.source_type());
        crate::log_interaction_start!(
            ctx.interaction_id(),
            listener.name,
            ctx.source_type,
            raw.len()
        );

        let decoded = if listener.proxy_protocol {
            proxy::decode(raw, &listener.name)
        } else {
            proxy::ProxyDecodeResult {
                connection: None,
                payload: raw,
            }
        };
        let connection = decoded.connection.clone().or_else(|| meta.proxied.clone());
        if let Some(info) = &connection {
            ctx.apply_connection_info(info);
        }
        ctx.apply_socket_addresses(
            meta.remote_addr.map(split_socket_addr),
            meta.local_addr.map(split_socket_addr),
        );
        ctx.tenant_id = listener.tenant_id.clone();

        let message = match listener.kind {
            ListenerKind::Mllp => mllp::unwrap_frame(decoded.payload),
            ListenerKind::Tcp => decoded.payload,
        };
        let text = String::from_utf8_lossy(message);
        ctx.file_size = message.len() as u64;

        match listener.kind {
            ListenerKind::Mllp => {
                ctx.file_name = Some(MLLP_FILE_NAME.to_string());
                ctx.user_agent = Some(mllp::user_agent(&text));
                match ZntFields::extract(&text) {
                    Some(znt) => znt.apply(&mut ctx.additional_parameters),
                    None => tracing::warn!(
                        interaction_id = %ctx.interaction_id(),
                        "ZNT segment not found in HL7 message"
                    ),
                }
            }
            ListenerKind::Tcp => ctx.file_name = Some(TCP_FILE_NAME.to_string()),
        }

        let group_id = self.groups.assign(&mut ctx);

        let report = match self.persist(&ctx, connection.as_ref(), listener, &text).await {
            Ok(report) => report,
            Err(e) => {
                crate::log_error_with_context!(
                    e,
                    format_args!("Failed to build artifact for interaction {}", ctx.interaction_id())
                );
                return IngestOutcome {
                    connection,
                    ..self.failure(ctx.interaction_id().clone(), Some(group_id), listener)
                };
            }
        };

        for issue in &report.issues {
            tracing::warn!(interaction_id = %ctx.interaction_id(), issue = %issue, "Persistence issue");
        }

        let response = match listener.kind {
            ListenerKind::Mllp => match mllp::build_ack(&text, ctx.interaction_id().as_str()) {
                Ok(ack) => mllp::wrap_frame(ack.as_bytes()),
                Err(e) => {
                    crate::log_error_with_context!(
                        e,
                        format_args!("Sending NACK for interaction {}", ctx.interaction_id())
                    );
                    return IngestOutcome {
                        connection,
                        report,
                        ..self.failure(ctx.interaction_id().clone(), Some(group_id), listener)
                    };
                }
            },
            ListenerKind::Tcp => tcp_ack(listener.port).into_bytes(),
        };

        tracing::info!(
            interaction_id = %ctx.interaction_id(),
            listener = %listener.name,
            message_group_id = %group_id,
            issues = report.issues.len(),
            "Interaction processed"
        );

        IngestOutcome {
            interaction_id: ctx.interaction_id().clone(),
            message_group_id: Some(group_id),
            connection,
            response,
            report,
            acknowledged: true,
        }
    }

    async fn persist(
        &self,
        ctx: &InteractionContext,
        proxied: Option<&ConnectionInfo>,
        listener: &ListenerConfig,
        text: &str,
    ) -> Result<PersistenceReport> {
        let artifact = build_artifact(ctx, proxied, listener, text)?;

        let descriptor = listener
            .descriptor
            .as_deref()
            .or(self.default_descriptor.as_deref());
        let strategy = self.store.build(descriptor);

        let reporter = CollectingReporter::new();
        self.store.persist(&strategy, &artifact, &reporter).await;
        Ok(reporter.into_report())
    }

    fn failure(
        &self,
        interaction_id: InteractionId,
        message_group_id: Option<String>,
        listener: &ListenerConfig,
    ) -> IngestOutcome {
        let response = match listener.kind {
            ListenerKind::Mllp => mllp::wrap_frame(mllp::build_nack().as_bytes()),
            ListenerKind::Tcp => format!(
                "Error processing message on port {}\n",
                listener.port
            )
            .into_bytes(),
        };
        IngestOutcome {
            interaction_id,
            message_group_id,
            connection: None,
            response,
            report: PersistenceReport::default(),
            acknowledged: false,
        }
    }
}

/// Response line for raw TCP listeners
pub fn tcp_ack(port: u16) -> String {
    format!("ACK received on port {port}\n")
}

/// Builds the JSON artifact for an interaction
///
/// # Errors
///
/// Returns a validation error if the interaction id is not a valid artifact
/// id, or a serialization error if the record cannot be rendered.
pub fn build_artifact(
    ctx: &InteractionContext,
    proxied: Option<&ConnectionInfo>,
    listener: &ListenerConfig,
    text: &str,
) -> Result<Artifact> {
    let id = ArtifactId::new(ctx.interaction_id().as_str()).map_err(GatewayError::Validation)?;

    let record = InteractionRecord {
        context: ctx,
        listener: &listener.name,
        proxied_connection: proxied,
        payload: Cow::Borrowed(text),
        payload_sha256: payload_digest(text.as_bytes()),
    };

    let mut provenance = Map::new();
    provenance.insert("listener".to_string(), json!(listener.name));
    provenance.insert("sourceType".to_string(), json!(ctx.source_type));
    provenance.insert(
        "messageGroupId".to_string(),
        ctx.message_group_id().map_or(Value::Null, |id| json!(id)),
    );

    Artifact::json(&record, id, listener.name.clone(), Some(provenance))
}

/// Lowercase hex SHA-256 of `payload`
pub fn payload_digest(payload: &[u8]) -> String {
    Sha256::digest(payload)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn split_socket_addr(addr: SocketAddr) -> (String, String) {
    (addr.ip().to_string(), addr.port().to_string())
}
