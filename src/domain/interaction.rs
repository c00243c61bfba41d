//! Interaction context and connection metadata
//!
//! An [`InteractionContext`] is created once per inbound interaction at
//! ingress entry, filled in by the transport collectors and the proxy
//! decoder, receives its message group id exactly once, and is read-only
//! from then on.

use crate::domain::errors::GatewayError;
use crate::domain::ids::InteractionId;
use crate::domain::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Group id used by the MLLP and TCP strategies when nothing better is known
pub const DEFAULT_MESSAGE_GROUP_ID: &str = "default_message_group";

/// Group id used by the IP/port fallback strategy when no address is known
///
/// Deliberately distinct from [`DEFAULT_MESSAGE_GROUP_ID`]; downstream
/// consumers match on both literals.
pub const UNKNOWN_MESSAGE_GROUP_ID: &str = "unknown-tenantId";

/// Tenant id assigned when the caller did not supply one
pub const DEFAULT_TENANT_ID: &str = "unknown-tenant";

/// MLLP parameter key: ZNT-4.1 delivery type
pub const DELIVERY_TYPE: &str = "deliveryType";

/// MLLP parameter key: ZNT-8 facility code
pub const FACILITY: &str = "facility";

/// MLLP parameter key: ZNT-2.1 message code
pub const MESSAGE_CODE: &str = "messageCode";

/// Transport an interaction arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageSourceType {
    /// Plain HTTP upload
    Http,
    /// SOAP / MTOM envelope
    Soap,
    /// MLLP-framed HL7 over raw TCP
    Mllp,
    /// Raw TCP payload
    Tcp,
}

impl fmt::Display for MessageSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Http => "HTTP",
            Self::Soap => "SOAP",
            Self::Mllp => "MLLP",
            Self::Tcp => "TCP",
        };
        f.write_str(name)
    }
}

impl FromStr for MessageSourceType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "soap" => Ok(Self::Soap),
            "mllp" => Ok(Self::Mllp),
            "tcp" => Ok(Self::Tcp),
            _ => Err(GatewayError::Validation(format!(
                "Invalid message source type '{s}'. Must be one of: http, soap, mllp, tcp"
            ))),
        }
    }
}

/// Address family carried in a Proxy Protocol v2 header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    /// TCP over IPv4
    IPv4,
    /// TCP over IPv6
    IPv6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IPv4 => f.write_str("IPv4"),
            Self::IPv6 => f.write_str("IPv6"),
        }
    }
}

/// Original client/server addresses conveyed by a load balancer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub source_ip: String,
    pub destination_ip: String,
    pub source_port: u16,
    pub destination_port: u16,
    pub address_family: AddressFamily,
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}:{} -> {}:{}",
            self.address_family,
            self.source_ip,
            self.source_port,
            self.destination_ip,
            self.destination_port
        )
    }
}

/// Per-interaction state shared by the routing and persistence steps
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionContext {
    interaction_id: InteractionId,
    pub tenant_id: Option<String>,
    pub source_type: MessageSourceType,
    pub source_ip: Option<String>,
    pub source_port: Option<String>,
    pub destination_ip: Option<String>,
    pub destination_port: Option<String>,
    pub additional_parameters: BTreeMap<String, String>,
    message_group_id: Option<String>,
    pub object_key: Option<String>,
    pub metadata_key: Option<String>,
    pub file_name: Option<String>,
    pub file_size: u64,
    pub upload_time: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
}

impl InteractionContext {
    /// Creates a context with a freshly generated interaction id
    pub fn new(source_type: MessageSourceType) -> Self {
        Self::with_id(InteractionId::generate(), source_type)
    }

    /// Creates a context for an already-known interaction id
    pub fn with_id(interaction_id: InteractionId, source_type: MessageSourceType) -> Self {
        Self {
            interaction_id,
            tenant_id: None,
            source_type,
            source_ip: None,
            source_port: None,
            destination_ip: None,
            destination_port: None,
            additional_parameters: BTreeMap::new(),
            message_group_id: None,
            object_key: None,
            metadata_key: None,
            file_name: None,
            file_size: 0,
            upload_time: Utc::now(),
            user_agent: None,
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
        }
    }

    /// Returns the interaction id
    pub fn interaction_id(&self) -> &InteractionId {
        &self.interaction_id
    }

    /// Returns the message group id, if one has been assigned
    pub fn message_group_id(&self) -> Option<&str> {
        self.message_group_id.as_deref()
    }

    /// Assigns the message group id
    ///
    /// # Errors
    ///
    /// Returns a validation error if a group id was already assigned; the
    /// existing id is left untouched.
    pub fn set_message_group_id(&mut self, group_id: impl Into<String>) -> Result<()> {
        if let Some(existing) = &self.message_group_id {
            return Err(GatewayError::Validation(format!(
                "message group id already assigned ('{existing}') for interaction {}",
                self.interaction_id
            )));
        }
        self.message_group_id = Some(group_id.into());
        Ok(())
    }

    /// Copies addresses decoded from a proxy header into the context
    ///
    /// Proxy-supplied addresses always win over socket addresses.
    pub fn apply_connection_info(&mut self, info: &ConnectionInfo) {
        self.source_ip = Some(info.source_ip.clone());
        self.source_port = Some(info.source_port.to_string());
        self.destination_ip = Some(info.destination_ip.clone());
        self.destination_port = Some(info.destination_port.to_string());
    }

    /// Fills still-missing addresses from the socket's peer and local addresses
    pub fn apply_socket_addresses(
        &mut self,
        remote: Option<(String, String)>,
        local: Option<(String, String)>,
    ) {
        if let Some((ip, port)) = remote {
            self.source_ip.get_or_insert(ip);
            self.source_port.get_or_insert(port);
        }
        if let Some((ip, port)) = local {
            self.destination_ip.get_or_insert(ip);
            self.destination_port.get_or_insert(port);
        }
    }

    /// Returns a source-specific parameter
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.additional_parameters.get(key).map(String::as_str)
    }
}
