//! Configuration schema types
//!
//! This module defines the configuration structure of the gateway as read
//! from TOML.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Main gateway configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Artifact persistence configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Inbound TCP listeners
    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,
}

impl GatewayConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.logging.validate()?;
        self.persistence.validate()?;

        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for listener in &self.listeners {
            listener.validate()?;
            if !names.insert(listener.name.as_str()) {
                return Err(format!("Duplicate listener name '{}'", listener.name));
            }
            if !addresses.insert((listener.bind.as_str(), listener.port)) {
                return Err(format!(
                    "Listener '{}' reuses address {}:{}",
                    listener.name, listener.bind, listener.port
                ));
            }
        }
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds to wait for in-flight connections on shutdown
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

/// Artifact persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Descriptor used when a listener has none
    #[serde(default)]
    pub default_descriptor: Option<String>,

    /// Descriptor appended to every built strategy
    #[serde(default)]
    pub always: Option<String>,

    /// Upper bound for a single sink write
    #[serde(default = "default_sink_timeout_seconds")]
    pub sink_timeout_seconds: u64,

    /// Mail transport for `email` descriptors
    #[serde(default)]
    pub mail: Option<MailConfig>,

    /// Object store for `aws-s3` descriptors
    #[serde(default)]
    pub blob: BlobConfig,
}

impl PersistenceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.sink_timeout_seconds == 0 {
            return Err("persistence.sink_timeout_seconds must be > 0".to_string());
        }

        for (field, descriptor) in [
            ("default_descriptor", &self.default_descriptor),
            ("always", &self.always),
        ] {
            if let Some(descriptor) = descriptor {
                validate_descriptor(&format!("persistence.{field}"), descriptor)?;
            }
        }

        if let Some(mail) = &self.mail {
            if mail.pickup_dir.trim().is_empty() {
                return Err("persistence.mail.pickup_dir cannot be empty".to_string());
            }
        }

        self.blob.validate()
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            default_descriptor: None,
            always: None,
            sink_timeout_seconds: default_sink_timeout_seconds(),
            mail: None,
            blob: BlobConfig::default(),
        }
    }
}

/// Mail transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Directory an MTA picks `.eml` files up from
    pub pickup_dir: String,
}

/// Object store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// No object store; `aws-s3` descriptors report a placeholder id
    #[default]
    None,
    /// Process-local in-memory store
    Memory,
    /// Directory on the local filesystem
    Local,
    /// Amazon S3 or an S3-compatible service
    S3,
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobConfig {
    #[serde(default)]
    pub backend: BlobBackend,

    /// Root directory (local backend)
    #[serde(default)]
    pub root: Option<String>,

    /// Bucket name (s3 backend)
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub allow_http: bool,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing)]
    pub secret_access_key: Option<String>,
}

impl BlobConfig {
    fn validate(&self) -> Result<(), String> {
        match self.backend {
            BlobBackend::Local if is_blank(self.root.as_deref()) => Err(
                "persistence.blob.root is required when backend = 'local'".to_string(),
            ),
            BlobBackend::S3 if is_blank(self.bucket.as_deref()) => Err(
                "persistence.blob.bucket is required when backend = 's3'".to_string(),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::None,
            root: None,
            bucket: None,
            region: default_region(),
            endpoint: None,
            allow_http: false,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

/// Wire protocol spoken on a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerKind {
    /// HL7 v2 over MLLP framing, acknowledged per message
    Mllp,
    /// Raw TCP, one message per connection
    Tcp,
}

/// Inbound TCP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Unique listener name, used in logs
    pub name: String,

    #[serde(default = "default_bind")]
    pub bind: String,

    pub port: u16,

    pub kind: ListenerKind,

    /// Expect a Proxy Protocol v2 header on each connection
    #[serde(default)]
    pub proxy_protocol: bool,

    #[serde(default = "default_read_timeout_seconds")]
    pub read_timeout_seconds: u64,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    /// Tenant assigned to every interaction on this listener
    #[serde(default)]
    pub tenant_id: Option<String>,

    /// Persistence descriptor overriding the default
    #[serde(default)]
    pub descriptor: Option<String>,
}

impl ListenerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("listeners.name cannot be empty".to_string());
        }
        if self.port == 0 {
            return Err(format!("Listener '{}' must have a non-zero port", self.name));
        }
        if self.read_timeout_seconds == 0 {
            return Err(format!(
                "Listener '{}' read_timeout_seconds must be > 0",
                self.name
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(format!(
                "Listener '{}' max_message_bytes must be > 0",
                self.name
            ));
        }
        if let Some(descriptor) = &self.descriptor {
            validate_descriptor(&format!("listeners.{}.descriptor", self.name), descriptor)?;
        }
        Ok(())
    }

    /// `bind:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn validate_descriptor(field: &str, descriptor: &str) -> Result<(), String> {
    serde_json::from_str::<serde_json::Value>(descriptor)
        .map(|_| ())
        .map_err(|e| format!("{field} is not valid JSON: {e}"))
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_local_path() -> String {
    "/var/log/nexus-ingest".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_sink_timeout_seconds() -> u64 {
    30
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_read_timeout_seconds() -> u64 {
    30
}

fn default_max_message_bytes() -> usize {
    10 * 1024 * 1024
}
