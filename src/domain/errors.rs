//! Domain error types
//!
//! This module defines the error hierarchy for the gateway.
//! All errors are domain-specific and don't expose third-party types.
//!
//! Note that the ingestion core (proxy decoding, group-id derivation and
//! persistence dispatch) never returns these errors to its callers: sink
//! failures are turned into reporter issues. The error types are used by the
//! configuration, listener and CLI layers, and inside sinks before their
//! failures are reported.

use thiserror::Error;

/// Main gateway error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistence sink errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] SinkError),

    /// TCP listener errors
    #[error("Listener error: {0}")]
    Listener(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Errors raised inside a single persistence sink
///
/// These never leave the persistence engine; they are rendered into
/// `PersistenceReporter::issue` messages.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the destination failed
    #[error("Unable to write JSON to {path}: {message}")]
    Io { path: String, message: String },

    /// The sink's arguments are incomplete or no backend is configured
    #[error("{0}")]
    Misconfigured(String),

    /// Reading the artifact content failed
    #[error("Failed to read artifact content: {0}")]
    ArtifactRead(String),

    /// Virtual filesystem URI could not be resolved
    #[error("Unsupported virtual filesystem scheme '{0}'")]
    UnsupportedScheme(String),

    /// Virtual filesystem URI is malformed
    #[error("Invalid virtual filesystem URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    /// Object store failure
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Mail composition or transport failure
    #[error("Failed to send email: {0}")]
    Mail(String),

    /// The sink did not finish in time
    #[error("Sink timed out after {0} seconds")]
    Timeout(u64),
}

impl From<object_store::Error> for SinkError {
    fn from(err: object_store::Error) -> Self {
        SinkError::ObjectStore(err.to_string())
    }
}

impl From<zip::result::ZipError> for SinkError {
    fn from(err: zip::result::ZipError) -> Self {
        SinkError::ArtifactRead(format!("cannot zip attachment: {err}"))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        GatewayError::Configuration(format!("TOML parse error: {err}"))
    }
}
