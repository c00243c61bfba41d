//! Domain models and types for the gateway.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`InteractionId`], [`ArtifactId`])
//! - **Interaction state** ([`InteractionContext`], [`ConnectionInfo`], [`MessageSourceType`])
//! - **Persistable content** ([`Artifact`])
//! - **Error types** ([`GatewayError`], [`SinkError`])
//! - **Result type alias** ([`Result`])
//!
//! # Example
//!
//! ```rust
//! use nexus_ingest::domain::{InteractionContext, MessageSourceType};
//!
//! let mut ctx = InteractionContext::new(MessageSourceType::Tcp);
//! ctx.destination_port = Some("2575".to_string());
//! assert!(ctx.message_group_id().is_none());
//! ```

pub mod artifact;
pub mod context;
pub mod errors;
pub mod ids;
pub mod interaction;
pub mod result;

// Re-export commonly used types for convenience
pub use artifact::Artifact;
pub use errors::{GatewayError, SinkError};
pub use ids::{ArtifactId, InteractionId};
pub use interaction::{
    AddressFamily, ConnectionInfo, InteractionContext, MessageSourceType,
    DEFAULT_MESSAGE_GROUP_ID, DEFAULT_TENANT_ID, UNKNOWN_MESSAGE_GROUP_ID,
};
pub use result::Result;
