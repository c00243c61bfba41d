//! Gateway orchestration
//!
//! Ties the proxy decoder, message grouping and persistence together for a
//! single interaction. The socket handling lives in
//! [`crate::adapters::listener`]; everything here works on byte slices.
//!
//! ```rust
//! use nexus_ingest::config::{ListenerConfig, ListenerKind};
//! use nexus_ingest::core::ingest::{ConnectionMeta, IngestPipeline};
//! use nexus_ingest::core::persistence::ArtifactStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let listener = Arc::new(ListenerConfig {
//!     name: "tcp-7001".to_string(),
//!     bind: "0.0.0.0".to_string(),
//!     port: 7001,
//!     kind: ListenerKind::Tcp,
//!     proxy_protocol: false,
//!     read_timeout_seconds: 30,
//!     max_message_bytes: 1024,
//!     tenant_id: None,
//!     descriptor: None,
//! });
//!
//! let pipeline = IngestPipeline::new(Arc::new(ArtifactStore::new()), None);
//! let outcome = pipeline.handle(b"hello", &ConnectionMeta::new(listener)).await;
//! assert_eq!(outcome.response, b"ACK received on port 7001\n");
//! # }
//! ```

pub mod mllp;
pub mod pipeline;

pub use mllp::ZntFields;
pub use pipeline::{ConnectionMeta, IngestOutcome, IngestPipeline};
