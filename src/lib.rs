// Nexus Ingest - Healthcare Interaction Ingestion Gateway
// Copyright (c) 2025 Nexus Ingest Contributors
// Licensed under the MIT License

//! # Nexus Ingest - Healthcare Interaction Ingestion Gateway
//!
//! Nexus Ingest accepts healthcare interactions (HL7 v2 over MLLP and raw TCP
//! payloads) behind a load balancer, assigns each one an ordering key and
//! persists it through a pluggable, descriptor-driven set of sinks.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Decoding** Proxy Protocol v2 headers to recover the original client address
//! - **Grouping** interactions by a message group id for FIFO delivery
//! - **Interpolating** `${...}` templates in sink paths, keys and email fields
//! - **Persisting** artifacts to local files, virtual filesystems, object stores and email
//!
//! ## Architecture
//!
//! The gateway follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (proxy, routing, interpolation, persistence, ingest)
//! - [`adapters`] - External integrations (socket listeners, mail, object stores)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nexus_ingest::adapters::listener::serve_all;
//! use nexus_ingest::config::load_config;
//! use nexus_ingest::core::ingest::IngestPipeline;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("nexus-ingest.toml")?;
//!     let pipeline = Arc::new(IngestPipeline::from_config(&config)?);
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     serve_all(&config, pipeline, shutdown_rx).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Persistence Descriptors
//!
//! A descriptor is JSON text selecting one or more sinks by `nature`:
//!
//! ```rust
//! use nexus_ingest::core::persistence::{ArtifactStore, PersistenceStrategy};
//!
//! let store = ArtifactStore::new();
//! let strategy = store.build(Some(r#"[{"nature": "diags"}, {"nature": "fs"}]"#));
//! assert!(matches!(strategy.as_ref(), PersistenceStrategy::Aggregate(_)));
//!
//! // identical descriptor text returns the cached instance
//! let again = store.build(Some(r#"[{"nature": "diags"}, {"nature": "fs"}]"#));
//! assert!(std::sync::Arc::ptr_eq(&strategy, &again));
//! ```
//!
//! ## Error Handling
//!
//! The gateway uses the [`domain::GatewayError`] type for configuration,
//! listener and CLI errors. Persistence never fails its caller: sink errors
//! are delivered as reporter issues.
//!
//! ## Logging
//!
//! Structured logging uses the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(listener = "mllp-2575", "Listener started");
//! warn!(interaction_id = "f3c1", "ZNT segment not found in HL7 message");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
