//! Configuration management for the gateway.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`, upper-case names only)
//! - `NEXUS_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use nexus_ingest::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("nexus-ingest.toml")?;
//!
//! for listener in &config.listeners {
//!     println!("{} on {}", listener.name, listener.address());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and shutdown grace period
//! - [`LoggingConfig`] - Local file logging
//! - [`PersistenceConfig`] - Default descriptor, always-on descriptor, sink
//!   timeout, mail pickup directory and object store
//! - [`ListenerConfig`] - One entry per TCP listener
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [persistence]
//! default_descriptor = '{"nature": "fs", "fsPath": "/data/${artifactId}.json"}'
//! always = '{"nature": "diags"}'
//!
//! [persistence.blob]
//! backend = "s3"
//! bucket = "interactions"
//! secret_access_key = "${NEXUS_S3_SECRET}"
//!
//! [[listeners]]
//! name = "mllp-main"
//! port = 2575
//! kind = "mllp"
//! proxy_protocol = true
//! tenant_id = "acme-hospital"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, BlobBackend, BlobConfig, GatewayConfig, ListenerConfig, ListenerKind,
    LoggingConfig, MailConfig, PersistenceConfig,
};
