//! Artifact persistence
//!
//! A persistence descriptor (JSON text) is turned into a
//! [`PersistenceStrategy`] by [`ArtifactStore::build`] and executed by
//! [`ArtifactStore::persist`]. Outcomes are only ever observed through a
//! [`PersistenceReporter`].
//!
//! ```rust
//! use nexus_ingest::core::persistence::{ArtifactStore, CollectingReporter};
//! use nexus_ingest::domain::{Artifact, ArtifactId};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ArtifactStore::new();
//! let strategy = store.build(Some(r#"{"nature": "diags"}"#));
//!
//! let artifact = Artifact::json(&json!({"k": "v"}), ArtifactId::new("a-1")?, "docs", None)?;
//! let reporter = CollectingReporter::new();
//! store.persist(&strategy, &artifact, &reporter).await;
//!
//! assert_eq!(reporter.infos(), vec!["[DiagnosticPersistence] artifactId: a-1"]);
//! # Ok(())
//! # }
//! ```

pub mod reporter;
pub mod sinks;
pub mod store;
pub mod strategy;

pub use reporter::{CollectingReporter, PersistenceReport, PersistenceReporter, TracingReporter};
pub use store::{ArtifactStore, StoreOptions};
pub use strategy::{PersistenceStrategy, SinkKind, SinkStrategy};
