//! Persist command implementation
//!
//! Runs a file through a persistence descriptor once, outside any listener.
//! Useful for checking a descriptor against real sinks before deploying it.

use crate::config::{load_config, PersistenceConfig};
use crate::core::persistence::{ArtifactStore, CollectingReporter};
use crate::domain::context::ResultExt;
use crate::domain::{Artifact, ArtifactId};
use clap::Args;
use serde_json::{json, Map};
use std::path::Path;

/// Arguments for the persist command
#[derive(Args, Debug)]
pub struct PersistArgs {
    /// Persistence descriptor (JSON); defaults to the configured default
    #[arg(short, long)]
    pub descriptor: Option<String>,

    /// File whose content becomes the artifact
    #[arg(short, long)]
    pub file: String,

    /// Artifact id (defaults to a random UUID)
    #[arg(long)]
    pub artifact_id: Option<String>,

    /// Artifact namespace
    #[arg(long, default_value = "cli")]
    pub namespace: String,
}

impl PersistArgs {
    /// Execute the persist command
    ///
    /// The configuration file is optional here; without one the store has no
    /// mail transport or object store.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let persistence = if Path::new(config_path).exists() {
            match load_config(config_path) {
                Ok(config) => config.persistence,
                Err(e) => {
                    eprintln!("Failed to load configuration: {e}");
                    return Ok(2);
                }
            }
        } else {
            tracing::debug!(config_path = %config_path, "No configuration file; using defaults");
            PersistenceConfig::default()
        };

        let store = match ArtifactStore::from_config(&persistence) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Failed to initialize persistence: {e}");
                return Ok(2);
            }
        };

        let content = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read artifact file {}", self.file))?;
        let id = self
            .artifact_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let id = ArtifactId::new(id).map_err(anyhow::Error::msg)?;

        let mut provenance = Map::new();
        provenance.insert("sourceFile".to_string(), json!(self.file));
        let artifact = Artifact::new(id, self.namespace.clone(), content, Some(provenance));

        let descriptor = self
            .descriptor
            .as_deref()
            .or(persistence.default_descriptor.as_deref());
        let strategy = store.build(descriptor);
        tracing::info!(strategy = %strategy, artifact_id = %artifact.id(), "Persisting artifact");

        let reporter = CollectingReporter::new();
        store.persist(&strategy, &artifact, &reporter).await;
        let report = reporter.into_report();

        println!("{}", serde_json::to_string_pretty(&report)?);

        Ok(if report.has_issues() { 1 } else { 0 })
    }
}
