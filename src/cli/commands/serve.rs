//! Serve command implementation
//!
//! Starts every configured listener and runs until a shutdown signal.

use crate::adapters::listener::serve_all;
use crate::config::load_config;
use crate::core::ingest::IngestPipeline;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the default persistence descriptor (JSON)
    #[arg(long)]
    pub descriptor: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting serve command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if let Some(descriptor) = &self.descriptor {
            tracing::info!(descriptor = %descriptor, "Overriding default descriptor from CLI");
            config.persistence.default_descriptor = Some(descriptor.clone());
        }

        let pipeline = match IngestPipeline::from_config(&config) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize persistence");
                eprintln!("Failed to initialize persistence: {e}");
                return Ok(2);
            }
        };

        tracing::info!(
            listeners = config.listeners.len(),
            store = ?pipeline.store(),
            "Gateway starting"
        );
        println!("🚀 Starting {} listener(s)...", config.listeners.len());

        if let Err(e) = serve_all(&config, pipeline, shutdown_signal).await {
            tracing::error!(error = %e, "Listeners failed");
            eprintln!("Failed to start listeners: {e}");
            return Ok(4); // Listener error exit code
        }

        tracing::info!("Gateway stopped");
        println!("✅ Gateway stopped");
        Ok(0)
    }
}
