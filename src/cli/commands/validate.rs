//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the gateway configuration file.

use crate::config::{load_config, BlobBackend, GatewayConfig};
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading also runs validation
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config);
        Ok(0)
    }
}

fn print_summary(config: &GatewayConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!(
        "  File Logging: {}",
        if config.logging.local_enabled {
            format!("{} ({})", config.logging.local_path, config.logging.local_rotation)
        } else {
            "disabled".to_string()
        }
    );

    let persistence = &config.persistence;
    println!(
        "  Default Descriptor: {}",
        persistence.default_descriptor.as_deref().unwrap_or("(diagnostic)")
    );
    if let Some(always) = &persistence.always {
        println!("  Always Descriptor: {always}");
    }
    println!("  Sink Timeout: {}s", persistence.sink_timeout_seconds);
    if let Some(mail) = &persistence.mail {
        println!("  Mail Pickup Dir: {}", mail.pickup_dir);
    }
    match persistence.blob.backend {
        BlobBackend::None => println!("  Blob Store: none"),
        BlobBackend::Memory => println!("  Blob Store: in-memory"),
        BlobBackend::Local => println!(
            "  Blob Store: local ({})",
            persistence.blob.root.as_deref().unwrap_or("")
        ),
        BlobBackend::S3 => println!(
            "  Blob Store: s3://{} ({})",
            persistence.blob.bucket.as_deref().unwrap_or(""),
            persistence.blob.region
        ),
    }

    println!("  Listeners: {}", config.listeners.len());
    for listener in &config.listeners {
        println!(
            "    - {} {:?} on {}{}",
            listener.name,
            listener.kind,
            listener.address(),
            if listener.proxy_protocol { " [proxy v2]" } else { "" }
        );
    }
    println!();
}
