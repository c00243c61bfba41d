//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for the gateway using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Nexus Ingest - Healthcare Interaction Ingestion Gateway
#[derive(Parser, Debug)]
#[command(name = "nexus-ingest")]
#[command(version, about, long_about = None)]
#[command(author = "Nexus Ingest Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nexus-ingest.toml", env = "NEXUS_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "NEXUS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start all configured listeners
    Serve(commands::serve::ServeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Persist a file through a persistence descriptor
    Persist(commands::persist::PersistArgs),

    /// Decode a Proxy Protocol v2 header from a captured file
    Decode(commands::decode::DecodeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_serve() {
        let cli = Cli::parse_from(["nexus-ingest", "serve"]);
        assert_eq!(cli.config, "nexus-ingest.toml");
        assert!(matches!(cli.command, Commands::Serve(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["nexus-ingest", "--config", "custom.toml", "serve"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["nexus-ingest", "--log-level", "debug", "serve"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["nexus-ingest", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_persist() {
        let cli = Cli::parse_from([
            "nexus-ingest",
            "persist",
            "--descriptor",
            r#"{"nature":"diags"}"#,
            "--file",
            "payload.json",
            "--artifact-id",
            "a-1",
        ]);
        match cli.command {
            Commands::Persist(args) => {
                assert_eq!(args.descriptor.as_deref(), Some(r#"{"nature":"diags"}"#));
                assert_eq!(args.file, "payload.json");
                assert_eq!(args.artifact_id.as_deref(), Some("a-1"));
                assert_eq!(args.namespace, "cli");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_decode() {
        let cli = Cli::parse_from(["nexus-ingest", "decode", "--file", "capture.bin"]);
        assert!(matches!(cli.command, Commands::Decode(_)));
    }
}
