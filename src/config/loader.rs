//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{BlobBackend, GatewayConfig};
use crate::domain::errors::GatewayError;
use crate::domain::result::Result;
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "NEXUS";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into GatewayConfig
/// 4. Applies environment variable overrides (NEXUS_* prefix)
/// 5. Validates the configuration
///
/// Only upper-case names are substituted, so template placeholders in
/// persistence descriptors such as `${artifactId}` or `${cwd()}` are kept.
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use nexus_ingest::config::loader::load_config;
///
/// let config = load_config("nexus-ingest.toml").expect("Failed to load config");
/// println!("{} listener(s)", config.listeners.len());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<GatewayConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(GatewayError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        GatewayError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration text
///
/// # Errors
///
/// Same as [`load_config`], minus file access.
pub fn parse_config(contents: &str) -> Result<GatewayConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: GatewayConfig = toml::from_str(&contents)
        .map_err(|e| GatewayError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        GatewayError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| GatewayError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut missing_vars: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }
            re.replace_all(line, |cap: &Captures| {
                let var_name = &cap[1];
                match std::env::var(var_name) {
                    Ok(value) => value,
                    Err(_) => {
                        if !missing_vars.iter().any(|v| v == var_name) {
                            missing_vars.push(var_name.to_string());
                        }
                        cap[0].to_string()
                    }
                }
            })
            .into_owned()
        })
        .collect();

    if !missing_vars.is_empty() {
        return Err(GatewayError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn env_override(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{key}")).ok()
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        GatewayError::Configuration(format!(
            "Invalid value '{value}' for environment variable {ENV_PREFIX}_{key}"
        ))
    })
}

/// Applies environment variable overrides using NEXUS_* prefix
///
/// Environment variables follow the pattern: NEXUS_<SECTION>_<KEY>
/// For example: NEXUS_APPLICATION_LOG_LEVEL, NEXUS_PERSISTENCE_DEFAULT_DESCRIPTOR
fn apply_env_overrides(config: &mut GatewayConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env_override("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(val) = env_override("APPLICATION_SHUTDOWN_TIMEOUT_SECS") {
        config.application.shutdown_timeout_secs =
            parse_override("APPLICATION_SHUTDOWN_TIMEOUT_SECS", &val)?;
    }

    // Logging overrides
    if let Some(val) = env_override("LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = env_override("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env_override("LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    // Persistence overrides
    if let Some(val) = env_override("PERSISTENCE_DEFAULT_DESCRIPTOR") {
        config.persistence.default_descriptor = Some(val);
    }
    if let Some(val) = env_override("PERSISTENCE_ALWAYS") {
        config.persistence.always = Some(val);
    }
    if let Some(val) = env_override("PERSISTENCE_SINK_TIMEOUT_SECONDS") {
        config.persistence.sink_timeout_seconds =
            parse_override("PERSISTENCE_SINK_TIMEOUT_SECONDS", &val)?;
    }

    // Blob store overrides
    if let Some(val) = env_override("PERSISTENCE_BLOB_BACKEND") {
        config.persistence.blob.backend = match val.to_ascii_lowercase().as_str() {
            "none" => BlobBackend::None,
            "memory" => BlobBackend::Memory,
            "local" => BlobBackend::Local,
            "s3" => BlobBackend::S3,
            other => {
                return Err(GatewayError::Configuration(format!(
                    "Invalid blob backend '{other}'. Must be one of: none, memory, local, s3"
                )))
            }
        };
    }
    if let Some(val) = env_override("PERSISTENCE_BLOB_BUCKET") {
        config.persistence.blob.bucket = Some(val);
    }
    if let Some(val) = env_override("PERSISTENCE_BLOB_REGION") {
        config.persistence.blob.region = val;
    }
    if let Some(val) = env_override("PERSISTENCE_BLOB_ENDPOINT") {
        config.persistence.blob.endpoint = Some(val);
    }
    if let Some(val) = env_override("PERSISTENCE_BLOB_ACCESS_KEY_ID") {
        config.persistence.blob.access_key_id = Some(val);
    }
    if let Some(val) = env_override("PERSISTENCE_BLOB_SECRET_ACCESS_KEY") {
        config.persistence.blob.secret_access_key = Some(val);
    }

    Ok(())
}
