//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use nexus_ingest::config::{load_config, BlobBackend, ListenerKind};
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("NEXUS_APPLICATION_LOG_LEVEL");
    std::env::remove_var("NEXUS_PERSISTENCE_DEFAULT_DESCRIPTOR");
    std::env::remove_var("NEXUS_PERSISTENCE_SINK_TIMEOUT_SECONDS");
    std::env::remove_var("NEXUS_PERSISTENCE_BLOB_BACKEND");
    std::env::remove_var("TEST_ARCHIVE_BUCKET");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const COMPLETE_CONFIG: &str = r#"
[application]
log_level = "debug"
shutdown_timeout_secs = 10

[logging]
local_enabled = false
local_path = "/tmp/nexus-ingest"
local_rotation = "hourly"

[persistence]
default_descriptor = '{"nature": "fs", "fsPath": "/var/lib/nexus/${artifactId}.json"}'
always = '{"nature": "diags", "identifier": "audit"}'
sink_timeout_seconds = 15

[persistence.blob]
backend = "memory"

[[listeners]]
name = "mllp-2575"
port = 2575
kind = "mllp"
proxy_protocol = true
tenant_id = "acme-hospital"

[[listeners]]
name = "tcp-7001"
bind = "127.0.0.1"
port = 7001
kind = "tcp"
read_timeout_seconds = 5
descriptor = '[{"nature": "diags"}, {"nature": "vfs", "vfsUri": "tmp://nexus/${artifactId}.json"}]'
"#;

#[test]
fn test_load_complete_config() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(COMPLETE_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.application.shutdown_timeout_secs, 10);
    assert_eq!(config.logging.local_rotation, "hourly");

    // template placeholders are not environment references
    assert_eq!(
        config.persistence.default_descriptor.as_deref(),
        Some(r#"{"nature": "fs", "fsPath": "/var/lib/nexus/${artifactId}.json"}"#)
    );
    assert_eq!(config.persistence.sink_timeout_seconds, 15);
    assert_eq!(config.persistence.blob.backend, BlobBackend::Memory);

    assert_eq!(config.listeners.len(), 2);
    let mllp = &config.listeners[0];
    assert_eq!(mllp.kind, ListenerKind::Mllp);
    assert!(mllp.proxy_protocol);
    assert_eq!(mllp.address(), "0.0.0.0:2575");
    assert_eq!(mllp.tenant_id.as_deref(), Some("acme-hospital"));

    let tcp = &config.listeners[1];
    assert_eq!(tcp.kind, ListenerKind::Tcp);
    assert_eq!(tcp.read_timeout_seconds, 5);
    assert_eq!(tcp.max_message_bytes, 10 * 1024 * 1024);
}

#[test]
fn test_environment_substitution_and_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    std::env::set_var("TEST_ARCHIVE_BUCKET", "nexus-archive");
    std::env::set_var("NEXUS_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("NEXUS_PERSISTENCE_SINK_TIMEOUT_SECONDS", "5");

    let file = write_config(
        r#"
[persistence.blob]
backend = "s3"
bucket = "${TEST_ARCHIVE_BUCKET}"
"#,
    );
    let config = load_config(file.path()).unwrap();
    cleanup_env_vars();

    assert_eq!(config.persistence.blob.bucket.as_deref(), Some("nexus-archive"));
    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.persistence.sink_timeout_seconds, 5);
}

#[test]
fn test_missing_environment_variable() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[persistence.blob]
backend = "s3"
bucket = "${TEST_ARCHIVE_BUCKET}"
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_ARCHIVE_BUCKET"));
}

#[test]
fn test_invalid_override_value() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    std::env::set_var("NEXUS_PERSISTENCE_BLOB_BACKEND", "azure");
    let file = write_config("");
    let result = load_config(file.path());
    cleanup_env_vars();

    assert!(result.is_err());
}

#[test]
fn test_invalid_descriptor_is_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[[listeners]]
name = "tcp"
port = 7001
kind = "tcp"
descriptor = "{not json"
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("listeners.tcp.descriptor"));
}

#[test]
fn test_duplicate_listener_ports_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[[listeners]]
name = "a"
port = 7001
kind = "tcp"

[[listeners]]
name = "b"
port = 7001
kind = "mllp"
"#,
    );
    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/nexus-ingest.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
