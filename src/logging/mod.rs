//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted log files
//! - Configurable log levels
//! - Local file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use nexus_ingest::logging::init_logging;
//! use nexus_ingest::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Gateway started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the arrival of an interaction
///
/// # Example
///
/// ```no_run
/// use nexus_ingest::log_interaction_start;
/// use nexus_ingest::domain::{InteractionId, MessageSourceType};
///
/// let interaction_id = InteractionId::generate();
/// log_interaction_start!(&interaction_id, "mllp-main", MessageSourceType::Mllp, 512);
/// ```
#[macro_export]
macro_rules! log_interaction_start {
    ($interaction_id:expr, $listener:expr, $source_type:expr, $bytes:expr) => {
        tracing::info!(
            interaction_id = %$interaction_id,
            listener = %$listener,
            source_type = %$source_type,
            bytes = $bytes,
            "Interaction received"
        );
    };
}

/// Log the message group assigned to an interaction
///
/// # Example
///
/// ```no_run
/// use nexus_ingest::log_group_assigned;
/// use nexus_ingest::core::routing::GroupKeyStrategy;
/// use nexus_ingest::domain::InteractionId;
///
/// let interaction_id = InteractionId::generate();
/// log_group_assigned!(&interaction_id, GroupKeyStrategy::Tcp, "2575");
/// ```
#[macro_export]
macro_rules! log_group_assigned {
    ($interaction_id:expr, $strategy:expr, $group_id:expr) => {
        tracing::info!(
            interaction_id = %$interaction_id,
            strategy = %$strategy,
            message_group_id = %$group_id,
            "Message group id assigned"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use nexus_ingest::log_error_with_context;
/// use nexus_ingest::domain::GatewayError;
///
/// let error = GatewayError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}
