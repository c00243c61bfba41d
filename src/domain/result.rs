//! Result type alias for the gateway

use super::errors::GatewayError;

/// Result type alias for gateway operations
///
/// # Examples
///
/// ```
/// use nexus_ingest::domain::result::Result;
/// use nexus_ingest::domain::errors::GatewayError;
///
/// fn failing_function() -> Result<()> {
///     Err(GatewayError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, GatewayError>;
