//! Error context extension trait
//!
//! This module provides a context extension trait similar to `anyhow::Context`
//! that works with `Result<T, GatewayError>`.
//!
//! # Examples
//!
//! ```rust
//! use nexus_ingest::domain::Result;
//! use nexus_ingest::domain::context::ResultExt;
//!
//! fn read_payload(path: &str) -> Result<Vec<u8>> {
//!     std::fs::read(path).context(format!("Failed to read payload file: {}", path))
//! }
//! ```

use crate::domain::errors::GatewayError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error (eagerly evaluated)
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation)
    ///
    /// The closure only runs when the result is an error.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<GatewayError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| {
            let base_error = e.into();
            GatewayError::Other(format!("{context}: {base_error}"))
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let base_error = e.into();
            let context = f();
            GatewayError::Other(format!("{context}: {base_error}"))
        })
    }
}
