//! Writing sinks
//!
//! Each sink writes one artifact and returns a [`SinkReceipt`] on success.
//! Failures are returned as [`SinkError`](crate::domain::SinkError) and turned into
//! reporter issues by the store.

pub mod blob;
pub mod email;
pub mod fs;
pub mod vfs;

/// Successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Location handed to `PersistenceReporter::persisted`
    pub location: String,
    /// Message handed to `PersistenceReporter::info`
    pub message: String,
}
