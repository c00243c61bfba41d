//! External system integrations for the gateway.
//!
//! This module provides adapters for integrating with external systems:
//!
//! - [`listener`] - TCP/MLLP socket listeners feeding the ingest pipeline
//! - [`mail`] - Mail transports used by the email persistence sink
//! - [`blob`] - Object store construction for the blob persistence sink
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The mail layer uses a
//! trait-based abstraction so sinks can be exercised without an MTA.
//!
//! # Mail Adapter
//!
//! ```rust,no_run
//! use nexus_ingest::adapters::mail::{EmailMessage, MailTransport, PickupDirTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = PickupDirTransport::new("/var/spool/nexus-ingest/mail");
//! let message = EmailMessage {
//!     from: "gateway@example.org".to_string(),
//!     to: vec!["ops@example.org".to_string()],
//!     subject: "Artifact received".to_string(),
//!     body: Some("hello".to_string()),
//!     ..Default::default()
//! };
//! let message_id = transport.send(&message).await?;
//! # Ok(())
//! # }
//! ```

pub mod blob;
pub mod listener;
pub mod mail;
