//! Message group routing
//!
//! Derives the ordering key that downstream FIFO queues partition on.
//! Interactions sharing a group id are delivered in the order produced.
//!
//! ```rust
//! use nexus_ingest::core::routing::MessageGroupService;
//! use nexus_ingest::domain::{InteractionContext, MessageSourceType};
//!
//! let mut ctx = InteractionContext::new(MessageSourceType::Tcp);
//! ctx.destination_port = Some("2575".to_string());
//!
//! let group_id = MessageGroupService::new().assign(&mut ctx);
//! assert_eq!(group_id, "2575");
//! ```

pub mod service;
pub mod strategy;

pub use service::MessageGroupService;
pub use strategy::GroupKeyStrategy;
