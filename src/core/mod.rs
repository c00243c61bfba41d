//! Core business logic for the gateway.
//!
//! # Modules
//!
//! - [`proxy`] - Proxy Protocol v2 header decoding
//! - [`routing`] - Message group id assignment
//! - [`interpolate`] - `${...}` template interpolation
//! - [`persistence`] - Persistence descriptors, strategies and sinks
//! - [`ingest`] - Per-interaction orchestration and MLLP handling
//!
//! # Interaction Workflow
//!
//! 1. **Decode**: Strip the proxy header and recover client/server addresses
//! 2. **Frame**: Unwrap the MLLP envelope and read ZNT routing fields
//! 3. **Group**: Assign the message group id used for FIFO ordering
//! 4. **Persist**: Build the strategy for the listener's descriptor and run it
//! 5. **Respond**: ACK/NACK for MLLP, a text line for raw TCP

pub mod ingest;
pub mod interpolate;
pub mod persistence;
pub mod proxy;
pub mod routing;
