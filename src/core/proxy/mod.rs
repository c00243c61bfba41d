//! Connection metadata stripping
//!
//! Runs once per accepted connection, before any MLLP framing is attempted,
//! because it decides which leading bytes are metadata and which are payload.

pub mod decoder;

pub use decoder::{decode, header_len, parse_socket_address, starts_with_signature, ProxyDecodeResult};
